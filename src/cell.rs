// The MIT License (MIT)

// Copyright (c) 2026 The pledge Developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Single-assignment cell shared between a promise and whoever may seal it
//!
//! A `Cell` starts out `Pending` with a queue of observers and is sealed at
//! most once. Sealing is a two phase commit: the state is swapped under the
//! lock, and the captured observers are invoked after the lock is released so
//! an observer may freely call back into the same cell.
//!
//! Between those two phases the cell is `Sealing`. Observers registered while
//! the sealing thread is still draining its batch are queued behind that
//! batch instead of running on the registering thread. This keeps the
//! observers of one cell in registration order even when registration races
//! with sealing on another thread. Once the queue is empty the cell becomes
//! `Sealed` and later observers run immediately on the registering thread.

use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use crate::sync::Spinlock;

type Handler<T> = Box<dyn FnOnce(T) + Send + 'static>;

enum State<T> {
    Pending(Vec<Handler<T>>),
    Sealing(T, Vec<Handler<T>>),
    Sealed(T),
}

pub struct Cell<T> {
    state: Spinlock<State<T>>,
}

impl<T> Cell<T>
where
    T: Clone + Send + 'static,
{
    pub fn pending() -> Cell<T> {
        Cell {
            state: Spinlock::new(State::Pending(Vec::new())),
        }
    }

    pub fn sealed(value: T) -> Cell<T> {
        Cell {
            state: Spinlock::new(State::Sealed(value)),
        }
    }

    /// Seal the cell with `value` and run every registered observer with it.
    ///
    /// Only the first call has any effect; it returns `true`. Later calls
    /// drop their value and return `false`.
    pub fn seal(&self, value: T) -> bool {
        let mut batch = {
            let mut state = self.state.lock();

            match mem::replace(&mut *state, State::Sealing(value.clone(), Vec::new())) {
                State::Pending(handlers) => handlers,
                other => {
                    *state = other;
                    trace!("ignoring seal of an already sealed cell");
                    return false;
                }
            }
        };

        trace!("sealed cell, notifying {} observer(s)", batch.len());

        // A panicking observer must not strand the rest of the queue or leave
        // the cell `Sealing`; the first panic is resumed once the cell is `Sealed`.
        let mut panicked = None;

        loop {
            for handler in batch.drain(..) {
                let value = value.clone();
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || handler(value))) {
                    panicked.get_or_insert(payload);
                }
            }

            let mut state = self.state.lock();

            if let State::Sealing(_, ref mut late) = *state {
                if !late.is_empty() {
                    batch = mem::take(late);
                    continue;
                }
            }

            *state = State::Sealed(value);
            break;
        }

        if let Some(payload) = panicked {
            warn!("an observer panicked while sealing, resuming the panic");
            panic::resume_unwind(payload);
        }

        true
    }

    /// Register an observer. It runs exactly once: when the cell is sealed,
    /// or immediately if it already is.
    pub fn observe<F>(&self, observer: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        let value = {
            let mut state = self.state.lock();

            match *state {
                State::Pending(ref mut handlers) => {
                    handlers.push(Box::new(observer));
                    return;
                }
                State::Sealing(_, ref mut late) => {
                    late.push(Box::new(observer));
                    return;
                }
                State::Sealed(ref value) => value.clone(),
            }
        };

        observer(value);
    }

    /// Snapshot of the sealed value, `None` while pending. Never blocks on
    /// observers.
    pub fn inspect(&self) -> Option<T> {
        match *self.state.lock() {
            State::Pending(_) => None,
            State::Sealing(ref value, _) | State::Sealed(ref value) => Some(value.clone()),
        }
    }
}

impl<T> Cell<T> {
    pub fn is_sealed(&self) -> bool {
        !matches!(*self.state.lock(), State::Pending(_))
    }
}

impl<T> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.state.try_lock() {
            Some(state) => match *state {
                State::Pending(ref handlers) => write!(f, "Cell(Pending, {} observers)", handlers.len()),
                State::Sealing(..) => write!(f, "Cell(Sealing)"),
                State::Sealed(_) => write!(f, "Cell(Sealed)"),
            },
            None => write!(f, "Cell(<locked>)"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use parking_lot::Mutex;

    #[test]
    fn test_first_seal_wins() {
        let cell = Cell::pending();
        assert!(cell.inspect().is_none());
        assert!(cell.seal(1));
        assert!(!cell.seal(2));
        assert_eq!(cell.inspect(), Some(1));
    }

    #[test]
    fn test_observers_fire_once_in_order() {
        let cell = Cell::pending();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            cell.observe(move |v: i32| log.lock().push((i, v)));
        }

        cell.seal(7);
        cell.seal(8);

        {
            let log = log.clone();
            cell.observe(move |v| log.lock().push((3, v)));
        }

        assert_eq!(*log.lock(), vec![(0, 7), (1, 7), (2, 7), (3, 7)]);
    }

    #[test]
    fn test_reentrant_observer() {
        let cell = Arc::new(Cell::pending());
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let inner = cell.clone();
            let log = log.clone();
            cell.observe(move |v: &'static str| {
                log.lock().push(format!("first {}", v));
                assert_eq!(inner.inspect(), Some(v));
                let log = log.clone();
                inner.observe(move |v| log.lock().push(format!("nested {}", v)));
            });
        }
        {
            let log = log.clone();
            cell.observe(move |v| log.lock().push(format!("second {}", v)));
        }

        cell.seal("x");

        assert_eq!(
            *log.lock(),
            vec!["first x".to_owned(), "second x".to_owned(), "nested x".to_owned()]
        );
    }

    #[test]
    fn test_panicking_observer_does_not_strand_cell() {
        let cell = Arc::new(Cell::pending());
        let log = Arc::new(Mutex::new(Vec::new()));

        cell.observe(|_: i32| panic!("observer failed"));
        {
            let log = log.clone();
            cell.observe(move |v| log.lock().push(("queued", v)));
        }

        let sealer = cell.clone();
        let sealed = panic::catch_unwind(AssertUnwindSafe(move || sealer.seal(1)));
        assert!(sealed.is_err());

        assert!(cell.is_sealed());
        assert_eq!(cell.inspect(), Some(1));
        assert!(!cell.seal(2));

        {
            let log = log.clone();
            cell.observe(move |v| log.lock().push(("later", v)));
        }

        assert_eq!(*log.lock(), vec![("queued", 1), ("later", 1)]);
    }

    #[test]
    fn test_racing_seal_and_observe() {
        for _ in 0..200 {
            let cell = Arc::new(Cell::pending());
            let fired = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(3));

            let observers = {
                let cell = cell.clone();
                let fired = fired.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..50 {
                        let fired = fired.clone();
                        cell.observe(move |_: usize| {
                            fired.fetch_add(1, Ordering::SeqCst);
                        });
                    }
                })
            };

            let sealers: Vec<_> = (0..2)
                .map(|i| {
                    let cell = cell.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        cell.seal(i)
                    })
                })
                .collect();

            observers.join().unwrap();
            let won: usize = sealers
                .into_iter()
                .map(|h| h.join().unwrap() as usize)
                .sum();

            assert_eq!(won, 1);
            assert_eq!(fired.load(Ordering::SeqCst), 50);
        }
    }
}

// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One-shot thread parking

use std::fmt;
use std::mem;

use parking_lot::{Condvar, Mutex};

enum State<T> {
    Empty,
    Waiting,
    Ready(T),
    Taken,
}

/// A single value handed from one notifier to one waiting thread.
///
/// This is what blocks the caller of `Promise::wait`. The notifier side is a
/// cell observer, so it must never block; the waiting side parks on a condvar
/// until the value arrives.
pub struct Latch<T> {
    lock: Mutex<State<T>>,
    cond: Condvar,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LatchError {
    #[error("another thread is already waiting on this latch")]
    Occupied,
    #[error("the latch value was already taken")]
    Consumed,
}

impl<T> Latch<T> {
    /// Create a new `Latch`
    pub fn new() -> Latch<T> {
        Latch {
            lock: Mutex::new(State::Empty),
            cond: Condvar::new(),
        }
    }

    /// Park the current thread until `notify` is called, then return its value.
    /// Fails if another thread is already waiting or the value was taken.
    pub fn wait(&self) -> Result<T, LatchError> {
        let mut guard = self.lock.lock();

        match mem::replace(&mut *guard, State::Taken) {
            State::Ready(value) => return Ok(value),
            State::Taken => return Err(LatchError::Consumed),
            State::Waiting => {
                *guard = State::Waiting;
                return Err(LatchError::Occupied);
            }
            State::Empty => *guard = State::Waiting,
        }

        loop {
            self.cond.wait(&mut guard);

            match mem::replace(&mut *guard, State::Taken) {
                State::Ready(value) => return Ok(value),
                // spurious wakeup
                other => *guard = other,
            }
        }
    }

    /// Hand `value` to the waiter, waking it if it is already parked.
    /// A second notification is dropped.
    pub fn notify(&self, value: T) {
        let mut guard = self.lock.lock();

        match *guard {
            State::Empty => *guard = State::Ready(value),
            State::Waiting => {
                *guard = State::Ready(value);
                self.cond.notify_one();
            }
            State::Ready(_) | State::Taken => {}
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock.lock(), State::Ready(_))
    }
}

impl<T> Default for Latch<T> {
    fn default() -> Latch<T> {
        Latch::new()
    }
}

impl<T> fmt::Debug for Latch<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.lock.lock() {
            State::Empty => write!(f, "Latch(Empty)"),
            State::Waiting => write!(f, "Latch(Waiting)"),
            State::Ready(_) => write!(f, "Latch(Ready)"),
            State::Taken => write!(f, "Latch(Taken)"),
        }
    }
}

// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Single-assignment values that cannot fail
//!
//! A `Guarantee` is a `Promise` without the error channel. Its own `map`,
//! `done` and `then` stay infallible and return guarantees; the fallible
//! forms from `Thenable` are reachable as `then_map` and `then_promise`, or
//! by converting into a `Promise`.
//!
//! User bodies handed to the infallible combinators have nowhere to report a
//! panic. A panicking body is logged and its result is never sealed.

use std::fmt;
use std::sync::Arc;

use crate::cell::Cell;
use crate::config::{self, Config};
use crate::error::{log_panic, Result};
use crate::executor::ExecutorRef;
use crate::outcome::Outcome;
use crate::promise::Promise;
use crate::sync::Latch;
use crate::thenable::Thenable;

#[must_use = "a guarantee does nothing unless observed"]
pub struct Guarantee<T> {
    cell: Arc<Cell<T>>,
    config: Arc<Config>,
}

impl<T> Guarantee<T>
where
    T: Clone + Send + 'static,
{
    pub fn value(value: T) -> Guarantee<T> {
        Guarantee::value_in(&config::current(), value)
    }

    pub fn value_in(config: &Arc<Config>, value: T) -> Guarantee<T> {
        Guarantee {
            cell: Arc::new(Cell::sealed(value)),
            config: config.clone(),
        }
    }

    pub fn pending() -> (Guarantee<T>, Sealer<T>) {
        Guarantee::pending_in(&config::current())
    }

    pub fn pending_in(config: &Arc<Config>) -> (Guarantee<T>, Sealer<T>) {
        let cell = Arc::new(Cell::pending());
        let sealer = Sealer { cell: cell.clone() };

        (
            Guarantee {
                cell,
                config: config.clone(),
            },
            sealer,
        )
    }

    pub(crate) fn chained(config: &Arc<Config>) -> (Guarantee<T>, Sealer<T>) {
        Guarantee::pending_in(config)
    }

    /// Run `body` synchronously with a sealer for the new guarantee.
    pub fn new<F>(body: F) -> Guarantee<T>
    where
        F: FnOnce(Sealer<T>),
    {
        Guarantee::new_in(&config::current(), body)
    }

    pub fn new_in<F>(config: &Arc<Config>, body: F) -> Guarantee<T>
    where
        F: FnOnce(Sealer<T>),
    {
        let (guarantee, sealer) = Guarantee::pending_in(config);
        log_panic("guarantee body", move || body(sealer));
        guarantee
    }

    /// Register an observer of the value.
    pub fn observe<F>(&self, to: F)
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.cell.observe(to)
    }

    pub fn map<U, F>(&self, transform: F) -> Guarantee<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.map_on(self.config.map.clone(), transform)
    }

    pub fn map_on<U, F>(&self, on: ExecutorRef, transform: F) -> Guarantee<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (guarantee, sealer) = Guarantee::chained(&self.config);

        self.observe(move |value| {
            on.execute(move || {
                log_panic("guarantee map body", move || sealer.seal(transform(value)));
            })
        });

        guarantee
    }

    pub fn done<F>(&self, body: F) -> Guarantee<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.done_on(self.config.finish.clone(), body)
    }

    pub fn done_on<F>(&self, on: ExecutorRef, body: F) -> Guarantee<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.map_on(on, body)
    }

    /// Chain another guarantee.
    pub fn then<U, F>(&self, body: F) -> Guarantee<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Guarantee<U> + Send + 'static,
    {
        self.then_on(self.config.map.clone(), body)
    }

    pub fn then_on<U, F>(&self, on: ExecutorRef, body: F) -> Guarantee<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Guarantee<U> + Send + 'static,
    {
        let (guarantee, sealer) = Guarantee::chained(&self.config);

        self.observe(move |value| {
            on.execute(move || {
                let mut next = None;
                log_panic("guarantee then body", || next = Some(body(value)));
                if let Some(next) = next {
                    next.observe(move |value| sealer.seal(value));
                }
            })
        });

        guarantee
    }

    /// Fallible transform, yielding a promise.
    pub fn then_map<U, F>(&self, transform: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        Thenable::map(self, transform)
    }

    pub fn then_map_on<U, F>(&self, on: ExecutorRef, transform: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        Thenable::map_on(self, on, transform)
    }

    /// Chain a fallible asynchronous step, yielding a promise.
    pub fn then_promise<P, F>(&self, body: F) -> Promise<P::Value>
    where
        P: Thenable,
        F: FnOnce(T) -> Result<P> + Send + 'static,
    {
        Thenable::then(self, body)
    }

    pub fn then_promise_on<P, F>(&self, on: ExecutorRef, body: F) -> Promise<P::Value>
    where
        P: Thenable,
        F: FnOnce(T) -> Result<P> + Send + 'static,
    {
        Thenable::then_on(self, on, body)
    }

    pub fn as_void(&self) -> Guarantee<()> {
        self.map_on(ExecutorRef::Inline, |_| ())
    }

    /// Block the calling thread until the guarantee seals.
    ///
    /// The same deadlock caveat as `Promise::wait` applies.
    pub fn wait(&self) -> T {
        if let Some(value) = self.cell.inspect() {
            return value;
        }

        let latch = Arc::new(Latch::new());
        {
            let latch = latch.clone();
            self.observe(move |value| latch.notify(value));
        }

        latch.wait().expect("a fresh latch has exactly one waiter")
    }
}

impl<T> Thenable for Guarantee<T>
where
    T: Clone + Send + 'static,
{
    type Value = T;

    fn pipe<F>(&self, to: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.cell.observe(move |value| to(Outcome::Fulfilled(value)))
    }

    fn result(&self) -> Option<Outcome<T>> {
        self.cell.inspect().map(Outcome::Fulfilled)
    }

    fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn cell_id(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }
}

impl<T> From<Guarantee<T>> for Promise<T>
where
    T: Clone + Send + 'static,
{
    fn from(guarantee: Guarantee<T>) -> Promise<T> {
        Promise::from_thenable(&guarantee)
    }
}

impl<T> Clone for Guarantee<T> {
    fn clone(&self) -> Guarantee<T> {
        Guarantee {
            cell: self.cell.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for Guarantee<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Guarantee").field(&self.cell).finish()
    }
}

/// The write side of a pending `Guarantee`.
pub struct Sealer<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Sealer<T>
where
    T: Clone + Send + 'static,
{
    /// Seal the guarantee. Only the first call has any effect.
    pub fn seal(&self, value: T) {
        if !self.cell.seal(value) {
            trace!("ignoring seal of an already sealed guarantee");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.cell.is_sealed()
    }
}

impl<T> Clone for Sealer<T> {
    fn clone(&self) -> Sealer<T> {
        Sealer {
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Sealer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Sealer").field(&self.cell).finish()
    }
}

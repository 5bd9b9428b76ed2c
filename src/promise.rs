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

//! Fallible single-assignment values

use std::fmt;
use std::sync::Arc;

use crate::cell::Cell;
use crate::config::{self, Config};
use crate::error::{catch_panic, log_panic, Error, PromiseError, Result};
use crate::outcome::Outcome;
use crate::sync::Latch;
use crate::thenable::Thenable;

/// A value that will eventually be fulfilled or rejected, exactly once.
///
/// Cloning a `Promise` is cheap and every clone observes the same outcome.
#[must_use = "a promise does nothing unless observed; call `cauterize` to drop its errors on purpose"]
pub struct Promise<T> {
    cell: Arc<Cell<Outcome<T>>>,
    config: Arc<Config>,
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    /// A promise already fulfilled with `value`.
    pub fn value(value: T) -> Promise<T> {
        Promise::value_in(&config::current(), value)
    }

    pub fn value_in(config: &Arc<Config>, value: T) -> Promise<T> {
        Promise {
            cell: Arc::new(Cell::sealed(Outcome::Fulfilled(value))),
            config: config.clone(),
        }
    }

    /// A promise already rejected with `error`.
    pub fn rejected<E: Into<Error>>(error: E) -> Promise<T> {
        Promise::rejected_in(&config::current(), error)
    }

    pub fn rejected_in<E: Into<Error>>(config: &Arc<Config>, error: E) -> Promise<T> {
        Promise {
            cell: Arc::new(Cell::sealed(Outcome::Rejected(error.into()))),
            config: config.clone(),
        }
    }

    /// A pending promise and the resolver that settles it.
    pub fn pending() -> (Promise<T>, Resolver<T>) {
        Promise::pending_in(&config::current())
    }

    pub fn pending_in(config: &Arc<Config>) -> (Promise<T>, Resolver<T>) {
        Promise::with_resolver(config, true)
    }

    /// Pending promise for a combinator's own result. Dropping its resolver
    /// unsettled is expected when the input never settles, so it stays quiet.
    pub(crate) fn chained(config: &Arc<Config>) -> (Promise<T>, Resolver<T>) {
        Promise::with_resolver(config, false)
    }

    fn with_resolver(config: &Arc<Config>, warn_unsettled: bool) -> (Promise<T>, Resolver<T>) {
        let cell = Arc::new(Cell::pending());

        let resolver = Resolver {
            inner: Arc::new(ResolverInner {
                cell: cell.clone(),
                warn_unsettled,
            }),
        };

        (
            Promise {
                cell,
                config: config.clone(),
            },
            resolver,
        )
    }

    /// Run `body` synchronously with a resolver for the new promise. A body
    /// returning `Err` rejects the promise with it unless it was already
    /// settled.
    pub fn new<F>(body: F) -> Promise<T>
    where
        F: FnOnce(Resolver<T>) -> Result<()>,
    {
        Promise::new_in(&config::current(), body)
    }

    pub fn new_in<F>(config: &Arc<Config>, body: F) -> Promise<T>
    where
        F: FnOnce(Resolver<T>) -> Result<()>,
    {
        let (promise, resolver) = Promise::pending_in(config);
        let ours = resolver.clone();

        if let Err(error) = catch_panic(move || body(resolver)) {
            ours.reject(error);
        }

        promise
    }

    /// A promise that settles the way `source` does.
    pub fn from_thenable<P>(source: &P) -> Promise<T>
    where
        P: Thenable<Value = T>,
    {
        let (promise, resolver) = Promise::chained(source.config());
        source.pipe(move |outcome| resolver.resolve(outcome));
        promise
    }

    /// Observe the outcome, whatever it is, and pass the promise on.
    pub fn tap<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let (promise, resolver) = Promise::chained(&self.config);
        let on = self.config.map.clone();

        self.pipe(move |outcome| {
            on.execute(move || {
                let seen = outcome.clone();
                log_panic("tap body", move || body(seen));
                resolver.resolve(outcome);
            })
        });

        promise
    }

    /// Block the calling thread until the promise settles.
    ///
    /// Calling this on a thread that the chain itself needs, such as the
    /// executor that would settle the promise, deadlocks.
    pub fn wait(&self) -> Result<T> {
        if let Some(outcome) = self.cell.inspect() {
            return outcome.into_result();
        }

        let latch = Arc::new(Latch::new());
        {
            let latch = latch.clone();
            self.pipe(move |outcome| latch.notify(outcome));
        }

        latch.wait()?.into_result()
    }

    /// Explicitly drop any error this promise ends up with, logging it.
    pub fn cauterize(self) {
        self.pipe(|outcome| {
            if let Outcome::Rejected(error) = outcome {
                warn!("cauterized rejection: {}", error);
            }
        });
    }
}

impl<T> Thenable for Promise<T>
where
    T: Clone + Send + 'static,
{
    type Value = T;

    fn pipe<F>(&self, to: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.cell.observe(to)
    }

    fn result(&self) -> Option<Outcome<T>> {
        self.cell.inspect()
    }

    fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn cell_id(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Promise<T> {
        Promise {
            cell: self.cell.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Promise").field(&self.cell).finish()
    }
}

struct ResolverInner<T> {
    cell: Arc<Cell<Outcome<T>>>,
    warn_unsettled: bool,
}

impl<T> Drop for ResolverInner<T> {
    fn drop(&mut self) {
        if self.warn_unsettled && !self.cell.is_sealed() {
            warn!("pending promise deallocated: its last resolver was dropped without settling it");
        }
    }
}

/// The write side of a pending `Promise`.
///
/// All clones share the promise; the first settlement wins and the rest are
/// ignored.
pub struct Resolver<T> {
    inner: Arc<ResolverInner<T>>,
}

impl<T> Resolver<T>
where
    T: Clone + Send + 'static,
{
    pub fn fulfill(&self, value: T) {
        self.resolve(Outcome::Fulfilled(value))
    }

    pub fn reject<E: Into<Error>>(&self, error: E) {
        self.resolve(Outcome::Rejected(error.into()))
    }

    pub fn resolve(&self, outcome: Outcome<T>) {
        if !self.inner.cell.seal(outcome) {
            trace!("ignoring settlement of an already settled promise");
        }
    }

    /// Settle from a callback-style pair. An error takes precedence over a
    /// value, and a pair with neither rejects with
    /// `PromiseError::InvalidCallingConvention`.
    pub fn resolve_callback(&self, value: Option<T>, error: Option<Error>) {
        match (value, error) {
            (_, Some(error)) => self.reject(error),
            (Some(value), None) => self.fulfill(value),
            (None, None) => self.reject(PromiseError::InvalidCallingConvention),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.inner.cell.is_sealed()
    }
}

impl Resolver<()> {
    /// Settle a `Promise<()>` from an optional error.
    pub fn resolve_error(&self, error: Option<Error>) {
        match error {
            Some(error) => self.reject(error),
            None => self.fulfill(()),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Resolver<T> {
        Resolver {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Resolver").field(&self.inner.cell).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::thread;
    use std::time::Duration;

    fn inline() -> Arc<Config> {
        Config::inline().into_shared()
    }

    #[test]
    fn test_settles_once() {
        let (promise, resolver) = Promise::pending_in(&inline());
        assert!(promise.is_pending());

        resolver.fulfill(1);
        resolver.fulfill(2);
        resolver.reject(Error::msg("late"));

        assert_eq!(promise.value(), Some(1));
        assert!(resolver.is_settled());
    }

    #[test]
    fn test_new_rejects_on_err() {
        let promise: Promise<i32> = Promise::new_in(&inline(), |_| Err(Error::msg("nope")));
        assert_eq!(promise.error().unwrap().to_string(), "nope");

        let promise = Promise::new_in(&inline(), |resolver| {
            resolver.fulfill(3);
            Err(Error::msg("ignored"))
        });
        assert_eq!(promise.value(), Some(3));
    }

    #[test]
    fn test_resolve_callback() {
        let (promise, resolver) = Promise::<i32>::pending_in(&inline());
        resolver.resolve_callback(Some(1), Some(Error::msg("wins")));
        assert_eq!(promise.error().unwrap().to_string(), "wins");

        let (promise, resolver) = Promise::<i32>::pending_in(&inline());
        resolver.resolve_callback(None, None);
        assert_eq!(
            promise.error().unwrap().downcast_ref::<PromiseError>(),
            Some(&PromiseError::InvalidCallingConvention)
        );

        let (promise, resolver) = Promise::<()>::pending_in(&inline());
        resolver.resolve_error(None);
        assert!(promise.is_fulfilled());
    }

    #[test]
    fn test_wait_across_threads() {
        let (promise, resolver) = Promise::pending_in(&inline());

        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            resolver.fulfill("ready");
        });

        assert_eq!(promise.wait().unwrap(), "ready");
        h.join().unwrap();
    }

    #[test]
    fn test_tap_sees_outcome() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let promise = {
            let seen = seen.clone();
            Promise::value_in(&inline(), 9).tap(move |outcome| *seen.lock() = outcome.value().cloned())
        };

        assert_eq!(promise.value(), Some(9));
        assert_eq!(*seen.lock(), Some(9));
    }

    #[test]
    fn test_from_thenable_keeps_config() {
        let config = inline();
        let source = Promise::value_in(&config, 1);
        let bridged = Promise::from_thenable(&source);

        assert!(Arc::ptr_eq(bridged.config(), &config));
        assert_eq!(bridged.value(), Some(1));
    }
}

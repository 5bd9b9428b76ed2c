// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error handling on promises: `catch`, `recover`, `ensure`

use std::fmt;

use crate::error::{catch_panic, log_panic, CatchPolicy, Error, PromiseError, Result};
use crate::executor::ExecutorRef;
use crate::guarantee::Guarantee;
use crate::outcome::Outcome;
use crate::promise::Promise;
use crate::thenable::Thenable;

/// What a `catch` leaves behind: a guarantee that settles once the handler
/// has run or was skipped.
#[must_use = "call `finally` or drop the finalizer explicitly"]
pub struct Finalizer {
    pending: Guarantee<()>,
}

impl Finalizer {
    /// Run `body` after the catch has completed, whatever happened.
    pub fn finally<F>(self, body: F) -> Guarantee<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let on = self.pending.config().finish.clone();
        self.finally_on(on, body)
    }

    pub fn finally_on<F>(self, on: ExecutorRef, body: F) -> Guarantee<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.done_on(on, move |()| body())
    }

    /// The guarantee behind this finalizer.
    pub fn into_guarantee(self) -> Guarantee<()> {
        self.pending
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Finalizer").field(&self.pending).finish()
    }
}

impl<T> Promise<T>
where
    T: Clone + Send + 'static,
{
    /// Handle a rejection the captured catch policy admits. Fulfillment and
    /// skipped rejections never reach `body`.
    pub fn catch<F>(&self, body: F) -> Finalizer
    where
        F: FnOnce(Error) + Send + 'static,
    {
        let config = self.config();
        self.catch_with(config.finish.clone(), config.catch_policy, body)
    }

    pub fn catch_on<F>(&self, on: ExecutorRef, body: F) -> Finalizer
    where
        F: FnOnce(Error) + Send + 'static,
    {
        let policy = self.config().catch_policy;
        self.catch_with(on, policy, body)
    }

    pub fn catch_with<F>(&self, on: ExecutorRef, policy: CatchPolicy, body: F) -> Finalizer
    where
        F: FnOnce(Error) + Send + 'static,
    {
        let (pending, sealer) = Guarantee::chained(self.config());

        self.pipe(move |outcome| match outcome {
            Outcome::Rejected(error) if policy.admits(&error) => on.execute(move || {
                log_panic("catch body", move || body(error));
                sealer.seal(());
            }),
            _ => sealer.seal(()),
        });

        Finalizer { pending }
    }

    /// Replace an admitted rejection with the outcome of another thenable.
    ///
    /// If `body` itself fails, the original rejection is forwarded. A body
    /// that hands back the promise being produced rejects with
    /// `PromiseError::ReturnedSelf`.
    pub fn recover<P, F>(&self, body: F) -> Promise<T>
    where
        P: Thenable<Value = T>,
        F: FnOnce(Error) -> Result<P> + Send + 'static,
    {
        let config = self.config();
        self.recover_with(config.map.clone(), config.catch_policy, body)
    }

    pub fn recover_on<P, F>(&self, on: ExecutorRef, body: F) -> Promise<T>
    where
        P: Thenable<Value = T>,
        F: FnOnce(Error) -> Result<P> + Send + 'static,
    {
        let policy = self.config().catch_policy;
        self.recover_with(on, policy, body)
    }

    pub fn recover_with<P, F>(&self, on: ExecutorRef, policy: CatchPolicy, body: F) -> Promise<T>
    where
        P: Thenable<Value = T>,
        F: FnOnce(Error) -> Result<P> + Send + 'static,
    {
        let (promise, resolver) = Promise::chained(self.config());
        let id = promise.cell_id();

        self.pipe(move |outcome| match outcome {
            Outcome::Rejected(error) if policy.admits(&error) => on.execute(move || {
                let original = error.clone();
                match catch_panic(move || body(error)) {
                    Ok(next) if next.cell_id() == id => resolver.reject(PromiseError::ReturnedSelf),
                    Ok(next) => next.pipe(move |outcome| resolver.resolve(outcome)),
                    Err(failure) => {
                        debug!("recover body failed with {}, forwarding {}", failure, original);
                        resolver.reject(original);
                    }
                }
            }),
            outcome => resolver.resolve(outcome),
        });

        promise
    }

    /// Turn every rejection into a value. The body sees all errors,
    /// cancellation included, since the result cannot reject.
    pub fn recover_guarantee<F>(&self, body: F) -> Guarantee<T>
    where
        F: FnOnce(Error) -> Guarantee<T> + Send + 'static,
    {
        let on = self.config().map.clone();
        self.recover_guarantee_on(on, body)
    }

    pub fn recover_guarantee_on<F>(&self, on: ExecutorRef, body: F) -> Guarantee<T>
    where
        F: FnOnce(Error) -> Guarantee<T> + Send + 'static,
    {
        let (guarantee, sealer) = Guarantee::chained(self.config());

        self.pipe(move |outcome| match outcome {
            Outcome::Fulfilled(value) => sealer.seal(value),
            Outcome::Rejected(error) => on.execute(move || {
                let mut replacement = None;
                log_panic("recover body", || replacement = Some(body(error)));
                if let Some(replacement) = replacement {
                    replacement.observe(move |value| sealer.seal(value));
                }
            }),
        });

        guarantee
    }

    /// Run `body` once the promise settles, then republish the original outcome.
    pub fn ensure<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let on = self.config().finish.clone();
        self.ensure_on(on, body)
    }

    pub fn ensure_on<F>(&self, on: ExecutorRef, body: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let (promise, resolver) = Promise::chained(self.config());

        self.pipe(move |outcome| {
            on.execute(move || {
                match catch_panic(move || {
                    body();
                    Ok(())
                }) {
                    Ok(()) => resolver.resolve(outcome),
                    Err(error) => resolver.reject(error),
                }
            })
        });

        promise
    }

    /// Like `ensure`, but the original outcome is republished only after the
    /// guarantee returned by `body` seals.
    pub fn ensure_then<F>(&self, body: F) -> Promise<T>
    where
        F: FnOnce() -> Guarantee<()> + Send + 'static,
    {
        let on = self.config().finish.clone();
        self.ensure_then_on(on, body)
    }

    pub fn ensure_then_on<F>(&self, on: ExecutorRef, body: F) -> Promise<T>
    where
        F: FnOnce() -> Guarantee<()> + Send + 'static,
    {
        let (promise, resolver) = Promise::chained(self.config());

        self.pipe(move |outcome| {
            on.execute(move || match catch_panic(move || Ok(body())) {
                Ok(cleanup) => cleanup.observe(move |()| resolver.resolve(outcome)),
                Err(error) => resolver.reject(error),
            })
        });

        promise
    }
}

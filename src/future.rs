// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `.await` support
//!
//! Awaiting a promise registers one observer the first time the future is
//! polled. The observer stores the outcome and wakes the most recent waker.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::Result;
use crate::guarantee::Guarantee;
use crate::promise::Promise;
use crate::thenable::Thenable;

struct Slot<T> {
    value: Option<T>,
    waker: Option<Waker>,
    observing: bool,
}

type Shared<T> = Arc<Mutex<Slot<T>>>;

fn shared<T>() -> Shared<T> {
    Arc::new(Mutex::new(Slot {
        value: None,
        waker: None,
        observing: false,
    }))
}

fn deliver<T>(shared: &Shared<T>, value: T) {
    let waker = {
        let mut slot = shared.lock();
        slot.value = Some(value);
        slot.waker.take()
    };

    if let Some(waker) = waker {
        waker.wake();
    }
}

fn poll_slot<T, R>(shared: &Shared<T>, cx: &mut Context, register: R) -> Poll<T>
where
    R: FnOnce(Shared<T>),
{
    let mut slot = shared.lock();

    if let Some(value) = slot.value.take() {
        return Poll::Ready(value);
    }

    slot.waker = Some(cx.waker().clone());

    if !slot.observing {
        slot.observing = true;
        drop(slot);

        // may deliver right away if the source is already settled
        register(shared.clone());

        if let Some(value) = shared.lock().value.take() {
            return Poll::Ready(value);
        }
    }

    Poll::Pending
}

/// Future returned by awaiting a `Promise`.
pub struct PromiseFuture<T> {
    promise: Promise<T>,
    shared: Shared<Result<T>>,
}

impl<T> Future for PromiseFuture<T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Result<T>> {
        let this = self.get_mut();
        let promise = &this.promise;

        poll_slot(&this.shared, cx, |shared| {
            promise.pipe(move |outcome| deliver(&shared, outcome.into_result()))
        })
    }
}

impl<T> IntoFuture for Promise<T>
where
    T: Clone + Send + 'static,
{
    type Output = Result<T>;
    type IntoFuture = PromiseFuture<T>;

    fn into_future(self) -> PromiseFuture<T> {
        PromiseFuture {
            promise: self,
            shared: shared(),
        }
    }
}

impl<T> fmt::Debug for PromiseFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("PromiseFuture").field(&self.promise).finish()
    }
}

/// Future returned by awaiting a `Guarantee`.
pub struct GuaranteeFuture<T> {
    guarantee: Guarantee<T>,
    shared: Shared<T>,
}

impl<T> Future for GuaranteeFuture<T>
where
    T: Clone + Send + 'static,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<T> {
        let this = self.get_mut();
        let guarantee = &this.guarantee;

        poll_slot(&this.shared, cx, |shared| {
            guarantee.observe(move |value| deliver(&shared, value))
        })
    }
}

impl<T> IntoFuture for Guarantee<T>
where
    T: Clone + Send + 'static,
{
    type Output = T;
    type IntoFuture = GuaranteeFuture<T>;

    fn into_future(self) -> GuaranteeFuture<T> {
        GuaranteeFuture {
            guarantee: self,
            shared: shared(),
        }
    }
}

impl<T> fmt::Debug for GuaranteeFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("GuaranteeFuture").field(&self.guarantee).finish()
    }
}

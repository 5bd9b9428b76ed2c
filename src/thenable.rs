// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The combinators shared by promises and guarantees
//!
//! Anything that can report an `Outcome` to an observer is a `Thenable`.
//! Every combinator here produces a new `Promise` which inherits the source's
//! `Config`. The plain form dispatches user work on the config's `map` (or,
//! for terminal handlers, `finish`) executor, and the `_on` form takes the
//! executor explicitly. Rejections pass through untouched without touching
//! any executor.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{catch_panic, Error, PromiseError, Result};
use crate::executor::ExecutorRef;
use crate::features::when_fulfilled_in;
use crate::outcome::Outcome;
use crate::promise::Promise;

pub trait Thenable: Clone + Send + Sync + 'static {
    type Value: Clone + Send + 'static;

    /// Register an observer of the eventual outcome. It runs exactly once, on
    /// the thread that settles the source or right away if it is settled.
    fn pipe<F>(&self, to: F)
    where
        F: FnOnce(Outcome<Self::Value>) + Send + 'static;

    /// Non-blocking snapshot of the outcome.
    fn result(&self) -> Option<Outcome<Self::Value>>;

    /// The configuration captured by the root of this chain.
    fn config(&self) -> &Arc<Config>;

    /// Identity of the underlying cell.
    #[doc(hidden)]
    fn cell_id(&self) -> usize;

    fn is_pending(&self) -> bool {
        self.result().is_none()
    }

    fn is_resolved(&self) -> bool {
        !self.is_pending()
    }

    fn is_fulfilled(&self) -> bool {
        matches!(self.result(), Some(Outcome::Fulfilled(_)))
    }

    fn is_rejected(&self) -> bool {
        matches!(self.result(), Some(Outcome::Rejected(_)))
    }

    fn value(&self) -> Option<Self::Value> {
        match self.result() {
            Some(Outcome::Fulfilled(value)) => Some(value),
            _ => None,
        }
    }

    fn error(&self) -> Option<Error> {
        match self.result() {
            Some(Outcome::Rejected(error)) => Some(error),
            _ => None,
        }
    }

    /// Transform the value once it arrives.
    fn map<U, F>(&self, transform: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Self::Value) -> Result<U> + Send + 'static,
    {
        self.map_on(self.config().map.clone(), transform)
    }

    fn map_on<U, F>(&self, on: ExecutorRef, transform: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Self::Value) -> Result<U> + Send + 'static,
    {
        let (promise, resolver) = Promise::chained(self.config());

        self.pipe(move |outcome| match outcome {
            Outcome::Fulfilled(value) => {
                on.execute(move || resolver.resolve(catch_panic(|| transform(value)).into()))
            }
            Outcome::Rejected(error) => resolver.reject(error),
        });

        promise
    }

    /// Chain another asynchronous step. The returned promise adopts whatever
    /// the body's thenable settles with.
    ///
    /// A body that hands back the very promise being produced would wait on
    /// itself forever, so it is rejected with `PromiseError::ReturnedSelf`.
    fn then<P, F>(&self, body: F) -> Promise<P::Value>
    where
        P: Thenable,
        F: FnOnce(Self::Value) -> Result<P> + Send + 'static,
    {
        self.then_on(self.config().map.clone(), body)
    }

    fn then_on<P, F>(&self, on: ExecutorRef, body: F) -> Promise<P::Value>
    where
        P: Thenable,
        F: FnOnce(Self::Value) -> Result<P> + Send + 'static,
    {
        let (promise, resolver) = Promise::chained(self.config());
        let id = promise.cell_id();

        self.pipe(move |outcome| match outcome {
            Outcome::Fulfilled(value) => on.execute(move || match catch_panic(|| body(value)) {
                Ok(next) if next.cell_id() == id => resolver.reject(PromiseError::ReturnedSelf),
                Ok(next) => next.pipe(move |outcome| resolver.resolve(outcome)),
                Err(error) => resolver.reject(error),
            }),
            Outcome::Rejected(error) => resolver.reject(error),
        });

        promise
    }

    /// Like `map`, but the transform may produce no value, which rejects with
    /// `PromiseError::CompactMapFailed`.
    fn compact_map<U, F>(&self, transform: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Self::Value) -> Result<Option<U>> + Send + 'static,
    {
        self.compact_map_on(self.config().map.clone(), transform)
    }

    fn compact_map_on<U, F>(&self, on: ExecutorRef, transform: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Self::Value) -> Result<Option<U>> + Send + 'static,
    {
        self.map_on(on, move |value| {
            transform(value)?.ok_or_else(|| Error::new(PromiseError::CompactMapFailed))
        })
    }

    /// Terminal side effect on the value, run on the `finish` executor.
    fn done<F>(&self, body: F) -> Promise<()>
    where
        F: FnOnce(Self::Value) -> Result<()> + Send + 'static,
    {
        self.done_on(self.config().finish.clone(), body)
    }

    fn done_on<F>(&self, on: ExecutorRef, body: F) -> Promise<()>
    where
        F: FnOnce(Self::Value) -> Result<()> + Send + 'static,
    {
        self.map_on(on, body)
    }

    /// Look at the value without consuming it. The value passes through
    /// unless the body fails.
    fn get<F>(&self, body: F) -> Promise<Self::Value>
    where
        F: FnOnce(&Self::Value) -> Result<()> + Send + 'static,
    {
        self.get_on(self.config().finish.clone(), body)
    }

    fn get_on<F>(&self, on: ExecutorRef, body: F) -> Promise<Self::Value>
    where
        F: FnOnce(&Self::Value) -> Result<()> + Send + 'static,
    {
        self.map_on(on, move |value| {
            body(&value)?;
            Ok(value)
        })
    }

    /// Discard the value.
    fn as_void(&self) -> Promise<()> {
        self.map_on(ExecutorRef::Inline, |_| Ok(()))
    }

    fn map_values<U, F>(&self, transform: F) -> Promise<Vec<U>>
    where
        Self::Value: IntoIterator,
        U: Clone + Send + 'static,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<U> + Send + 'static,
    {
        self.map_values_on(self.config().map.clone(), transform)
    }

    fn map_values_on<U, F>(&self, on: ExecutorRef, transform: F) -> Promise<Vec<U>>
    where
        Self::Value: IntoIterator,
        U: Clone + Send + 'static,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<U> + Send + 'static,
    {
        self.map_on(on, move |values| values.into_iter().map(transform).collect())
    }

    fn flat_map_values<U, I, F>(&self, transform: F) -> Promise<Vec<U>>
    where
        Self::Value: IntoIterator,
        U: Clone + Send + 'static,
        I: IntoIterator<Item = U>,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<I> + Send + 'static,
    {
        self.flat_map_values_on(self.config().map.clone(), transform)
    }

    fn flat_map_values_on<U, I, F>(&self, on: ExecutorRef, mut transform: F) -> Promise<Vec<U>>
    where
        Self::Value: IntoIterator,
        U: Clone + Send + 'static,
        I: IntoIterator<Item = U>,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<I> + Send + 'static,
    {
        self.map_on(on, move |values| {
            let mut flattened = Vec::new();
            for item in values {
                flattened.extend(transform(item)?);
            }
            Ok(flattened)
        })
    }

    /// Map every element, dropping the ones that produce no value.
    fn compact_map_values<U, F>(&self, transform: F) -> Promise<Vec<U>>
    where
        Self::Value: IntoIterator,
        U: Clone + Send + 'static,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<Option<U>> + Send + 'static,
    {
        self.compact_map_values_on(self.config().map.clone(), transform)
    }

    fn compact_map_values_on<U, F>(&self, on: ExecutorRef, mut transform: F) -> Promise<Vec<U>>
    where
        Self::Value: IntoIterator,
        U: Clone + Send + 'static,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<Option<U>> + Send + 'static,
    {
        self.map_on(on, move |values| {
            let mut kept = Vec::new();
            for item in values {
                if let Some(value) = transform(item)? {
                    kept.push(value);
                }
            }
            Ok(kept)
        })
    }

    fn filter_values<F>(&self, predicate: F) -> Promise<Vec<<Self::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Clone + Send + 'static,
        F: FnMut(&<Self::Value as IntoIterator>::Item) -> bool + Send + 'static,
    {
        self.filter_values_on(self.config().map.clone(), predicate)
    }

    fn filter_values_on<F>(&self, on: ExecutorRef, predicate: F) -> Promise<Vec<<Self::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Clone + Send + 'static,
        F: FnMut(&<Self::Value as IntoIterator>::Item) -> bool + Send + 'static,
    {
        self.map_on(on, move |values| Ok(values.into_iter().filter(predicate).collect()))
    }

    fn sorted_values(&self) -> Promise<Vec<<Self::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Ord + Clone + Send + 'static,
    {
        self.map_on(self.config().map.clone(), |values| {
            let mut sorted: Vec<_> = values.into_iter().collect();
            sorted.sort();
            Ok(sorted)
        })
    }

    /// Stable sort by the key the selector extracts.
    fn sorted_values_by_key<K, F>(&self, selector: F) -> Promise<Vec<<Self::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Clone + Send + 'static,
        K: Ord,
        F: FnMut(&<Self::Value as IntoIterator>::Item) -> K + Send + 'static,
    {
        self.sorted_values_by_key_on(self.config().map.clone(), selector)
    }

    fn sorted_values_by_key_on<K, F>(
        &self,
        on: ExecutorRef,
        selector: F,
    ) -> Promise<Vec<<Self::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Clone + Send + 'static,
        K: Ord,
        F: FnMut(&<Self::Value as IntoIterator>::Item) -> K + Send + 'static,
    {
        self.map_on(on, move |values| {
            let mut sorted: Vec<_> = values.into_iter().collect();
            sorted.sort_by_key(selector);
            Ok(sorted)
        })
    }

    /// The first element, or `PromiseError::EmptySequence`.
    fn first_value(&self) -> Promise<<Self::Value as IntoIterator>::Item>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Clone + Send + 'static,
    {
        self.map_on(ExecutorRef::Inline, |values| {
            values
                .into_iter()
                .next()
                .ok_or_else(|| Error::new(PromiseError::EmptySequence))
        })
    }

    /// The last element, or `PromiseError::EmptySequence`.
    fn last_value(&self) -> Promise<<Self::Value as IntoIterator>::Item>
    where
        Self::Value: IntoIterator,
        <Self::Value as IntoIterator>::Item: Clone + Send + 'static,
    {
        self.map_on(ExecutorRef::Inline, |values| {
            values
                .into_iter()
                .last()
                .ok_or_else(|| Error::new(PromiseError::EmptySequence))
        })
    }

    /// Start one asynchronous step per element and wait for all of them.
    fn then_map_values<P, F>(&self, transform: F) -> Promise<Vec<P::Value>>
    where
        Self::Value: IntoIterator,
        P: Thenable,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<P> + Send + 'static,
    {
        self.then_map_values_on(self.config().map.clone(), transform)
    }

    fn then_map_values_on<P, F>(&self, on: ExecutorRef, transform: F) -> Promise<Vec<P::Value>>
    where
        Self::Value: IntoIterator,
        P: Thenable,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<P> + Send + 'static,
    {
        let config = self.config().clone();

        self.then_on(on, move |values| {
            let steps = values.into_iter().map(transform).collect::<Result<Vec<P>>>()?;
            Ok(when_fulfilled_in(&config, steps))
        })
    }

    /// Like `then_map_values`, concatenating the sequences the steps produce.
    fn then_flat_map_values<P, F>(&self, transform: F) -> Promise<Vec<<P::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        P: Thenable,
        P::Value: IntoIterator,
        <P::Value as IntoIterator>::Item: Clone + Send + 'static,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<P> + Send + 'static,
    {
        self.then_flat_map_values_on(self.config().map.clone(), transform)
    }

    fn then_flat_map_values_on<P, F>(
        &self,
        on: ExecutorRef,
        transform: F,
    ) -> Promise<Vec<<P::Value as IntoIterator>::Item>>
    where
        Self::Value: IntoIterator,
        P: Thenable,
        P::Value: IntoIterator,
        <P::Value as IntoIterator>::Item: Clone + Send + 'static,
        F: FnMut(<Self::Value as IntoIterator>::Item) -> Result<P> + Send + 'static,
    {
        self.then_map_values_on(on, transform)
            .map_on(ExecutorRef::Inline, |nested| Ok(nested.into_iter().flatten().collect()))
    }
}

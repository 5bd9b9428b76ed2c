// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Joins
//!
//! Inputs that are still outstanding when a join is decided are never
//! cancelled. They run to completion and their outcome is discarded.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{self, Config};
use crate::error::PromiseError;
use crate::executor::ExecutorRef;
use crate::guarantee::Guarantee;
use crate::outcome::Outcome;
use crate::promise::{Promise, Resolver};
use crate::thenable::Thenable;

use super::inherited;

struct Slots<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    fn new(len: usize) -> Slots<T> {
        Slots {
            values: (0..len).map(|_| None).collect(),
            remaining: len,
        }
    }

    /// Fill `index`, handing back every value once the last slot is filled.
    fn fill(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        if self.values[index].replace(value).is_none() {
            self.remaining -= 1;
        }

        if self.remaining == 0 {
            Some(self.values.drain(..).flatten().collect())
        } else {
            None
        }
    }
}

/// Wait for every input to fulfill, keeping input order.
///
/// Rejects with the first rejection to arrive, by time rather than by
/// position. No inputs fulfills with an empty `Vec`.
pub fn when_fulfilled<P, I>(thenables: I) -> Promise<Vec<P::Value>>
where
    P: Thenable,
    I: IntoIterator<Item = P>,
{
    let thenables: Vec<P> = thenables.into_iter().collect();
    let config = inherited(&thenables);
    join_fulfilled(&config, thenables)
}

/// `when_fulfilled` with the result bound to `config`.
pub fn when_fulfilled_in<P, I>(config: &Arc<Config>, thenables: I) -> Promise<Vec<P::Value>>
where
    P: Thenable,
    I: IntoIterator<Item = P>,
{
    join_fulfilled(config, thenables.into_iter().collect())
}

fn join_fulfilled<P: Thenable>(config: &Arc<Config>, thenables: Vec<P>) -> Promise<Vec<P::Value>> {
    if thenables.is_empty() {
        return Promise::value_in(config, Vec::new());
    }

    let (promise, resolver) = Promise::chained(config);
    let slots = Arc::new(Mutex::new(Slots::new(thenables.len())));

    for (index, thenable) in thenables.iter().enumerate() {
        let slots = slots.clone();
        let resolver = resolver.clone();

        thenable.pipe(move |outcome| match outcome {
            Outcome::Fulfilled(value) => {
                let all = slots.lock().fill(index, value);
                if let Some(values) = all {
                    resolver.fulfill(values);
                }
            }
            Outcome::Rejected(error) => resolver.reject(error),
        });
    }

    promise
}

/// Wait for two thenables of different types.
pub fn when_fulfilled2<A, B>(a: A, b: B) -> Promise<(A::Value, B::Value)>
where
    A: Thenable,
    B: Thenable,
{
    let (promise, resolver) = Promise::chained(a.config());
    let pair = Arc::new(Mutex::new((None, None)));

    {
        let pair = pair.clone();
        let resolver = resolver.clone();

        a.pipe(move |outcome| match outcome {
            Outcome::Fulfilled(value) => {
                let both = {
                    let mut pair = pair.lock();
                    pair.0 = Some(value);
                    take_both(&mut pair)
                };
                if let Some(both) = both {
                    resolver.fulfill(both);
                }
            }
            Outcome::Rejected(error) => resolver.reject(error),
        });
    }

    b.pipe(move |outcome| match outcome {
        Outcome::Fulfilled(value) => {
            let both = {
                let mut pair = pair.lock();
                pair.1 = Some(value);
                take_both(&mut pair)
            };
            if let Some(both) = both {
                resolver.fulfill(both);
            }
        }
        Outcome::Rejected(error) => resolver.reject(error),
    });

    promise
}

fn take_both<X, Y>(pair: &mut (Option<X>, Option<Y>)) -> Option<(X, Y)> {
    match (pair.0.take(), pair.1.take()) {
        (Some(x), Some(y)) => Some((x, y)),
        (x, y) => {
            pair.0 = x;
            pair.1 = y;
            None
        }
    }
}

/// Wait for three thenables of different types.
pub fn when_fulfilled3<A, B, C>(a: A, b: B, c: C) -> Promise<(A::Value, B::Value, C::Value)>
where
    A: Thenable,
    B: Thenable,
    C: Thenable,
{
    when_fulfilled2(when_fulfilled2(a, b), c).map_on(ExecutorRef::Inline, |((a, b), c)| Ok((a, b, c)))
}

/// Wait for every promise to settle and report each outcome in input order.
/// The result never rejects.
pub fn when_resolved<T, I>(promises: I) -> Guarantee<Vec<Outcome<T>>>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<T>>,
{
    let promises: Vec<Promise<T>> = promises.into_iter().collect();
    let config = inherited(&promises);

    if promises.is_empty() {
        return Guarantee::value_in(&config, Vec::new());
    }

    let (guarantee, sealer) = Guarantee::chained(&config);
    let slots = Arc::new(Mutex::new(Slots::new(promises.len())));

    for (index, promise) in promises.iter().enumerate() {
        let slots = slots.clone();
        let sealer = sealer.clone();

        promise.pipe(move |outcome| {
            let all = slots.lock().fill(index, outcome);
            if let Some(outcomes) = all {
                sealer.seal(outcomes);
            }
        });
    }

    guarantee
}

/// Wait for every guarantee to seal, keeping input order.
pub fn when_guarantee<T, I>(guarantees: I) -> Guarantee<Vec<T>>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = Guarantee<T>>,
{
    let guarantees: Vec<Guarantee<T>> = guarantees.into_iter().collect();
    let config = inherited(&guarantees);

    if guarantees.is_empty() {
        return Guarantee::value_in(&config, Vec::new());
    }

    let (joined, sealer) = Guarantee::chained(&config);
    let slots = Arc::new(Mutex::new(Slots::new(guarantees.len())));

    for (index, guarantee) in guarantees.iter().enumerate() {
        let slots = slots.clone();
        let sealer = sealer.clone();

        guarantee.observe(move |value| {
            let all = slots.lock().fill(index, value);
            if let Some(values) = all {
                sealer.seal(values);
            }
        });
    }

    joined
}

struct Pump<I, T> {
    source: Option<I>,
    limit: usize,
    values: Vec<Option<T>>,
    in_flight: usize,
    exhausted: bool,
    pumping: bool,
}

/// Pull thenables lazily from `source`, keeping at most `concurrently` of
/// them outstanding, and wait for all of them to fulfill.
///
/// Values come back in the order they were pulled. The first rejection
/// rejects the join and nothing more is pulled. `concurrently == 0` rejects
/// with `PromiseError::BadInput` without touching `source`.
pub fn when_fulfilled_concurrently<P, I>(source: I, concurrently: usize) -> Promise<Vec<P::Value>>
where
    P: Thenable,
    I: IntoIterator<Item = P>,
    I::IntoIter: Send + 'static,
{
    when_fulfilled_concurrently_in(&config::current(), source, concurrently)
}

pub fn when_fulfilled_concurrently_in<P, I>(
    config: &Arc<Config>,
    source: I,
    concurrently: usize,
) -> Promise<Vec<P::Value>>
where
    P: Thenable,
    I: IntoIterator<Item = P>,
    I::IntoIter: Send + 'static,
{
    if concurrently == 0 {
        return Promise::rejected_in(config, PromiseError::BadInput);
    }

    let (promise, resolver) = Promise::chained(config);

    let pump = Arc::new(Mutex::new(Pump {
        source: Some(source.into_iter()),
        limit: concurrently,
        values: Vec::new(),
        in_flight: 0,
        exhausted: false,
        pumping: false,
    }));

    run_pump(&pump, &resolver);
    promise
}

// Admits thenables until the limit is reached or the source runs dry.
//
// Completions call back in here. Only one thread drives the loop at a time:
// anyone arriving while `pumping` is set has already updated the counters
// under the lock, and the driver re-reads them before it gives up the role.
fn run_pump<I, P>(pump: &Arc<Mutex<Pump<I, P::Value>>>, resolver: &Resolver<Vec<P::Value>>)
where
    I: Iterator<Item = P> + Send + 'static,
    P: Thenable,
{
    {
        let mut state = pump.lock();
        if state.pumping {
            return;
        }
        state.pumping = true;
    }

    loop {
        let mut state = pump.lock();

        if resolver.is_settled() {
            state.pumping = false;
            state.source = None;
            return;
        }

        if state.exhausted && state.in_flight == 0 {
            state.pumping = false;
            let values: Vec<P::Value> = state.values.drain(..).flatten().collect();
            drop(state);
            resolver.fulfill(values);
            return;
        }

        if state.exhausted || state.in_flight >= state.limit {
            state.pumping = false;
            return;
        }

        let mut source = match state.source.take() {
            Some(source) => source,
            None => {
                state.exhausted = true;
                continue;
            }
        };
        drop(state);

        // the source may run arbitrary code, keep it outside the lock
        let next = source.next();

        let mut state = pump.lock();
        let thenable = match next {
            Some(thenable) => thenable,
            None => {
                state.exhausted = true;
                continue;
            }
        };

        state.source = Some(source);
        let index = state.values.len();
        state.values.push(None);
        state.in_flight += 1;
        drop(state);

        trace!("admitted thenable {} into a bounded join", index);

        let pump = pump.clone();
        let resolver = resolver.clone();

        thenable.pipe(move |outcome| match outcome {
            Outcome::Fulfilled(value) => {
                {
                    let mut state = pump.lock();
                    state.values[index] = Some(value);
                    state.in_flight -= 1;
                }
                run_pump(&pump, &resolver);
            }
            Outcome::Rejected(error) => {
                pump.lock().in_flight -= 1;
                resolver.reject(error);
            }
        });
    }
}

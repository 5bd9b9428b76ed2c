// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::PromiseError;
use crate::guarantee::Guarantee;
use crate::promise::Promise;
use crate::thenable::Thenable;

use super::inherited;

/// Settle with whichever input settles first, fulfilled or rejected.
///
/// Later settlements are ignored. No inputs rejects with
/// `PromiseError::BadInput`.
pub fn race<P, I>(thenables: I) -> Promise<P::Value>
where
    P: Thenable,
    I: IntoIterator<Item = P>,
{
    let thenables: Vec<P> = thenables.into_iter().collect();
    let config = inherited(&thenables);

    if thenables.is_empty() {
        return Promise::rejected_in(&config, PromiseError::BadInput);
    }

    let (promise, resolver) = Promise::chained(&config);

    for (index, thenable) in thenables.iter().enumerate() {
        let resolver = resolver.clone();
        thenable.pipe(move |outcome| {
            if resolver.is_settled() {
                trace!("race input {} settled after the race was decided", index);
            }
            resolver.resolve(outcome);
        });
    }

    promise
}

/// Seal with whichever guarantee seals first.
///
/// With no inputs the result never seals.
pub fn race_guarantees<T, I>(guarantees: I) -> Guarantee<T>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = Guarantee<T>>,
{
    let guarantees: Vec<Guarantee<T>> = guarantees.into_iter().collect();
    let (winner, sealer) = Guarantee::chained(&inherited(&guarantees));

    for guarantee in &guarantees {
        let sealer = sealer.clone();
        guarantee.observe(move |value| sealer.seal(value));
    }

    winner
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::config::Config;
    use crate::error::Error;

    #[test]
    fn test_first_settlement_wins() {
        let config = Config::inline().into_shared();
        let (slow, slow_resolver) = Promise::pending_in(&config);
        let (fast, fast_resolver) = Promise::pending_in(&config);

        let winner = race(vec![slow, fast]);
        fast_resolver.reject(Error::msg("fast"));
        slow_resolver.fulfill(1);

        assert_eq!(winner.error().unwrap().to_string(), "fast");
    }

    #[test]
    fn test_empty_race() {
        let winner = race(Vec::<Promise<i32>>::new());
        assert_eq!(
            winner.error().unwrap().downcast_ref::<PromiseError>(),
            Some(&PromiseError::BadInput)
        );

        let never = race_guarantees(Vec::<Guarantee<i32>>::new());
        assert!(never.is_pending());
    }

    #[test]
    fn test_race_guarantees() {
        let config = Config::inline().into_shared();
        let (a, seal_a) = Guarantee::pending_in(&config);
        let (b, seal_b) = Guarantee::pending_in(&config);

        let winner = race_guarantees(vec![a, b]);
        seal_b.seal("b");
        seal_a.seal("a");

        assert_eq!(winner.wait(), "b");
    }
}

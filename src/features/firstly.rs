// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{catch_panic, Result};
use crate::guarantee::Guarantee;
use crate::promise::Promise;
use crate::thenable::Thenable;

/// Start a chain by running `body` right away on the calling thread.
///
/// A body that fails, or panics, before producing a thenable yields an
/// already rejected promise instead of unwinding into the caller.
pub fn firstly<P, F>(body: F) -> Promise<P::Value>
where
    P: Thenable,
    F: FnOnce() -> Result<P>,
{
    match catch_panic(body) {
        Ok(first) => Promise::from_thenable(&first),
        Err(error) => Promise::rejected(error),
    }
}

pub fn firstly_guarantee<T, F>(body: F) -> Guarantee<T>
where
    T: Clone + Send + 'static,
    F: FnOnce() -> Guarantee<T>,
{
    body()
}

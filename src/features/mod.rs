// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Combinators over several thenables, and free-standing entry points
//!
//! Aggregates inherit the `Config` of their first input. With no inputs there
//! is nothing to inherit from and the process-wide default is used.

pub use self::after::{after, after_in};
pub use self::firstly::{firstly, firstly_guarantee};
pub use self::race::{race, race_guarantees};
pub use self::when::{
    when_fulfilled, when_fulfilled2, when_fulfilled3, when_fulfilled_concurrently,
    when_fulfilled_concurrently_in, when_fulfilled_in, when_guarantee, when_resolved,
};

pub mod after;
pub mod firstly;
pub mod race;
pub mod when;

use std::sync::Arc;

use crate::config::{self, Config};
use crate::thenable::Thenable;

fn inherited<P: Thenable>(inputs: &[P]) -> Arc<Config> {
    match inputs.first() {
        Some(first) => first.config().clone(),
        None => config::current(),
    }
}

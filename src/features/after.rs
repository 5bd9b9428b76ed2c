// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{self, Config};
use crate::guarantee::Guarantee;

/// A guarantee sealed once `delay` has elapsed.
pub fn after(delay: Duration) -> Guarantee<()> {
    after_in(&config::current(), delay)
}

/// `after` on the timer of `config`.
pub fn after_in(config: &Arc<Config>, delay: Duration) -> Guarantee<()> {
    let (guarantee, sealer) = Guarantee::pending_in(config);
    config.timer.schedule(delay, Box::new(move || sealer.seal(())));
    guarantee
}

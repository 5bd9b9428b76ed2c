// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default executors, catch policy and timer
//!
//! A root promise or guarantee captures an `Arc<Config>` when it is created
//! and every promise derived from it carries the same `Arc`. Combinators
//! called without an explicit executor or policy consult that captured value,
//! never a global. The process-wide default below only decides what a new
//! root captures, so `configure` affects chains created afterwards.
//!
//! The defaults are therefore read when a root is created, not when a
//! combinator is called: `map` on a promise created before `configure` still
//! runs on the executor that promise captured. Pass an executor to the `_on`
//! variants to pick one at call time.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::CatchPolicy;
use crate::executor::{ExecutorRef, SerialExecutor};
use crate::timer::{Timer, TimerThread};

static MAIN_EXECUTOR: Lazy<ExecutorRef> = Lazy::new(|| ExecutorRef::new(SerialExecutor::new("pledge-main")));

static TIMER: Lazy<Arc<dyn Timer>> = Lazy::new(|| Arc::new(TimerThread::new("pledge-timer")));

static CURRENT: Lazy<RwLock<Arc<Config>>> = Lazy::new(|| RwLock::new(Arc::new(Config::default())));

#[derive(Clone)]
pub struct Config {
    /// Where transform-style continuations run (`map`, `then`, `recover`, ...).
    pub map: ExecutorRef,
    /// Where terminal continuations run (`done`, `catch`, `ensure`, `finally`, ...).
    pub finish: ExecutorRef,
    /// Policy used by `catch` and `recover` when none is given.
    pub catch_policy: CatchPolicy,
    /// Clock behind `after`.
    pub timer: Arc<dyn Timer>,
}

impl Config {
    /// Every continuation runs inline on the thread that settles its input.
    pub fn inline() -> Config {
        Config {
            map: ExecutorRef::Inline,
            finish: ExecutorRef::Inline,
            ..Config::default()
        }
    }

    pub fn with_map(mut self, map: ExecutorRef) -> Config {
        self.map = map;
        self
    }

    pub fn with_finish(mut self, finish: ExecutorRef) -> Config {
        self.finish = finish;
        self
    }

    pub fn with_catch_policy(mut self, policy: CatchPolicy) -> Config {
        self.catch_policy = policy;
        self
    }

    pub fn with_timer<T: Timer>(mut self, timer: T) -> Config {
        self.timer = Arc::new(timer);
        self
    }

    pub fn into_shared(self) -> Arc<Config> {
        Arc::new(self)
    }
}

impl Default for Config {
    /// Both executor slots share one serial `pledge-main` thread, cancellation
    /// errors are skipped by `catch`, and `after` uses a shared timer thread.
    fn default() -> Config {
        Config {
            map: MAIN_EXECUTOR.clone(),
            finish: MAIN_EXECUTOR.clone(),
            catch_policy: CatchPolicy::default(),
            timer: TIMER.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("map", &self.map)
            .field("finish", &self.finish)
            .field("catch_policy", &self.catch_policy)
            .finish()
    }
}

/// Replace the process-wide default captured by new roots.
pub fn configure(config: Config) {
    debug!("installing {:?}", config);
    *CURRENT.write() = Arc::new(config);
}

/// The process-wide default captured by new roots.
pub fn current() -> Arc<Config> {
    CURRENT.read().clone()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_inline_config() {
        let config = Config::inline().with_catch_policy(CatchPolicy::AllErrors);
        assert!(config.map.is_inline());
        assert!(config.finish.is_inline());
        assert_eq!(config.catch_policy, CatchPolicy::AllErrors);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.map.is_inline());
        assert_eq!(config.catch_policy, CatchPolicy::AllErrorsExceptCancellation);
    }
}

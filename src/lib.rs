// The MIT License (MIT)

// Copyright (c) 2026 The pledge Developers

//  Permission is hereby granted, free of charge, to any person obtaining a
//  copy of this software and associated documentation files (the "Software"),
//  to deal in the Software without restriction, including without limitation
//  the rights to use, copy, modify, merge, publish, distribute, sublicense,
//  and/or sell copies of the Software, and to permit persons to whom the
//  Software is furnished to do so, subject to the following conditions:
//
//  The above copyright notice and this permission notice shall be included in
//  all copies or substantial portions of the Software.
//
//  THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
//  OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//  FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//  AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//  LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
//  FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
//  DEALINGS IN THE SOFTWARE.

//! Single-assignment promises and guarantees
//!
//! A `Promise<T>` is settled exactly once, with a value or an `Error`; a
//! `Guarantee<T>` is sealed exactly once with a value and cannot fail. Both are
//! `Thenable`, so the same combinators (`map`, `then`, `catch`, `recover`,
//! `when_fulfilled`, `race`, ...) compose either of them into new promises
//! without ever blocking a thread.
//!
//! ```no_run
//! use pledge::{when_fulfilled, Promise, Thenable};
//!
//! let doubled = Promise::value(2)
//!     .then(|v| Ok(Promise::value(v * 2)))
//!     .map(|v| Ok(v + 1));
//!
//! let all = when_fulfilled(vec![doubled, Promise::value(10)]);
//! assert_eq!(all.wait().unwrap(), vec![5, 10]);
//! ```
//!
//! Continuations run on the executors of the `Config` captured when the
//! root of a chain was created; see the `config` module.

#[macro_use]
extern crate log;

pub use crate::catchable::Finalizer;
pub use crate::config::{configure, current, Config};
pub use crate::error::{CancellableError, CatchPolicy, Error, PromiseError, Result};
pub use crate::executor::{Executor, ExecutorRef, Job, SerialExecutor, SpawnExecutor};
pub use crate::features::{
    after, after_in, firstly, firstly_guarantee, race, race_guarantees, when_fulfilled, when_fulfilled2,
    when_fulfilled3, when_fulfilled_concurrently, when_fulfilled_concurrently_in, when_fulfilled_in,
    when_guarantee, when_resolved,
};
pub use crate::future::{GuaranteeFuture, PromiseFuture};
pub use crate::guarantee::{Guarantee, Sealer};
pub use crate::outcome::Outcome;
pub use crate::promise::{Promise, Resolver};
pub use crate::thenable::Thenable;
pub use crate::timer::{Timer, TimerThread};

pub mod catchable;
pub mod config;
pub mod error;
pub mod executor;
pub mod features;
pub mod future;
pub mod guarantee;
pub mod outcome;
pub mod promise;
pub mod sync;
pub mod thenable;
pub mod timer;

mod cell;

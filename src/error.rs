// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rejection values and the errors produced by the combinators themselves

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::result;
use std::sync::Arc;

/// Result type returned by every fallible body handed to a combinator.
pub type Result<T, E = Error> = result::Result<T, E>;

/// Errors raised by the combinators themselves.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromiseError {
    #[error("a closure was called with an invalid calling convention, probably (None, None)")]
    InvalidCallingConvention,
    #[error("a promise handler returned itself")]
    ReturnedSelf,
    #[error("bad input was provided to a promise function")]
    BadInput,
    #[error("the asynchronous sequence was cancelled")]
    Cancelled,
    #[error("could not compact_map: the transform produced no value")]
    CompactMapFailed,
    #[error("the first or last element was requested for an empty sequence")]
    EmptySequence,
    #[error("a promise body panicked: {0}")]
    Panicked(String),
}

/// An error that knows whether it represents a cooperative cancellation.
pub trait CancellableError: StdError + Send + Sync + 'static {
    fn is_cancelled(&self) -> bool;
}

/// The rejection carried by a `Promise`.
///
/// One rejection may be delivered to any number of observers, so the
/// underlying error is shared behind an `Arc` and cloning is cheap. `Error`
/// does not implement `std::error::Error` itself; that keeps the blanket
/// `From` conversion below coherent so `?` works on any error type inside a
/// promise body.
#[derive(Clone)]
pub struct Error {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
    cancelled: bool,
}

impl Error {
    pub fn new<E>(error: E) -> Error
    where
        E: StdError + Send + Sync + 'static,
    {
        Error {
            inner: Arc::new(error),
            cancelled: false,
        }
    }

    /// Wrap an error that carries its own cancellation marker.
    pub fn cancellable<E>(error: E) -> Error
    where
        E: CancellableError,
    {
        let cancelled = error.is_cancelled();
        Error {
            inner: Arc::new(error),
            cancelled,
        }
    }

    /// Shorthand for `PromiseError::Cancelled`.
    pub fn cancelled() -> Error {
        Error::new(PromiseError::Cancelled)
    }

    /// Build an error from a plain message.
    pub fn msg<M>(message: M) -> Error
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Error::new(MessageError(message))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled || self.downcast_ref::<PromiseError>() == Some(&PromiseError::Cancelled)
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.inner.is::<E>()
    }

    /// The wrapped error as a standard error trait object.
    pub fn as_std(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    /// Whether both values share the same underlying error allocation.
    pub fn ptr_eq(&self, other: &Error) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> From<E> for Error
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Error {
        Error::new(error)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

struct MessageError<M>(M);

impl<M: fmt::Debug> fmt::Debug for MessageError<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<M: fmt::Display> fmt::Display for MessageError<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<M: fmt::Display + fmt::Debug> StdError for MessageError<M> {}

/// Which rejections a `catch` or `recover` handler is willing to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchPolicy {
    AllErrors,
    AllErrorsExceptCancellation,
}

impl CatchPolicy {
    pub fn admits(self, error: &Error) -> bool {
        match self {
            CatchPolicy::AllErrors => true,
            CatchPolicy::AllErrorsExceptCancellation => !error.is_cancelled(),
        }
    }
}

impl Default for CatchPolicy {
    fn default() -> CatchPolicy {
        CatchPolicy::AllErrorsExceptCancellation
    }
}

/// Run a user body, turning a panic into a `PromiseError::Panicked` rejection.
pub(crate) fn catch_panic<R, F>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::new(PromiseError::Panicked(panic_message(&*payload)))),
    }
}

/// Run a user body that has no failure channel. A panic is logged and
/// swallowed so it cannot unwind through the cell that invoked the body.
pub(crate) fn log_panic<F>(what: &str, f: F) -> bool
where
    F: FnOnce(),
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!("{} panicked: {}", what, panic_message(&*payload));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

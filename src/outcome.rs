// Copyright 2026 The pledge Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The settled state of a fallible computation

use std::fmt;

use crate::error::{Error, Result};

/// Either the value a promise was fulfilled with, or the error it was rejected with.
#[derive(Clone)]
pub enum Outcome<T> {
    Fulfilled(T),
    Rejected(Error),
}

impl<T> Outcome<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(*self, Outcome::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_fulfilled()
    }

    pub fn value(&self) -> Option<&T> {
        match *self {
            Outcome::Fulfilled(ref value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match *self {
            Outcome::Fulfilled(_) => None,
            Outcome::Rejected(ref error) => Some(error),
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Fulfilled(value) => Outcome::Fulfilled(f(value)),
            Outcome::Rejected(error) => Outcome::Rejected(error),
        }
    }

    pub fn into_result(self) -> Result<T> {
        self.into()
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Outcome<T> {
        match result {
            Ok(value) => Outcome::Fulfilled(value),
            Err(error) => Outcome::Rejected(error),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T> {
    fn from(outcome: Outcome<T>) -> Result<T> {
        match outcome {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(error) => Err(error),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Outcome::Fulfilled(ref value) => f.debug_tuple("Fulfilled").field(value).finish(),
            Outcome::Rejected(ref error) => f.debug_tuple("Rejected").field(error).finish(),
        }
    }
}

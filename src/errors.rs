// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module defines the errors which may be raised while setting up the
//! variables of a problem or while driving them through the simulator.
//!
//! # Note
//! Infeasibility is never an error: it is conveyed by the infeasible utility
//! sentinel (see `Objective`). Protocol violations (a child index that does
//! not exist, a message coming from a stranger) are programming errors and
//! these make the code panic instead.

use thiserror::Error;

/// The things that may go wrong when building or running a problem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A variable was declared with an empty domain
    #[error("variable {0} has an empty domain")]
    EmptyDomain(String),
    /// A utility space bears on a variable it gives no domain for
    #[error("variable {owner} has no domain for {variable}")]
    MissingDomain { owner: String, variable: String },
    /// A utility table does not have one entry per assignment
    #[error("a table over {variables:?} needs {expected} entries (got {actual})")]
    InvalidTable { variables: Vec<String>, expected: usize, actual: usize },
    /// A topology lists the same child twice
    #[error("variable {variable} lists its child {child} twice")]
    DuplicateChild { variable: String, child: String },
    /// The upper bound table only supports this many children
    #[error("variable {variable} has {count} children (at most {max} are supported)")]
    TooManyChildren { variable: String, count: usize, max: usize },
    /// Two runtimes were registered for the same variable
    #[error("variable {0} is declared twice")]
    DuplicateVariable(String),
    /// A message was sent to a variable nobody declared
    #[error("no variable named {0}")]
    UnknownReceiver(String),
    /// The simulation did not terminate within the allowed number of messages
    #[error("the message budget ({0}) is exhausted")]
    MessageBudgetExhausted(usize),
    /// The message queue ran dry while some variables were still undecided
    #[error("variables {0:?} never terminated")]
    Unterminated(Vec<String>),
}

/// The result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test_errors {
    use crate::Error;

    #[test]
    fn errors_have_a_readable_description() {
        let e = Error::MissingDomain { owner: "x".to_string(), variable: "y".to_string() };
        assert_eq!("variable x has no domain for y", e.to_string());
        assert_eq!("the message budget (10) is exhausted", Error::MessageBudgetExhausted(10).to_string());
    }
}

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

//! # ODPOP
//! This crate implements the core of O-DPOP, the best-first flavour of the
//! DPOP algorithm for distributed constraint optimization (DCOP), along with
//! its asynchronous variant AS-O-DPOP. In both, the variables are arranged in
//! a pseudo-tree. During the UTIL phase, each variable aggregates the *goods*
//! (partial assignments to its separator along with the utility its subtree
//! reaches under them) reported by its children in a goods tree, and reports
//! its own goods to its parent, best first. Once the root knows its optimum,
//! the VALUE phase propagates the optimal values down the pseudo-tree.
//!
//! ## Quick Example
//! The following solves a problem with two variables: `x` (the root) has a
//! unary utility and `y` (its child) shares a binary utility with `x`.
//! ```
//! # use odpop::*;
//! let x_alone = Hypercube::new(vec!["x".to_string()], vec![vec![0, 1]], vec![1, 0]).unwrap();
//! let x_and_y = Hypercube::from_fn(
//!         vec!["x".to_string(), "y".to_string()],
//!         vec![vec![0, 1], vec![0, 1]],
//!         |values: &[i32]| if values[0] != values[1] { 7 } else { 0 }
//!     ).unwrap();
//!
//! let mut simulation = Simulation::new(SolverConfig::default(), Protocol::Odpop);
//! simulation.add_variable(Topology::new("x", vec![0, 1])
//!     .with_child("y")
//!     .with_space(Box::new(x_alone))).unwrap();
//! simulation.add_variable(Topology::new("y", vec![0, 1])
//!     .with_parent("x")
//!     .with_space(Box::new(x_and_y))).unwrap();
//!
//! let solution = simulation.run().unwrap();
//! assert_eq!(Some(8), solution.utility());
//! assert_eq!(Some(&0), solution.assignment.get("x"));
//! assert_eq!(Some(&1), solution.assignment.get("y"));
//! ```

mod common;
mod errors;
mod abstraction;
mod implementation;

pub use common::*;
pub use errors::*;
pub use abstraction::*;
pub use implementation::*;

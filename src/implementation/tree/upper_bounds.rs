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

//! This module provides the table of the sums of the children upper bounds.
//! For a variable having `k` children, the table stores the `2^k` sums of the
//! last known upper bounds of every subset of these children. This is what
//! makes the pricing of the information a leaf is still waiting for an O(1)
//! lookup rather than a loop over the children.

use crate::{Objective, Utility};

/// The largest number of children the table supports
pub const MAX_CHILDREN: usize = 20;

/// The subset sums of the children upper bounds. Subsets are given as a bit
/// mask: bit `i` is set iff child `i` belongs to the subset.
#[derive(Debug, Clone)]
pub struct UpperBoundSums<U> {
    /// The last known upper bound of each child (None until it is known)
    bounds: Vec<Option<U>>,
    /// `sums[mask]` is the sum of the bounds of the children in mask. It is
    /// only maintained once every bound is known.
    sums: Vec<U>,
    ready: bool,
}

impl <U: Utility> UpperBoundSums<U> {
    pub fn new(nb_children: usize) -> Self {
        assert!(nb_children <= MAX_CHILDREN, "too many children for the upper bound table");
        UpperBoundSums { bounds: vec![None; nb_children], sums: vec![], ready: false }
    }
    pub fn nb_children(&self) -> usize {
        self.bounds.len()
    }
    /// The mask comprising all children
    pub fn full_mask(&self) -> usize {
        (1 << self.bounds.len()) - 1
    }
    /// True once every child has an upper bound
    pub fn is_ready(&self) -> bool {
        self.ready
    }
    pub fn bound(&self, child: usize) -> Option<U> {
        self.bounds[child]
    }

    /// Lowers the upper bound of the given child. A bound that is better
    /// than the current one is ignored: the goods of a child come best first,
    /// so a better one can only be a late copy of some former good. Returns
    /// true iff the bound changed.
    pub fn tighten(&mut self, child: usize, ub: U, objective: Objective) -> bool {
        match self.bounds[child] {
            Some(current) if objective.better(ub, current) => false,
            _ => self.set(child, ub),
        }
    }

    /// Sets the upper bound of the given child. Returns true iff the bound
    /// changed.
    fn set(&mut self, child: usize, ub: U) -> bool {
        let old = self.bounds[child];
        if old == Some(ub) {
            return false;
        }
        self.bounds[child] = Some(ub);
        match old {
            Some(old) if self.ready && !old.is_infinite() && !ub.is_infinite() => {
                let bit = 1 << child;
                for mask in 0..self.sums.len() {
                    if mask & bit != 0 {
                        self.sums[mask] = self.sums[mask].sub(old).add(ub);
                    }
                }
            }
            _ => {
                if self.bounds.iter().all(|b| b.is_some()) {
                    self.rebuild();
                }
            }
        }
        true
    }

    /// Recomputes all subset sums from scratch. Each sum extends the sum of
    /// the same subset deprived of its lowest child.
    fn rebuild(&mut self) {
        let n = 1_usize << self.bounds.len();
        self.sums.clear();
        self.sums.reserve(n);
        self.sums.push(U::zero());
        for mask in 1..n {
            let low = mask.trailing_zeros() as usize;
            let rest = mask & (mask - 1);
            let bound = self.bounds[low].unwrap_or_else(U::zero);
            let sum = self.sums[rest].add(bound);
            self.sums.push(sum);
        }
        self.ready = true;
    }

    /// The sum of the bounds of the children in `mask`. An infinite bound
    /// absorbs the sum, even before every bound is known. Otherwise, the sum
    /// is None as long as one of the bounds it needs is unknown.
    pub fn sum(&self, mask: usize) -> Option<U> {
        if mask == 0 {
            return Some(U::zero());
        }
        if self.ready {
            return Some(self.sums[mask]);
        }
        let mut total = Some(U::zero());
        for (i, b) in self.bounds.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            match b {
                Some(b) if b.is_infinite() => return Some(*b),
                Some(b) => total = total.map(|t| t.add(*b)),
                None => total = None,
            }
        }
        total
    }
    /// The sum of all the bounds
    pub fn total(&self) -> Option<U> {
        self.sum(self.full_mask())
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

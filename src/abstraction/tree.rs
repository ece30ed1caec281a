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

//! This module defines the contract of a goods tree: the per-variable
//! structure which aggregates the goods reported by the children of a
//! variable and hands out, best first, the goods that variable should report
//! to its own parent.

use crate::{Context, Domains, Good, Utility, Value};

/// The operations of a goods tree. The UTIL and VALUE propagation protocols
/// only ever talk to a tree through this trait, which lets a variable without
/// children use a much simpler (leaf) tree than an inner variable.
///
/// # Children
/// Children are identified by their index in the children list the tree was
/// created with. Referring to a child which does not exist is a programming
/// error and the implementations panic when that happens.
pub trait GoodsTree<V: Value, U: Utility> {
    /// The name of the variable owning this tree
    fn own_variable(&self) -> &str;

    /// The separator variables currently known to this tree (that is, the
    /// variables of the goods produced by `get_amax`), in reporting order.
    fn separator(&self) -> Vec<String>;

    /// Incorporates a good reported by the child `sender`. The optional
    /// `domains` carry the complete domain of (some of) the variables of the
    /// good. Returns true iff the good made the tree discover a variable it
    /// did not know so far.
    fn add(&mut self, good: &Good<V, U>, sender: usize, domains: Option<&Domains<V>>) -> bool;

    /// Returns the best good this tree can currently report, or None when
    /// that good cannot be proven optimal yet.
    ///
    /// # Note
    /// This method takes `&mut self` because it brings the cached bounds up
    /// to date before answering. It never changes the set of goods known
    /// to the tree: calling it twice in a row returns the same good, and
    /// only `remove_amax` discards it.
    fn get_amax(&mut self) -> Option<Good<V, U>>;

    /// Discards the good last returned by `get_amax` so that it is never
    /// reported again.
    fn remove_amax(&mut self);

    /// True when the best utility of the tree is confirmed and no upper bound
    /// exceeds it.
    fn is_valuation_sufficient(&mut self) -> bool;

    /// True as long as the tree still has some live branch.
    fn has_more(&self) -> bool;

    /// Records that `child` has no more information to report. Returns true
    /// when this makes the whole problem of the owner infeasible. Calling it
    /// twice for the same child is harmless.
    fn set_child_done(&mut self, child: usize) -> bool;

    /// Returns the value of the owner's variable which is best given the
    /// values assigned to the separator in `context`. Separator variables
    /// missing from the context are optimized over.
    fn best_assignment_for_own_variable(&self, context: &Context<V>) -> V;

    /// Returns the value of the owner's variable in the best confirmed
    /// assignment. Only meaningful at the root of the pseudo-tree.
    fn own_variable_value(&mut self, context: &Context<V>) -> V {
        self.best_assignment_for_own_variable(context)
    }

    /// The best utility currently known to the tree (if any)
    fn best_utility(&mut self) -> Option<U>;

    /// True when `good` is speculative and `child` already confirmed the
    /// utility of the very same assignment.
    fn ignore_good(&self, _good: &Good<V, U>, _child: usize) -> bool {
        false
    }

    /// Restricts the context to the variables the given child reports about
    /// (plus the owner's own variable).
    fn child_values(&self, context: &Context<V>, child: usize) -> Context<V>;

    /// Announces the order in which `child` lists its separator variables.
    fn set_children_separator(&mut self, child: usize, variables: &[String]);

    /// The order in which `child` lists its separator variables. This is
    /// what compact UTIL messages (without variable names) are decoded with.
    fn child_separator_reporting_order(&self, child: usize) -> Vec<String>;

    /// The known domain of each separator variable (reporting order)
    fn domains(&self) -> Vec<Vec<V>>;

    /// The final domain size of each separator variable, when known
    fn final_domain_sizes(&self) -> Vec<Option<usize>>;

    /// Domain size hints for (some of) the separator variables
    fn set_final_domain_size(&mut self, variables: &[String], sizes: &[Option<usize>]);

    /// Returns the final domain sizes if they changed since the last call
    fn take_domain_size_update(&mut self) -> Option<Vec<Option<usize>>>;

    /// True when the goods of this tree carry no information for the parent
    /// (the separator is empty)
    fn not_enough_info(&self) -> bool;

    /// Counters describing the work done by this tree
    fn stats(&self) -> TreeStats;
}

/// Counters describing the work done by a tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStats {
    /// Number of leaves ever created
    pub leaves: usize,
    /// Number of leaves ever created below a dummy placeholder
    pub dummy_leaves: usize,
    /// Number of goods produced by `get_amax`
    pub goods_produced: usize,
    /// Among these, the speculative ones
    pub speculative_goods: usize,
    /// Among these, the confirmed ones
    pub confirmed_goods: usize,
    /// The size of the (known) assignment space of separator + own variable
    pub space_size: f64,
    /// Number of variables which still have a dummy placeholder
    pub dummies: usize,
}
impl TreeStats {
    /// Percentage of the assignment space materialized as leaves
    pub fn tree_fill(&self) -> f64 {
        if self.space_size > 0.0 {
            100.0 * self.leaves as f64 / self.space_size
        } else {
            0.0
        }
    }
    /// Percentage of the leaves which were created below a dummy
    pub fn dummy_fill(&self) -> f64 {
        if self.leaves > 0 {
            100.0 * self.dummy_leaves as f64 / self.leaves as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod test_stats {
    use crate::TreeStats;

    #[test]
    fn fill_percentages_are_zero_on_an_empty_tree() {
        let stats = TreeStats::default();
        assert_eq!(0.0, stats.tree_fill());
        assert_eq!(0.0, stats.dummy_fill());
    }
    #[test]
    fn fill_percentages_are_relative_to_space_and_leaves() {
        let stats = TreeStats { leaves: 4, dummy_leaves: 1, space_size: 8.0, ..TreeStats::default() };
        assert_eq!(50.0, stats.tree_fill());
        assert_eq!(25.0, stats.dummy_fill());
    }
}

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

//! This module provides the invariant checker of the goods trees. It is only
//! compiled for the tests and never called from production code.

use crate::{Branch, InnerNode, InnerNodeTree, Node, Utility, Value};

impl <V: Value, U: Utility> InnerNodeTree<V, U> {
    /// Brings the bounds up to date, then panics if any invariant checked by
    /// `check_caches` is violated or if the bound of the root is not exactly
    /// the best bound of a live leaf.
    pub fn check_tree(&mut self) {
        self.refresh();
        self.check_caches();
        if self.root.alive {
            let best = self.best_live_bound(&self.root);
            assert_eq!(best, self.root.ub, "the root bound is not the best leaf bound");
        }
    }

    /// Panics if any invariant of the tree is violated. The caches are taken
    /// as they are, nothing gets refreshed first:
    /// * every node has one slot per value (plus a dummy one when needed);
    /// * the dummy tags match the slots the nodes sit in;
    /// * the utilities of each leaf match what the children reported;
    /// * no leaf caches a bound tighter than the one the children allow;
    /// * a confirmed leaf is bounded by its own utility;
    /// * each inner node caches its best child and the best of its children
    ///   bounds;
    /// * the coverage counters match a recount.
    pub fn check_caches(&self) {
        let mut path = vec![];
        self.check_node(&self.root, 0, &mut path);
        if !self.coverage_dirty && self.required.is_some() && !self.solutions.is_empty() {
            let mut cover = vec![0; self.solutions.len()];
            let mut path = vec![];
            self.count_coverage(&self.root, 0, &mut path, &mut cover);
            assert_eq!(cover, self.cover, "stale coverage counters");
        }
    }

    fn check_node(&self, node: &InnerNode<U>, depth: usize, path: &mut Vec<usize>) {
        let var = self.registry.at_depth(depth);
        let nb_children = self.children.len();
        assert_eq!(var.branching(), node.children.len(), "wrong branching on {} at depth {}", var.name, depth);

        for (slot, child) in node.children.iter().enumerate() {
            let child = match child {
                Some(child) => child,
                None => continue,
            };
            let expected = if var.is_dummy_slot(slot) { Branch::Dummy } else { Branch::Real };
            assert_eq!(expected, child.branch(), "wrong tag for slot {} of {}", slot, var.name);

            path.push(slot);
            match child.as_ref() {
                Node::Leaf(leaf) => {
                    assert_eq!(self.last_depth(), depth, "leaf above the last depth");
                    assert_eq!(0, leaf.confirmed.0 & !leaf.reported.0, "confirmed but never reported at {:?}", path);
                    assert_eq!(leaf.sum_of(leaf.reported), leaf.util, "stale leaf utility at {:?}", path);
                    assert_eq!(leaf.sum_of(leaf.confirmed), leaf.confirmed_util, "stale confirmed utility at {:?}", path);

                    let actual = self.leaf_ub(leaf);
                    assert!(!self.objective.better(actual, leaf.ub), "leaf bound too tight at {:?}", path);
                    assert_eq!(self.objective.is_infeasible(actual), self.objective.is_infeasible(leaf.ub),
                        "infeasibility not propagated at {:?}", path);
                    if leaf.is_confirmed(nb_children) {
                        assert_eq!(leaf.util, actual, "confirmed leaf not bounded by its utility at {:?}", path);
                    }
                },
                Node::Inner(inner) => {
                    assert!(depth < self.last_depth(), "inner node at the last depth");
                    self.check_node(inner, depth + 1, path);
                },
            }
            path.pop();
        }

        let mut copy = node.clone();
        copy.recompute(self.objective, nb_children);
        assert_eq!(copy.alive, node.alive, "stale liveness at {:?}", path);
        assert_eq!(copy.util, node.util, "stale utility at {:?}", path);
        assert_eq!(copy.max_util, node.max_util, "stale best child at {:?}", path);
        assert_eq!(copy.ub, node.ub, "stale upper bound at {:?}", path);
        if let Some(best) = node.max_ub {
            let held = node.children[best].as_ref().and_then(|c| c.bounds(self.objective, nb_children).1);
            assert_eq!(node.ub, held, "the best bound child does not hold the bound at {:?}", path);
        }
    }

    /// The best actual bound of a leaf below a live node
    fn best_live_bound(&self, node: &InnerNode<U>) -> Option<U> {
        if !node.alive {
            return None;
        }
        node.children.iter().flatten().fold(None, |best, child| {
            let ub = match child.as_ref() {
                Node::Leaf(leaf) => Some(self.leaf_ub(leaf)),
                Node::Inner(inner) => self.best_live_bound(inner),
            };
            self.objective.best_of_opt(best, ub)
        })
    }
}

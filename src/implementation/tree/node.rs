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

//! This module defines the nodes of a goods tree. Each inner node branches on
//! the variable found at its depth; the children of the nodes branching on
//! the owner's own variable are the leaves.

use crate::{Objective, Utility};

/// Tells whether a node sits in the slot of a known value or in the dummy
/// slot standing for the values that have not been seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Real,
    Dummy,
}

/// A set of children (given by their index) packed in a bit mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildSet(pub usize);
impl ChildSet {
    #[inline]
    pub fn contains(self, child: usize) -> bool {
        self.0 & (1 << child) != 0
    }
    #[inline]
    pub fn insert(&mut self, child: usize) {
        self.0 |= 1 << child;
    }
    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
    /// True iff all of the `nb_children` children belong to the set
    #[inline]
    pub fn is_full(self, nb_children: usize) -> bool {
        self.0 == (1 << nb_children) - 1
    }
    /// The mask of the children missing from the set
    #[inline]
    pub fn missing(self, nb_children: usize) -> usize {
        !self.0 & ((1 << nb_children) - 1)
    }
}

/// A leaf stands for one complete assignment of the separator and of the
/// owner's own variable. It keeps the latest utility each child reported for
/// the assignment.
#[derive(Debug, Clone)]
pub struct LeafNode<U> {
    pub branch: Branch,
    /// The utility of the assignment in the owner's local problem
    pub local: U,
    /// The latest utility reported by each child (meaningless for the
    /// children missing from `reported`)
    pub goods: Vec<U>,
    /// Local utility plus the utility reported by every child in `reported`
    pub util: U,
    /// Local utility plus the utility reported by every child in `confirmed`
    pub confirmed_util: U,
    /// The children that reported some utility for this assignment
    pub reported: ChildSet,
    /// The children that confirmed their utility for this assignment
    pub confirmed: ChildSet,
    /// The best utility this assignment may still reach. This cached value
    /// may be looser than the bound the children currently allow, never
    /// tighter.
    pub ub: U,
}
impl <U: Utility> LeafNode<U> {
    pub fn new(branch: Branch, local: U, nb_children: usize) -> Self {
        LeafNode {
            branch,
            local,
            goods: vec![U::zero(); nb_children],
            util: local,
            confirmed_util: local,
            reported: ChildSet::default(),
            confirmed: ChildSet::default(),
            ub: local,
        }
    }
    /// Records the utility `child` reported for this assignment. A
    /// speculative utility never overrides a confirmed one. Returns true iff
    /// the leaf changed.
    pub fn report(&mut self, child: usize, utility: U, confirmed: bool) -> bool {
        if !confirmed && self.confirmed.contains(child) {
            return false;
        }
        let known = self.reported.contains(child) && self.confirmed.contains(child) == confirmed;
        if known && self.goods[child] == utility {
            return false;
        }
        self.goods[child] = utility;
        self.reported.insert(child);
        if confirmed {
            self.confirmed.insert(child);
        }
        self.util = self.sum_of(self.reported);
        self.confirmed_util = self.sum_of(self.confirmed);
        true
    }
    /// The local utility plus the goods of the given children
    pub fn sum_of(&self, children: ChildSet) -> U {
        self.goods.iter().enumerate()
            .filter(|(c, _)| children.contains(*c))
            .fold(self.local, |acc, (_, u)| acc.add(*u))
    }
    /// True iff every child reported some utility for this leaf
    pub fn is_complete(&self, nb_children: usize) -> bool {
        self.reported.is_full(nb_children)
    }
    /// True iff every child confirmed its utility for this leaf
    pub fn is_confirmed(&self, nb_children: usize) -> bool {
        self.confirmed.is_full(nb_children)
    }
    /// The utility of this leaf when it is fully known. An assignment whose
    /// upper bound is infeasible is known to be infeasible.
    pub fn value(&self, objective: Objective, nb_children: usize) -> Option<U> {
        if objective.is_infeasible(self.ub) {
            Some(self.ub)
        } else if self.is_complete(nb_children) {
            Some(self.util)
        } else {
            None
        }
    }
}

/// An inner node caches the index and utility of its best child (along the
/// real branches only) and of its child having the best upper bound (dummy
/// branches included).
#[derive(Debug, Clone)]
pub struct InnerNode<U> {
    pub branch: Branch,
    pub children: Vec<Option<Box<Node<U>>>>,
    /// A killed node never comes back to life
    pub killed: bool,
    pub alive: bool,
    pub max_util: Option<usize>,
    pub util: Option<U>,
    pub max_ub: Option<usize>,
    pub ub: Option<U>,
}
impl <U: Utility> InnerNode<U> {
    pub fn new(branch: Branch, branching: usize) -> Self {
        InnerNode {
            branch,
            children: vec![None; branching],
            killed: false,
            alive: branching > 0,
            max_util: None,
            util: None,
            max_ub: None,
            ub: None,
        }
    }
    /// Number of children actually present
    pub fn nb_present(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }

    /// Recomputes the cached best children of this node from the caches of
    /// its children. Ties are broken in favor of the lowest index.
    pub fn recompute(&mut self, objective: Objective, nb_children: usize) {
        self.max_util = None;
        self.util = None;
        self.max_ub = None;
        self.ub = None;
        let mut alive = false;
        for (i, child) in self.children.iter().enumerate() {
            let child = match child {
                None => { alive = true; continue; }
                Some(child) => child,
            };
            if !child.is_alive() {
                continue;
            }
            alive = true;
            let (util, ub) = child.bounds(objective, nb_children);
            if let Some(ub) = ub {
                if self.ub.map_or(true, |best| objective.better(ub, best)) {
                    self.ub = Some(ub);
                    self.max_ub = Some(i);
                }
            }
            if child.branch() == Branch::Real {
                if let Some(util) = util {
                    if self.util.map_or(true, |best| objective.better(util, best)) {
                        self.util = Some(util);
                        self.max_util = Some(i);
                    }
                }
            }
        }
        self.alive = !self.killed && alive;
    }
}

/// Nodes are either inner nodes or leaves
#[derive(Debug, Clone)]
pub enum Node<U> {
    Inner(InnerNode<U>),
    Leaf(LeafNode<U>),
}
impl <U: Utility> Node<U> {
    pub fn branch(&self) -> Branch {
        match self {
            Node::Inner(n) => n.branch,
            Node::Leaf(l) => l.branch,
        }
    }
    pub fn set_branch(&mut self, branch: Branch) {
        match self {
            Node::Inner(n) => n.branch = branch,
            Node::Leaf(l) => l.branch = branch,
        }
    }
    /// Leaves never die on their own, only their parent node does
    pub fn is_alive(&self) -> bool {
        match self {
            Node::Inner(n) => n.alive,
            Node::Leaf(_) => true,
        }
    }
    /// The (utility, upper bound) pair this node contributes to its parent
    pub fn bounds(&self, objective: Objective, nb_children: usize) -> (Option<U>, Option<U>) {
        match self {
            Node::Inner(n) => (n.util, n.ub),
            Node::Leaf(l) => (l.value(objective, nb_children), Some(l.ub)),
        }
    }
    pub fn as_inner(&self) -> Option<&InnerNode<U>> {
        match self {
            Node::Inner(n) => Some(n),
            Node::Leaf(_) => None,
        }
    }
    pub fn as_inner_mut(&mut self) -> Option<&mut InnerNode<U>> {
        match self {
            Node::Inner(n) => Some(n),
            Node::Leaf(_) => None,
        }
    }
    pub fn as_leaf(&self) -> Option<&LeafNode<U>> {
        match self {
            Node::Inner(_) => None,
            Node::Leaf(l) => Some(l),
        }
    }
    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode<U>> {
        match self {
            Node::Inner(_) => None,
            Node::Leaf(l) => Some(l),
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

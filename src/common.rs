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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client code is likely to work with.

use std::cmp::Ordering;

use fxhash::FxHashMap;

use crate::Utility;

/// A (partial) assignment of values to variables, keyed by variable name.
pub type Context<V> = FxHashMap<String, V>;
/// The complete domains of some variables, keyed by variable name.
pub type Domains<V> = FxHashMap<String, Vec<V>>;

// ----------------------------------------------------------------------------
// --- GOOD -------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A good is the unit of information exchanged during UTIL propagation: a
/// partial assignment to some separator variables together with the utility
/// the sender's subtree can reach under that assignment.
///
/// A good is either *confirmed* (its utility is the true optimum of the
/// sender's subtree for that assignment) or *speculative* (a current best
/// guess which a later good may revise).
#[derive(Debug, Clone)]
pub struct Good<V, U> {
    /// The variables being assigned, in reporting order
    pub variables: Vec<String>,
    /// The values of these variables (parallel to `variables`)
    pub values: Vec<V>,
    /// The utility reachable under this assignment
    pub utility: U,
    /// Is this utility final ?
    pub confirmed: bool,
}
impl <V, U> Good<V, U> {
    /// Creates a new confirmed good
    pub fn new(variables: Vec<String>, values: Vec<V>, utility: U) -> Self {
        Self::with_status(variables, values, utility, true)
    }
    /// Creates a new speculative good
    pub fn speculative(variables: Vec<String>, values: Vec<V>, utility: U) -> Self {
        Self::with_status(variables, values, utility, false)
    }
    /// Creates a new good whose confirmation status is given explicitly
    pub fn with_status(variables: Vec<String>, values: Vec<V>, utility: U, confirmed: bool) -> Self {
        assert_eq!(variables.len(), values.len(), "a good needs one value per variable");
        Good { variables, values, utility, confirmed }
    }
    /// Returns the value this good assigns to `variable` (if any)
    pub fn value_of(&self, variable: &str) -> Option<&V> {
        self.variables.iter().position(|v| v == variable).map(|i| &self.values[i])
    }
}
/// Two goods are equal when they carry the same utility, the same status and
/// the same values in position order. Variable names are deliberately left
/// out: goods travelling on a link all use the link's agreed variable order.
impl <V: PartialEq, U: PartialEq> PartialEq for Good<V, U> {
    fn eq(&self, other: &Self) -> bool {
        self.utility == other.utility
            && self.confirmed == other.confirmed
            && self.values == other.values
    }
}

// ----------------------------------------------------------------------------
// --- OBJECTIVE --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The direction of the optimization. All utility comparisons performed by
/// the trees and the protocols go through this object, which is also the
/// owner of the infeasibility sentinel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Objective {
    maximize: bool
}
impl Objective {
    /// An objective to maximize
    pub const MAXIMIZE: Objective = Objective { maximize: true };
    /// An objective to minimize
    pub const MINIMIZE: Objective = Objective { maximize: false };

    pub fn new(maximize: bool) -> Self {
        Objective { maximize }
    }
    #[inline]
    pub fn is_maximize(self) -> bool {
        self.maximize
    }
    /// The utility standing for 'infeasible': minus infinity when maximizing,
    /// plus infinity when minimizing.
    #[inline]
    pub fn infeasible<U: Utility>(self) -> U {
        if self.maximize { U::minus_infinity() } else { U::plus_infinity() }
    }
    /// The best utility one can imagine (used for never-bounded quantities)
    #[inline]
    pub fn unbounded<U: Utility>(self) -> U {
        if self.maximize { U::plus_infinity() } else { U::minus_infinity() }
    }
    /// Value based check for the infeasibility sentinel
    #[inline]
    pub fn is_infeasible<U: Utility>(self, u: U) -> bool {
        u == self.infeasible::<U>()
    }
    /// True iff `a` is strictly better than `b`
    #[inline]
    pub fn better<U: Utility>(self, a: U, b: U) -> bool {
        if self.maximize { a > b } else { a < b }
    }
    /// True iff `a` is at least as good as `b`
    #[inline]
    pub fn better_or_equal<U: Utility>(self, a: U, b: U) -> bool {
        !self.better(b, a)
    }
    /// Returns the better of two utilities (the first one on ties)
    #[inline]
    pub fn best_of<U: Utility>(self, a: U, b: U) -> U {
        if self.better(b, a) { b } else { a }
    }
    /// Same as best_of, but either side may be missing
    #[inline]
    pub fn best_of_opt<U: Utility>(self, a: Option<U>, b: Option<U>) -> Option<U> {
        match (a, b) {
            (Some(a), Some(b)) => Some(self.best_of(a, b)),
            (x, None) => x,
            (None, y) => y,
        }
    }
    /// Orders two utilities so that the better one is the greatest
    #[inline]
    pub fn compare<U: Utility>(self, a: U, b: U) -> Ordering {
        if self.better(a, b) {
            Ordering::Greater
        } else if self.better(b, a) {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}
impl Default for Objective {
    fn default() -> Self {
        Self::MAXIMIZE
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_good {
    use crate::Good;

    #[test]
    fn goods_with_same_values_utility_and_status_are_equal() {
        let a = Good::new(vec!["x".to_string()], vec![1], 4);
        let b = Good::new(vec!["y".to_string()], vec![1], 4);
        assert_eq!(a, b);
    }
    #[test]
    fn status_matters_for_equality() {
        let a = Good::new(vec!["x".to_string()], vec![1], 4);
        let b = Good::speculative(vec!["x".to_string()], vec![1], 4);
        assert_ne!(a, b);
    }
    #[test]
    fn utility_matters_for_equality() {
        let a = Good::new(vec!["x".to_string()], vec![1], 4);
        let b = Good::new(vec!["x".to_string()], vec![1], 5);
        assert_ne!(a, b);
    }
    #[test]
    fn value_of_finds_the_value_by_name() {
        let a = Good::new(vec!["x".to_string(), "y".to_string()], vec![1, 2], 4);
        assert_eq!(Some(&2), a.value_of("y"));
        assert_eq!(None, a.value_of("z"));
    }
    #[test]
    #[should_panic]
    fn a_good_needs_one_value_per_variable() {
        let _ = Good::new(vec!["x".to_string()], vec![1, 2], 4);
    }
}

#[cfg(test)]
mod test_objective {
    use crate::Objective;

    #[test]
    fn infeasible_is_minus_infinity_when_maximizing() {
        assert_eq!(i64::MIN, Objective::MAXIMIZE.infeasible::<i64>());
        assert!(Objective::MAXIMIZE.is_infeasible(i64::MIN));
        assert!(!Objective::MAXIMIZE.is_infeasible(i64::MAX));
    }
    #[test]
    fn infeasible_is_plus_infinity_when_minimizing() {
        assert_eq!(i64::MAX, Objective::MINIMIZE.infeasible::<i64>());
        assert!(Objective::MINIMIZE.is_infeasible(i64::MAX));
    }
    #[test]
    fn better_follows_the_direction() {
        assert!(Objective::MAXIMIZE.better(5, 3));
        assert!(Objective::MINIMIZE.better(3, 5));
        assert!(!Objective::MAXIMIZE.better(3, 3));
        assert!(Objective::MAXIMIZE.better_or_equal(3, 3));
    }
    #[test]
    fn best_of_keeps_the_first_one_on_ties() {
        assert_eq!(5, Objective::MAXIMIZE.best_of(5, 3));
        assert_eq!(3, Objective::MINIMIZE.best_of(5, 3));
        assert_eq!(Some(4), Objective::MAXIMIZE.best_of_opt(None, Some(4)));
        assert_eq!(None, Objective::MAXIMIZE.best_of_opt::<i32>(None, None));
    }
}

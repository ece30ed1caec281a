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

//! This module defines the two value types every goods tree is generic over:
//! the domain values assigned to variables and the utilities aggregated along
//! the pseudo-tree.

use std::fmt::Debug;
use std::hash::Hash;

/// Anything that can be assigned to a variable. Domain values are compared
/// for equality and hashed (the trees index them), never ordered.
pub trait Value: Clone + Eq + Hash + Debug + 'static {}
impl <T> Value for T where T: Clone + Eq + Hash + Debug + 'static {}

/// A utility is the quantity being optimized. It must support addition and
/// subtraction and must provide the two infinities which are used as
/// infeasibility sentinels (minus infinity when maximizing and plus infinity
/// when minimizing).
///
/// # Note
/// Infinities are absorbing: whenever one of the operands of `add` or `sub`
/// is infinite, the result is that infinite operand (the left one wins when
/// both are). This is what makes the infeasible sentinel propagate through
/// bound computations without any special casing.
pub trait Utility: Copy + PartialEq + PartialOrd + Debug + 'static {
    /// The neutral element of the addition
    fn zero() -> Self;
    /// A value strictly larger than any finite utility
    fn plus_infinity() -> Self;
    /// A value strictly smaller than any finite utility
    fn minus_infinity() -> Self;
    /// Adds two utilities together
    fn add(self, rhs: Self) -> Self;
    /// Subtracts `rhs` from `self`
    fn sub(self, rhs: Self) -> Self;

    /// Returns true iff this utility is one of the two infinities
    #[inline]
    fn is_infinite(self) -> bool {
        self == Self::plus_infinity() || self == Self::minus_infinity()
    }
}

macro_rules! integer_utility {
    ($($t:ty),*) => {
        $(
        impl Utility for $t {
            #[inline]
            fn zero() -> Self { 0 }
            #[inline]
            fn plus_infinity() -> Self { <$t>::MAX }
            #[inline]
            fn minus_infinity() -> Self { <$t>::MIN }
            #[inline]
            fn add(self, rhs: Self) -> Self {
                if self.is_infinite() {
                    self
                } else if rhs.is_infinite() {
                    rhs
                } else {
                    // finite results never collide with the sentinels
                    self.saturating_add(rhs).clamp(<$t>::MIN + 1, <$t>::MAX - 1)
                }
            }
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                if self.is_infinite() {
                    self
                } else if rhs == <$t>::MAX {
                    <$t>::MIN
                } else if rhs == <$t>::MIN {
                    <$t>::MAX
                } else {
                    self.saturating_sub(rhs).clamp(<$t>::MIN + 1, <$t>::MAX - 1)
                }
            }
        }
        )*
    };
}
integer_utility!(i32, i64, isize);

impl Utility for f64 {
    #[inline]
    fn zero() -> Self { 0.0 }
    #[inline]
    fn plus_infinity() -> Self { f64::INFINITY }
    #[inline]
    fn minus_infinity() -> Self { f64::NEG_INFINITY }
    #[inline]
    fn add(self, rhs: Self) -> Self {
        if self.is_infinite() { self } else { self + rhs }
    }
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        if self.is_infinite() { self } else { self - rhs }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

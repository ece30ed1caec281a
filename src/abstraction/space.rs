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

//! This module defines the contract of a local constraint: a utility function
//! over a handful of variables, each of which comes with its (finite) domain.

use crate::{Utility, Value};

/// A utility space is the local view a variable has on one of the constraints
/// it owns. The topology provider hands one or more of these to every
/// variable; the variable joins them into its local problem.
pub trait UtilitySpace<V: Value, U: Utility> {
    /// The variables this space bears on, in the order expected by `utility`
    fn variables(&self) -> &[String];
    /// The domain of `variable` if that variable belongs to this space
    fn domain(&self, variable: &str) -> Option<&[V]>;
    /// The utility of the given assignment. The values are given in the
    /// order of `variables()`.
    fn utility(&self, values: &[V]) -> U;
}

#[cfg(test)]
mod tests {
    use crate::UtilitySpace;

    struct Unary(Vec<String>, Vec<i32>);
    impl UtilitySpace<i32, i32> for Unary {
        fn variables(&self) -> &[String] {
            &self.0
        }
        fn domain(&self, variable: &str) -> Option<&[i32]> {
            if variable == self.0[0] { Some(&self.1) } else { None }
        }
        fn utility(&self, values: &[i32]) -> i32 {
            values[0] * 2
        }
    }

    #[test]
    fn a_space_can_be_used_as_a_trait_object() {
        let space: Box<dyn UtilitySpace<i32, i32>> = Box::new(Unary(vec!["x".to_string()], vec![0, 1]));
        assert_eq!(&["x".to_string()], space.variables());
        assert_eq!(Some(&[0, 1][..]), space.domain("x"));
        assert_eq!(None, space.domain("y"));
        assert_eq!(2, space.utility(&[1]));
    }
}

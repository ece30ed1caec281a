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

//! This module provides the tabular implementation of a utility space.

use fxhash::FxHashMap;

use crate::{Error, Result, Utility, UtilitySpace, Value};

/// A hypercube is a utility space given in extension: one utility for each
/// assignment of its variables. The table is laid out in row major order,
/// the value of the last variable changing the fastest.
#[derive(Debug, Clone)]
pub struct Hypercube<V: Value, U: Utility> {
    variables: Vec<String>,
    domains: Vec<Vec<V>>,
    /// For each variable, the position of each value in its domain
    index: Vec<FxHashMap<V, usize>>,
    utilities: Vec<U>,
}

impl <V: Value, U: Utility> Hypercube<V, U> {
    /// Creates a hypercube from its table of utilities
    pub fn new(variables: Vec<String>, domains: Vec<Vec<V>>, utilities: Vec<U>) -> Result<Self> {
        assert_eq!(variables.len(), domains.len(), "a hypercube needs one domain per variable");
        if let Some(i) = domains.iter().position(|d| d.is_empty()) {
            return Err(Error::EmptyDomain(variables[i].clone()));
        }
        let expected = domains.iter().map(|d| d.len()).product::<usize>();
        if expected != utilities.len() {
            return Err(Error::InvalidTable { variables, expected, actual: utilities.len() });
        }
        let index = domains.iter()
            .map(|d| d.iter().cloned().enumerate().map(|(i, v)| (v, i)).collect())
            .collect();
        Ok(Hypercube { variables, domains, index, utilities })
    }
    /// Creates a hypercube by evaluating `f` on every assignment
    pub fn from_fn<F>(variables: Vec<String>, domains: Vec<Vec<V>>, f: F) -> Result<Self>
        where F: Fn(&[V]) -> U
    {
        let mut utilities = vec![];
        if domains.iter().all(|d| !d.is_empty()) {
            let mut idx = vec![0; domains.len()];
            let mut values = domains.iter().map(|d| d[0].clone()).collect::<Vec<_>>();
            loop {
                utilities.push(f(&values));
                // odometer increment, last position first
                let mut pos = domains.len();
                loop {
                    if pos == 0 {
                        return Self::new(variables, domains, utilities);
                    }
                    pos -= 1;
                    idx[pos] += 1;
                    if idx[pos] < domains[pos].len() {
                        values[pos] = domains[pos][idx[pos]].clone();
                        break;
                    }
                    idx[pos] = 0;
                    values[pos] = domains[pos][0].clone();
                }
            }
        }
        Self::new(variables, domains, utilities)
    }
    /// The number of entries in the table
    pub fn size(&self) -> usize {
        self.utilities.len()
    }
}

impl <V: Value, U: Utility> UtilitySpace<V, U> for Hypercube<V, U> {
    fn variables(&self) -> &[String] {
        &self.variables
    }
    fn domain(&self, variable: &str) -> Option<&[V]> {
        self.variables.iter().position(|v| v == variable).map(|i| self.domains[i].as_slice())
    }
    fn utility(&self, values: &[V]) -> U {
        assert_eq!(self.variables.len(), values.len(), "expected one value per variable");
        let mut offset = 0;
        for (i, value) in values.iter().enumerate() {
            let pos = match self.index[i].get(value) {
                Some(pos) => *pos,
                None => panic!("{:?} is not in the domain of {}", value, self.variables[i]),
            };
            offset = offset * self.domains[i].len() + pos;
        }
        self.utilities[offset]
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_hypercube {
    use crate::{Error, Hypercube, UtilitySpace};

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn the_last_variable_changes_the_fastest() {
        let cube = Hypercube::new(names(&["x", "y"]), vec![vec![0, 1], vec![0, 1, 2]], vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(1, cube.utility(&[0, 0]));
        assert_eq!(3, cube.utility(&[0, 2]));
        assert_eq!(4, cube.utility(&[1, 0]));
        assert_eq!(6, cube.utility(&[1, 2]));
        assert_eq!(6, cube.size());
    }
    #[test]
    fn from_fn_evaluates_every_assignment() {
        let cube = Hypercube::from_fn(names(&["x", "y"]), vec![vec![1, 2], vec![10, 20]], |v: &[i32]| v[0] * v[1]).unwrap();
        assert_eq!(4, cube.size());
        assert_eq!(10, cube.utility(&[1, 10]));
        assert_eq!(40, cube.utility(&[2, 20]));
        assert_eq!(20, cube.utility(&[2, 10]));
    }
    #[test]
    fn domains_are_found_by_name() {
        let cube = Hypercube::new(names(&["x"]), vec![vec![3, 4]], vec![0, 0]).unwrap();
        assert_eq!(Some(&[3, 4][..]), cube.domain("x"));
        assert_eq!(None, cube.domain("y"));
    }
    #[test]
    fn a_table_of_the_wrong_size_is_rejected() {
        let err = Hypercube::new(names(&["x"]), vec![vec![3, 4]], vec![0]).unwrap_err();
        assert_eq!(Error::InvalidTable { variables: names(&["x"]), expected: 2, actual: 1 }, err);
    }
    #[test]
    fn an_empty_domain_is_rejected() {
        let err = Hypercube::<i32, i32>::new(names(&["x"]), vec![vec![]], vec![]).unwrap_err();
        assert_eq!(Error::EmptyDomain("x".to_string()), err);
    }
    #[test]
    #[should_panic]
    fn a_value_out_of_the_domain_is_a_programming_error() {
        let cube = Hypercube::new(names(&["x"]), vec![vec![3, 4]], vec![0, 0]).unwrap();
        cube.utility(&[5]);
    }
}

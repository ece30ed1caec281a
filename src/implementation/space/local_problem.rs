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

//! This module provides the local problem of a variable: the join of all the
//! utility spaces that variable owns, together with its own domain.

use std::cmp::Ordering;

use binary_heap_plus::BinaryHeap;
use compare::Compare;

use crate::{Error, Objective, Result, Utility, UtilitySpace, Value};

/// One assignment of the variables of a local problem, given as the index of
/// each value in its domain, along with its utility.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSolution<U> {
    pub index: Vec<usize>,
    pub utility: U,
}

/// Orders the local solutions so that the best one is the greatest. Ties are
/// broken in favor of the lexicographically smallest index.
#[derive(Debug, Clone, Copy)]
pub struct LocalSolutionOrder(Objective);
impl <U: Utility> Compare<LocalSolution<U>> for LocalSolutionOrder {
    fn compare(&self, l: &LocalSolution<U>, r: &LocalSolution<U>) -> Ordering {
        self.0.compare(l.utility, r.utility)
            .then_with(|| r.index.cmp(&l.index))
    }
}

/// The local problem of a variable. Its variables are the separator
/// variables appearing in the owned spaces (in order of appearance) followed
/// by the owner's own variable, which always comes last.
pub struct LocalProblem<V: Value, U: Utility> {
    objective: Objective,
    variables: Vec<String>,
    domains: Vec<Vec<V>>,
    spaces: Vec<Box<dyn UtilitySpace<V, U>>>,
    /// For each space, the position of each of its variables in `variables`
    positions: Vec<Vec<usize>>,
}

impl <V: Value, U: Utility> LocalProblem<V, U> {
    pub fn new(
        objective: Objective,
        own_variable: &str,
        own_domain: Vec<V>,
        spaces: Vec<Box<dyn UtilitySpace<V, U>>>,
    ) -> Result<Self> {
        if own_domain.is_empty() {
            return Err(Error::EmptyDomain(own_variable.to_string()));
        }
        let mut variables: Vec<String> = vec![];
        let mut domains = vec![];
        for space in spaces.iter() {
            for var in space.variables() {
                if var == own_variable || variables.contains(var) {
                    continue;
                }
                let domain = space.domain(var)
                    .ok_or_else(|| Error::MissingDomain { owner: own_variable.to_string(), variable: var.clone() })?;
                if domain.is_empty() {
                    return Err(Error::EmptyDomain(var.clone()));
                }
                variables.push(var.clone());
                domains.push(domain.to_vec());
            }
        }
        variables.push(own_variable.to_string());
        domains.push(own_domain);

        let positions = spaces.iter()
            .map(|s| s.variables().iter()
                .map(|v| variables.iter().position(|x| x == v).unwrap_or(variables.len() - 1))
                .collect())
            .collect();

        Ok(LocalProblem { objective, variables, domains, spaces, positions })
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }
    /// All the variables of the problem (own variable last)
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
    /// The separator variables appearing in the local problem
    pub fn separator(&self) -> &[String] {
        &self.variables[..self.variables.len() - 1]
    }
    pub fn own_variable(&self) -> &str {
        &self.variables[self.variables.len() - 1]
    }
    pub fn own_domain(&self) -> &[V] {
        &self.domains[self.domains.len() - 1]
    }
    pub fn domains(&self) -> &[Vec<V>] {
        &self.domains
    }
    pub fn domain_of(&self, variable: &str) -> Option<&[V]> {
        self.variables.iter().position(|v| v == variable).map(|i| self.domains[i].as_slice())
    }
    /// True iff none of the owned spaces constrains anything
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
    /// The number of assignments of the local problem
    pub fn size(&self) -> usize {
        self.domains.iter().map(|d| d.len()).product()
    }

    /// Sums the utility of all spaces for the assignment given as the index
    /// of each value (in the order of `variables()`)
    pub fn utility_by_index(&self, index: &[usize]) -> U {
        debug_assert_eq!(self.variables.len(), index.len());
        let mut total = U::zero();
        let mut values = vec![];
        for (space, pos) in self.spaces.iter().zip(self.positions.iter()) {
            values.clear();
            values.extend(pos.iter().map(|p| self.domains[*p][index[*p]].clone()));
            total = total.add(space.utility(&values));
        }
        total
    }

    /// Enumerates all feasible solutions of the local problem, best first
    pub fn solutions(&self) -> Vec<LocalSolution<U>> {
        let mut all = vec![];
        let mut index = vec![0; self.variables.len()];
        loop {
            let utility = self.utility_by_index(&index);
            if !self.objective.is_infeasible(utility) {
                all.push(LocalSolution { index: index.clone(), utility });
            }
            if !self.next_index(&mut index) {
                break;
            }
        }
        // the sorted vec is ascending: the reversed order puts the best first
        let order = Compare::<LocalSolution<U>>::rev(LocalSolutionOrder(self.objective));
        BinaryHeap::from_vec_cmp(all, order).into_sorted_vec()
    }

    /// Odometer step over the local assignment space. Returns false once
    /// every assignment has been visited.
    pub fn next_index(&self, index: &mut [usize]) -> bool {
        let mut pos = index.len();
        while pos > 0 {
            pos -= 1;
            index[pos] += 1;
            if index[pos] < self.domains[pos].len() {
                return true;
            }
            index[pos] = 0;
        }
        false
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

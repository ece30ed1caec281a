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

//! This module provides the goods tree of a variable without children. Such a
//! variable knows everything from the start: its goods are simply the
//! solutions of its local problem, best first, one per separator assignment.

use fxhash::FxHashSet;

use crate::{Context, Domains, Good, GoodsTree, LocalProblem, LocalSolution, Objective, TreeStats, Utility, Value};

/// The goods tree of a leaf of the pseudo-tree
pub struct LeafNodeTree<V: Value, U: Utility> {
    objective: Objective,
    problem: LocalProblem<V, U>,
    /// The feasible local solutions, best first
    solutions: Vec<LocalSolution<U>>,
    /// Position of the next solution to consider
    cursor: usize,
    /// The separator assignments already sent
    sent: FxHashSet<Vec<usize>>,
    stats: TreeStats,
}

impl <V: Value, U: Utility> LeafNodeTree<V, U> {
    pub fn new(problem: LocalProblem<V, U>) -> Self {
        let solutions = problem.solutions();
        LeafNodeTree {
            objective: problem.objective(),
            problem,
            solutions,
            cursor: 0,
            sent: FxHashSet::default(),
            stats: TreeStats::default(),
        }
    }
    /// The separator part of a local solution
    fn separator_key(solution: &LocalSolution<U>) -> Vec<usize> {
        solution.index[..solution.index.len() - 1].to_vec()
    }
    /// Position of the best solution whose separator part was not sent yet
    fn next(&self) -> Option<usize> {
        (self.cursor..self.solutions.len())
            .find(|i| !self.sent.contains(&Self::separator_key(&self.solutions[*i])))
    }
    fn good_of(&self, solution: &LocalSolution<U>) -> Good<V, U> {
        let separator = self.problem.separator();
        let values = separator.iter().enumerate()
            .map(|(i, _)| self.problem.domains()[i][solution.index[i]].clone())
            .collect();
        Good::new(separator.to_vec(), values, solution.utility)
    }
    /// True iff the solution is consistent with the values of the context
    fn is_compatible(&self, solution: &LocalSolution<U>, context: &Context<V>) -> bool {
        self.problem.separator().iter().enumerate().all(|(i, var)| {
            match context.get(var) {
                Some(value) => {
                    let domain = &self.problem.domains()[i];
                    // values outside of the domain are ignored
                    !domain.contains(value) || domain[solution.index[i]] == *value
                },
                None => true,
            }
        })
    }
}

impl <V: Value, U: Utility> GoodsTree<V, U> for LeafNodeTree<V, U> {
    fn own_variable(&self) -> &str {
        self.problem.own_variable()
    }
    fn separator(&self) -> Vec<String> {
        self.problem.separator().to_vec()
    }
    fn add(&mut self, _good: &Good<V, U>, sender: usize, _domains: Option<&Domains<V>>) -> bool {
        panic!("{} has no child number {}", self.own_variable(), sender)
    }
    fn get_amax(&mut self) -> Option<Good<V, U>> {
        let next = self.next()?;
        self.cursor = next;
        Some(self.good_of(&self.solutions[next]))
    }
    /// A good only counts as produced once it is removed, however many times
    /// `get_amax` returned it
    fn remove_amax(&mut self) {
        if let Some(next) = self.next() {
            let key = Self::separator_key(&self.solutions[next]);
            self.sent.insert(key);
            self.cursor = next + 1;
            self.stats.goods_produced += 1;
            self.stats.confirmed_goods += 1;
        }
    }
    fn is_valuation_sufficient(&mut self) -> bool {
        true
    }
    fn has_more(&self) -> bool {
        self.next().is_some()
    }
    fn set_child_done(&mut self, _child: usize) -> bool {
        false
    }
    fn best_assignment_for_own_variable(&self, context: &Context<V>) -> V {
        let own = self.problem.own_domain();
        self.solutions.iter()
            .find(|s| self.is_compatible(s, context))
            .map(|s| own[s.index[s.index.len() - 1]].clone())
            .unwrap_or_else(|| own[0].clone())
    }
    fn best_utility(&mut self) -> Option<U> {
        match self.solutions.first() {
            Some(s) => Some(s.utility),
            None => Some(self.objective.infeasible()),
        }
    }
    fn child_values(&self, _context: &Context<V>, child: usize) -> Context<V> {
        panic!("{} has no child number {}", self.own_variable(), child)
    }
    fn set_children_separator(&mut self, child: usize, _variables: &[String]) {
        panic!("{} has no child number {}", self.own_variable(), child)
    }
    fn child_separator_reporting_order(&self, child: usize) -> Vec<String> {
        panic!("{} has no child number {}", self.own_variable(), child)
    }
    fn domains(&self) -> Vec<Vec<V>> {
        let n = self.problem.separator().len();
        self.problem.domains()[..n].to_vec()
    }
    fn final_domain_sizes(&self) -> Vec<Option<usize>> {
        self.domains().iter().map(|d| Some(d.len())).collect()
    }
    fn set_final_domain_size(&mut self, _variables: &[String], _sizes: &[Option<usize>]) {
        // every domain is complete from the start
    }
    fn take_domain_size_update(&mut self) -> Option<Vec<Option<usize>>> {
        None
    }
    fn not_enough_info(&self) -> bool {
        self.problem.separator().is_empty()
    }
    fn stats(&self) -> TreeStats {
        let mut stats = self.stats.clone();
        stats.space_size = self.problem.size() as f64;
        stats
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_leaf_tree {
    use fxhash::FxHashMap;

    use crate::{GoodsTree, Hypercube, LeafNodeTree, LocalProblem, Objective, UtilitySpace};

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }
    fn space(vars: &[&str], utils: Vec<i32>) -> Box<dyn UtilitySpace<i32, i32>> {
        let domains = vars.iter().map(|_| vec![0, 1]).collect();
        Box::new(Hypercube::new(names(vars), domains, utils).unwrap())
    }

    #[test]
    fn a_singleton_variable_reports_its_best_value() {
        let lp = LocalProblem::new(Objective::MAXIMIZE, "x", vec![0, 1], vec![space(&["x"], vec![3, 5])]).unwrap();
        let mut tree = LeafNodeTree::new(lp);
        let good = tree.get_amax().unwrap();
        assert!(good.variables.is_empty());
        assert_eq!(5, good.utility);
        assert!(good.confirmed);
        assert_eq!(1, tree.best_assignment_for_own_variable(&FxHashMap::default()));
        assert!(tree.not_enough_info());
    }
    #[test]
    fn goods_come_best_first_once_per_separator_assignment() {
        // f(y, x)
        let lp = LocalProblem::new(Objective::MAXIMIZE, "x", vec![0, 1], vec![space(&["y", "x"], vec![1, 4, 3, 2])]).unwrap();
        let mut tree = LeafNodeTree::new(lp);
        assert_eq!(names(&["y"]), tree.separator());

        let first = tree.get_amax().unwrap();
        assert_eq!(vec![0], first.values);
        assert_eq!(4, first.utility);
        // asking again without removing gives the same good
        assert_eq!(first, tree.get_amax().unwrap());
        tree.remove_amax();

        let second = tree.get_amax().unwrap();
        assert_eq!(vec![1], second.values);
        assert_eq!(3, second.utility);
        tree.remove_amax();

        assert!(!tree.has_more());
        assert!(tree.get_amax().is_none());
    }
    #[test]
    fn goods_are_counted_once_removed() {
        let lp = LocalProblem::new(Objective::MAXIMIZE, "x", vec![0, 1], vec![space(&["y", "x"], vec![1, 4, 3, 2])]).unwrap();
        let mut tree = LeafNodeTree::new(lp);
        tree.get_amax();
        tree.get_amax();
        tree.get_amax();
        assert_eq!(0, tree.stats().goods_produced);
        tree.remove_amax();
        tree.get_amax();
        tree.remove_amax();
        // nothing left to remove
        tree.remove_amax();
        let stats = tree.stats();
        assert_eq!(2, stats.goods_produced);
        assert_eq!(2, stats.confirmed_goods);
        assert_eq!(0, stats.speculative_goods);
    }
    #[test]
    fn best_assignment_follows_the_context() {
        let lp = LocalProblem::new(Objective::MAXIMIZE, "x", vec![0, 1], vec![space(&["y", "x"], vec![1, 4, 3, 2])]).unwrap();
        let tree = LeafNodeTree::new(lp);
        let mut ctx = FxHashMap::default();
        ctx.insert("y".to_string(), 1);
        assert_eq!(0, tree.best_assignment_for_own_variable(&ctx));
        ctx.insert("y".to_string(), 0);
        assert_eq!(1, tree.best_assignment_for_own_variable(&ctx));
    }
    #[test]
    fn an_infeasible_local_problem_has_nothing_to_report() {
        let lp = LocalProblem::new(Objective::MAXIMIZE, "x", vec![0, 1], vec![space(&["x"], vec![i32::MIN, i32::MIN])]).unwrap();
        let mut tree = LeafNodeTree::new(lp);
        assert!(!tree.has_more());
        assert!(tree.get_amax().is_none());
        assert_eq!(Some(i32::MIN), tree.best_utility());
        assert_eq!(0, tree.best_assignment_for_own_variable(&FxHashMap::default()));
    }
    #[test]
    fn domains_are_final_from_the_start() {
        let lp = LocalProblem::new(Objective::MAXIMIZE, "x", vec![0, 1], vec![space(&["y", "x"], vec![1, 4, 3, 2])]).unwrap();
        let mut tree = LeafNodeTree::new(lp);
        assert_eq!(vec![vec![0, 1]], tree.domains());
        assert_eq!(vec![Some(2)], tree.final_domain_sizes());
        assert_eq!(None, tree.take_domain_size_update());
    }
}

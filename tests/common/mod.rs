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

//! Small DCOP instances along with a brute force solver to check the
//! protocols against.
#![allow(dead_code)]

use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use odpop::{Context, Hypercube, Objective, Protocol, Result, Simulation, Solution, SolverConfig, Topology, Utility};

pub type Table = Rc<dyn Fn(&[i32]) -> i32>;

/// A constraint of the problem. By convention, the last variable of the
/// scope is the deepest one in the pseudo-tree: it owns the constraint.
pub struct Constraint {
    pub scope: Vec<&'static str>,
    pub table: Table,
}

/// A DCOP along with the pseudo-tree its variables are arranged in
pub struct Dcop {
    pub objective: Objective,
    pub domains: Vec<(&'static str, Vec<i32>)>,
    /// (child, parent) edges of the pseudo-tree
    pub edges: Vec<(&'static str, &'static str)>,
    pub constraints: Vec<Constraint>,
}

/// A soft constraint whose utilities look random (negative ones included)
pub fn soft(seed: i32, scope: Vec<&'static str>) -> Constraint {
    let table: Table = Rc::new(move |values: &[i32]| {
        let mut h = seed;
        for v in values {
            h = (h * 31 + v * 17 + 7) % 23;
        }
        h - 8
    });
    Constraint { scope, table }
}
/// A hard constraint forbidding equal values (the forbidden assignments get
/// the given sentinel) with a small preference for the smallest values
pub fn different(scope: Vec<&'static str>, forbidden: i32) -> Constraint {
    let table: Table = Rc::new(move |values: &[i32]| {
        if values[0] == values[1] { forbidden } else { 3 - values[0] - values[1] }
    });
    Constraint { scope, table }
}

impl Dcop {
    fn domain(&self, var: &str) -> Vec<i32> {
        self.domains.iter().find(|(v, _)| *v == var).map(|(_, d)| d.clone()).unwrap()
    }
    fn parent(&self, var: &str) -> Option<&'static str> {
        self.edges.iter().find(|(c, _)| *c == var).map(|(_, p)| *p)
    }
    fn ancestors(&self, var: &str) -> Vec<&'static str> {
        let mut out = vec![];
        let mut current = self.parent(var);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }
    /// The topology of the given variable
    pub fn topology(&self, var: &'static str) -> Topology<i32, i32> {
        let mut topo = Topology::new(var, self.domain(var));
        let parent = self.parent(var);
        if let Some(p) = parent {
            topo = topo.with_parent(p);
        }
        for (c, _) in self.edges.iter().filter(|(_, p)| *p == var) {
            topo = topo.with_child(c);
        }
        for constraint in self.constraints.iter() {
            let owner = *constraint.scope.last().unwrap();
            if owner == var {
                for v in constraint.scope.iter() {
                    if *v != var && Some(*v) != parent && !topo.pseudo_parents.iter().any(|x| x == v) {
                        assert!(self.ancestors(var).contains(v), "{} is not an ancestor of {}", v, var);
                        topo = topo.with_pseudo_parent(v);
                    }
                }
                let domains = constraint.scope.iter().map(|v| self.domain(v)).collect();
                let names = constraint.scope.iter().map(|v| v.to_string()).collect();
                let table = Rc::clone(&constraint.table);
                let space = Hypercube::from_fn(names, domains, move |values: &[i32]| table(values)).unwrap();
                topo = topo.with_space(Box::new(space));
            } else if constraint.scope.contains(&var)
                && self.parent(owner) != Some(var)
                && !topo.pseudo_children.iter().any(|x| x == owner) {
                topo = topo.with_pseudo_child(owner);
            }
        }
        topo
    }
    /// Solves the problem with the simulator
    pub fn solve(&self, protocol: Protocol, config: SolverConfig) -> Result<Solution<i32, i32>> {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut simulation = Simulation::new(config, protocol);
        for (var, _) in self.domains.iter() {
            simulation.add_variable(self.topology(*var))?;
        }
        simulation.run()
    }
    /// The total utility of a complete assignment
    pub fn evaluate(&self, assignment: &Context<i32>) -> i32 {
        self.constraints.iter().fold(0, |acc, c| {
            let values = c.scope.iter().map(|v| assignment[*v]).collect::<Vec<_>>();
            Utility::add(acc, (c.table)(&values))
        })
    }
    /// The optimal utility, found by enumerating all the assignments
    pub fn brute_force(&self) -> i32 {
        let mut best = self.objective.infeasible::<i32>();
        let mut index = vec![0; self.domains.len()];
        loop {
            let assignment = self.domains.iter().zip(index.iter())
                .map(|((v, d), i)| (v.to_string(), d[*i]))
                .collect::<Context<i32>>();
            best = self.objective.best_of(best, self.evaluate(&assignment));

            let mut pos = self.domains.len();
            loop {
                if pos == 0 {
                    return best;
                }
                pos -= 1;
                index[pos] += 1;
                if index[pos] < self.domains[pos].1.len() {
                    break;
                }
                index[pos] = 0;
            }
        }
    }
    /// Solves the problem and checks the outcome against brute force
    pub fn check(&self, protocol: Protocol, config: SolverConfig) {
        let expected = self.brute_force();
        let solution = self.solve(protocol, config).unwrap();
        assert_eq!(Some(expected), solution.utility());
        assert_eq!(self.domains.len(), solution.assignment.len());
        if !self.objective.is_infeasible(expected) {
            assert_eq!(expected, self.evaluate(&solution.assignment));
        }
    }
}

// ----------------------------------------------------------------------------
// --- INSTANCES --------------------------------------------------------------
// ----------------------------------------------------------------------------

/// x - y - z
pub fn chain(objective: Objective) -> Dcop {
    Dcop {
        objective,
        domains: vec![("x", vec![0, 1, 2]), ("y", vec![0, 1, 2]), ("z", vec![0, 1, 2])],
        edges: vec![("y", "x"), ("z", "y")],
        constraints: vec![
            soft(1, vec!["x"]),
            soft(2, vec!["x", "y"]),
            soft(3, vec!["y", "z"]),
        ],
    }
}

/// r with three children a, b, c
pub fn star() -> Dcop {
    Dcop {
        objective: Objective::MAXIMIZE,
        domains: vec![("r", vec![0, 1, 2]), ("a", vec![0, 1]), ("b", vec![0, 1, 2]), ("c", vec![0, 1])],
        edges: vec![("a", "r"), ("b", "r"), ("c", "r")],
        constraints: vec![
            soft(4, vec!["r", "a"]),
            soft(5, vec!["r", "b"]),
            soft(6, vec!["r", "c"]),
            soft(7, vec!["c"]),
        ],
    }
}

/// x has two branches: y - z (z also constrains x) and w
pub fn with_back_edge() -> Dcop {
    Dcop {
        objective: Objective::MAXIMIZE,
        domains: vec![("x", vec![0, 1, 2]), ("y", vec![0, 1]), ("z", vec![0, 1, 2]), ("w", vec![0, 1])],
        edges: vec![("y", "x"), ("z", "y"), ("w", "x")],
        constraints: vec![
            soft(8, vec!["x", "y"]),
            soft(9, vec!["y", "z"]),
            soft(10, vec!["x", "z"]),
            soft(11, vec!["x", "w"]),
        ],
    }
}

/// x - y - z where y has no constraint with x: y learns x from z
pub fn hidden_separator() -> Dcop {
    Dcop {
        objective: Objective::MAXIMIZE,
        domains: vec![("x", vec![0, 1]), ("y", vec![0, 1]), ("z", vec![0, 1, 2])],
        edges: vec![("y", "x"), ("z", "y")],
        constraints: vec![
            soft(12, vec!["x"]),
            soft(13, vec!["y", "z"]),
            soft(14, vec!["x", "z"]),
        ],
    }
}

/// A graph coloring: the triangle x, y, z plus the edge z - w
pub fn coloring(objective: Objective) -> Dcop {
    let forbidden = objective.infeasible::<i32>();
    Dcop {
        objective,
        domains: vec![("x", vec![0, 1, 2]), ("y", vec![0, 1, 2]), ("z", vec![0, 1, 2]), ("w", vec![0, 1, 2])],
        edges: vec![("y", "x"), ("z", "y"), ("w", "z")],
        constraints: vec![
            different(vec!["x", "y"], forbidden),
            different(vec!["y", "z"], forbidden),
            different(vec!["x", "z"], forbidden),
            different(vec!["z", "w"], forbidden),
        ],
    }
}

/// Two variables with a single value which must differ
pub fn infeasible() -> Dcop {
    Dcop {
        objective: Objective::MAXIMIZE,
        domains: vec![("x", vec![0]), ("y", vec![0])],
        edges: vec![("y", "x")],
        constraints: vec![different(vec!["x", "y"], i32::MIN)],
    }
}

/// Two independent components: x - y and the lone variable s
pub fn disconnected() -> Dcop {
    Dcop {
        objective: Objective::MAXIMIZE,
        domains: vec![("x", vec![0, 1]), ("y", vec![0, 1, 2]), ("s", vec![0, 1, 2])],
        edges: vec![("y", "x")],
        constraints: vec![
            soft(15, vec!["x", "y"]),
            soft(16, vec!["s"]),
        ],
    }
}

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

/// A random instance over a random pseudo-forest. Every constraint links a
/// variable to its parent or to some of its other ancestors, and a few of
/// them are hard.
pub fn random(seed: u64, objective: Objective) -> Dcop {
    let mut rng = SmallRng::seed_from_u64(seed);
    let size = rng.gen_range(3..=NAMES.len());
    let mut dcop = Dcop { objective, domains: vec![], edges: vec![], constraints: vec![] };
    for i in 0..size {
        let var = NAMES[i];
        dcop.domains.push((var, (0..rng.gen_range(1..=3)).collect()));
        if rng.gen_bool(0.3) {
            dcop.constraints.push(soft(rng.gen_range(0..100), vec![var]));
        }
        if i == 0 || rng.gen_bool(0.15) {
            continue;
        }
        let parent = NAMES[rng.gen_range(0..i)];
        dcop.edges.push((var, parent));
        if rng.gen_bool(0.1) {
            dcop.constraints.push(different(vec![parent, var], objective.infeasible()));
        } else {
            dcop.constraints.push(soft(rng.gen_range(0..100), vec![parent, var]));
        }
        let others = dcop.ancestors(parent);
        if !others.is_empty() && rng.gen_bool(0.5) {
            let other = others[rng.gen_range(0..others.len())];
            if rng.gen_bool(0.5) {
                dcop.constraints.push(soft(rng.gen_range(0..100), vec![other, var]));
            } else {
                dcop.constraints.push(soft(rng.gen_range(0..100), vec![other, parent, var]));
            }
        }
    }
    dcop
}

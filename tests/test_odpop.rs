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

#![cfg(test)]
mod common;

use odpop::{Objective, Protocol, SolverConfig, SolverConfigBuilder};

use common::*;

fn check(dcop: Dcop) {
    let config = SolverConfigBuilder::default()
        .maximize(dcop.objective.is_maximize())
        .build()
        .unwrap();
    dcop.check(Protocol::Odpop, config);
}

#[test]
fn chain_maximize() {
    check(chain(Objective::MAXIMIZE));
}

#[test]
fn chain_minimize() {
    check(chain(Objective::MINIMIZE));
}

#[test]
fn star() {
    check(common::star());
}

#[test]
fn back_edge() {
    check(with_back_edge());
}

#[test]
fn hidden_separator_variable() {
    check(hidden_separator());
}

#[test]
fn coloring_maximize() {
    check(coloring(Objective::MAXIMIZE));
}

#[test]
fn coloring_minimize() {
    check(coloring(Objective::MINIMIZE));
}

#[test]
fn infeasible_problem() {
    let solution = infeasible().solve(Protocol::Odpop, SolverConfig::default()).unwrap();
    assert_eq!(Some(i32::MIN), solution.utility());
    assert_eq!(Some(&0), solution.assignment.get("y"));
}

#[test]
fn disconnected_components() {
    check(disconnected());
}

#[test]
fn every_variable_reports_its_width() {
    let solution = with_back_edge().solve(Protocol::Odpop, SolverConfig::default()).unwrap();
    let width_of = |name: &str| solution.reports.iter().find_map(|r| match r {
        odpop::Report::InducedWidth { variable, width } if variable == name => Some(*width),
        _ => None,
    });
    assert_eq!(Some(0), width_of("x"));
    assert_eq!(Some(1), width_of("y"));
    assert_eq!(Some(2), width_of("z"));
    assert_eq!(Some(1), width_of("w"));
}

#[test]
fn random_instances() {
    for seed in 0..50 {
        let objective = if seed % 2 == 0 { Objective::MAXIMIZE } else { Objective::MINIMIZE };
        check(random(seed, objective));
    }
}

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

//! This module provides an in-memory simulator: it owns the runtime of every
//! variable of a problem and delivers their messages one at a time until
//! nothing is left to deliver. Messages go first in first out, unless the
//! configuration asks for a seeded random delivery order.

use std::collections::VecDeque;

use fxhash::FxHashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{AsodpopVariable, Context, Envelope, Error, OdpopVariable, Report, Result, SolverConfig,
    Topology, Utility, Value, VariableProtocol, VariableRuntime};

/// The protocol used to solve a problem
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    Odpop,
    Asodpop,
}

/// The outcome of a simulation
#[derive(Debug, Clone)]
pub struct Solution<V, U> {
    /// The final value of each variable
    pub assignment: Context<V>,
    /// The optimal utility found by each root
    pub utilities: FxHashMap<String, U>,
    /// Every report the variables made
    pub reports: Vec<Report<V, U>>,
    /// The number of messages delivered
    pub messages: usize,
}
impl <V: Value, U: Utility> Solution<V, U> {
    /// The total utility over all the components of the problem, None when
    /// no root reported anything
    pub fn utility(&self) -> Option<U> {
        self.utilities.values().copied().reduce(|a, b| a.add(b))
    }
}

/// An in-memory, single threaded simulation of a distributed resolution
pub struct Simulation<V: Value, U: Utility> {
    config: SolverConfig,
    protocol: Protocol,
    variables: Vec<Box<dyn VariableProtocol<V, U>>>,
    index: FxHashMap<String, usize>,
    queue: VecDeque<Envelope<V, U>>,
    reports: Vec<Report<V, U>>,
}

impl <V: Value, U: Utility> Simulation<V, U> {
    pub fn new(config: SolverConfig, protocol: Protocol) -> Self {
        Simulation {
            config, protocol,
            variables: vec![],
            index: FxHashMap::default(),
            queue: VecDeque::new(),
            reports: vec![],
        }
    }
    /// Declares one variable of the problem
    pub fn add_variable(&mut self, topology: Topology<V, U>) -> Result<()> {
        if self.index.contains_key(&topology.variable) {
            return Err(Error::DuplicateVariable(topology.variable));
        }
        let name = topology.variable.clone();
        let variable: Box<dyn VariableProtocol<V, U>> = match self.protocol {
            Protocol::Odpop => {
                let runtime = VariableRuntime::new(topology, self.config.tree_config(false))?;
                Box::new(OdpopVariable::new(self.config, runtime))
            },
            Protocol::Asodpop => {
                let runtime = VariableRuntime::new(topology, self.config.tree_config(true))?;
                Box::new(AsodpopVariable::new(self.config, runtime))
            }
        };
        self.index.insert(name, self.variables.len());
        self.variables.push(variable);
        Ok(())
    }
    /// Starts all variables and delivers messages until the queue runs dry
    pub fn run(mut self) -> Result<Solution<V, U>> {
        for variable in self.variables.iter_mut() {
            variable.start(&mut self.queue, &mut self.reports);
        }
        let mut rng = self.config.delivery_seed.map(SmallRng::seed_from_u64);
        let mut delivered = 0;
        while let Some(envelope) = self.next_envelope(&mut rng) {
            if delivered >= self.config.message_budget {
                return Err(Error::MessageBudgetExhausted(self.config.message_budget));
            }
            delivered += 1;
            let receiver = *self.index.get(&envelope.receiver)
                .ok_or_else(|| Error::UnknownReceiver(envelope.receiver.clone()))?;
            self.variables[receiver].handle(envelope, &mut self.queue, &mut self.reports);
        }
        debug!(messages = delivered, "simulation over");

        let pending = self.variables.iter()
            .filter(|v| !v.is_terminated())
            .map(|v| v.variable().to_string())
            .collect::<Vec<_>>();
        if !pending.is_empty() {
            return Err(Error::Unterminated(pending));
        }

        let mut assignment = Context::default();
        let mut utilities = FxHashMap::default();
        for report in self.reports.iter() {
            match report {
                Report::Assignment(a) => { assignment.insert(a.variable.clone(), a.value.clone()); },
                Report::OptimalUtility { variable, utility } => { utilities.insert(variable.clone(), *utility); },
                Report::InducedWidth { .. } => {},
            }
        }
        Ok(Solution { assignment, utilities, reports: self.reports, messages: delivered })
    }
    /// The oldest pending message, or any of them when the order is shuffled
    fn next_envelope(&mut self, rng: &mut Option<SmallRng>) -> Option<Envelope<V, U>> {
        match rng {
            Some(rng) if !self.queue.is_empty() => {
                let pick = rng.gen_range(0..self.queue.len());
                self.queue.swap_remove_back(pick)
            },
            _ => self.queue.pop_front(),
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

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

//! This module provides the ODPOP state machine of one variable. During the
//! UTIL phase, each parent asks its children for their goods one at a time
//! (best first) and only reports a good to its own parent once it is proven
//! optimal. When the root finds its optimum, the VALUE phase starts and the
//! chosen values flow down the pseudo-tree.

use tracing::debug;

use crate::{Context, Envelope, Message, Report, SolverConfig, StatsCollector, Transport, Utility, Value,
    VariableProtocol, VariableRuntime};

/// The states of the UTIL phase of a variable
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UtilState {
    /// The variable was not started yet
    Uninitialized,
    /// An answer is owed (to the parent or, at the root, to the collector)
    /// and the variable waits for its children
    AwaitingChildren,
    /// Nothing is owed: the variable waits for the next ASK of its parent
    Responded,
    /// The UTIL phase is over and the value of the variable is known
    Terminated,
}

/// The ODPOP runtime of one variable
pub struct OdpopVariable<V: Value, U: Utility> {
    config: SolverConfig,
    runtime: VariableRuntime<V, U>,
    state: UtilState,
    /// The messages received before the start
    postponed: Vec<Envelope<V, U>>,
    value: Option<V>,
}

impl <V: Value, U: Utility> OdpopVariable<V, U> {
    pub fn new(config: SolverConfig, runtime: VariableRuntime<V, U>) -> Self {
        OdpopVariable { config, runtime, state: UtilState::Uninitialized, postponed: vec![], value: None }
    }
    pub fn state(&self) -> UtilState {
        self.state
    }
    /// The final value of the variable (once terminated)
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    fn on_ask(&mut self, net: &mut dyn Transport<V, U>) {
        let rt = &mut self.runtime;
        if let Some(good) = rt.tree.get_amax() {
            rt.tree.remove_amax();
            let message = rt.util_message(good, true);
            rt.send_to_parent(message, net);
            self.state = UtilState::Responded;
        } else if rt.tree.has_more() && !rt.infeasible {
            rt.ask_children(net);
            self.state = UtilState::AwaitingChildren;
        } else {
            rt.send_to_parent(Message::Done, net);
            self.state = UtilState::Responded;
        }
    }
    fn on_util(&mut self, sender: &str, message: Message<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let child = self.runtime.child_index(sender);
        self.runtime.asked[child] = false;
        self.runtime.receive_util(child, message);
        if self.runtime.is_root() {
            self.check_root(net, stats);
        } else if self.state == UtilState::AwaitingChildren {
            self.on_ask(net);
        }
    }
    fn on_done(&mut self, sender: &str, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let child = self.runtime.child_index(sender);
        self.runtime.asked[child] = true;
        if self.runtime.tree.set_child_done(child) {
            self.runtime.infeasible = true;
        }
        if self.runtime.is_root() {
            self.check_root(net, stats);
        } else if self.state == UtilState::AwaitingChildren {
            self.on_ask(net);
        }
    }
    /// At the root, terminates as soon as the optimum is known (or proven
    /// not to exist) and asks for more goods otherwise.
    fn check_root(&mut self, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let rt = &mut self.runtime;
        if let Some(good) = rt.tree.get_amax() {
            rt.tree.remove_amax();
            self.terminate_root(Some(good.utility), net, stats);
        } else if rt.infeasible || !rt.tree.has_more() {
            self.terminate_root(None, net, stats);
        } else {
            rt.ask_children(net);
        }
    }
    fn terminate_root(&mut self, utility: Option<U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let objective = self.config.objective();
        let utility = utility.unwrap_or_else(|| objective.infeasible());
        let feasible = !objective.is_infeasible(utility);
        debug!(variable = %self.runtime.variable, ?utility, "optimum found");
        stats.report(Report::OptimalUtility { variable: self.runtime.variable.clone(), utility });
        let context = Context::default();
        self.end_util(if feasible { Some(&context) } else { None }, net, stats);
    }
    /// Hands the tree over to the VALUE phase
    fn end_util(&mut self, context: Option<&Context<V>>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        self.state = UtilState::Terminated;
        self.runtime.report_width(stats);
        let value = self.runtime.propagate_value(context, true, net);
        debug!(variable = %self.runtime.variable, ?value, "terminated");
        self.runtime.report_assignment(value.clone(), stats);
        self.value = Some(value);
    }
    fn dispatch(&mut self, envelope: Envelope<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let Envelope { sender, receiver, message } = envelope;
        assert_eq!(receiver, self.runtime.variable, "message delivered to the wrong variable");
        if self.state == UtilState::Terminated {
            debug!(variable = %receiver, from = %sender, kind = message.kind(), "late message ignored");
            return;
        }
        debug!(variable = %receiver, from = %sender, kind = message.kind(), "receive");
        match message {
            Message::Ask => self.on_ask(net),
            Message::Done => self.on_done(&sender, net, stats),
            Message::ValueChild { context, .. } => self.end_util(context.as_ref(), net, stats),
            // the context sent by the parent already covers the whole separator
            Message::ValuePseudo { .. } => {},
            Message::Ack => {},
            util => self.on_util(&sender, util, net, stats),
        }
    }
}

impl <V: Value, U: Utility> VariableProtocol<V, U> for OdpopVariable<V, U> {
    fn variable(&self) -> &str {
        &self.runtime.variable
    }
    fn start(&mut self, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        if self.state != UtilState::Uninitialized {
            return;
        }
        self.state = UtilState::Responded;
        if self.runtime.is_root() {
            self.state = UtilState::AwaitingChildren;
            if self.runtime.children.is_empty() {
                self.check_root(net, stats);
            } else {
                self.runtime.ask_children(net);
            }
        }
        for envelope in std::mem::take(&mut self.postponed) {
            self.dispatch(envelope, net, stats);
        }
    }
    fn handle(&mut self, envelope: Envelope<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        if self.state == UtilState::Uninitialized {
            self.postponed.push(envelope);
        } else {
            self.dispatch(envelope, net, stats);
        }
    }
    fn is_terminated(&self) -> bool {
        self.state == UtilState::Terminated
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

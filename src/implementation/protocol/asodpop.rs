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

//! This module provides the ASODPOP state machine of one variable. ASODPOP
//! is the asynchronous flavour of ODPOP: variables learn their separator
//! online, report speculative goods before they can prove them optimal and
//! keep their children informed of their current best value, so that the
//! VALUE phase overlaps with the UTIL phase. Only confirmed VALUE messages
//! make a variable terminate.

use std::collections::VecDeque;

use tracing::debug;

use crate::{Context, Envelope, Good, Message, Report, SolverConfig, StatsCollector, Transport, Utility,
    Value, VariableProtocol, VariableRuntime};

/// The state of the link between a variable and its parent
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Messages flow freely
    Acked,
    /// A separator growth message was sent and is not acknowledged yet
    Unacked,
}

/// The link between a variable and its parent. A separator growth message
/// must be acknowledged before anything else is sent, so that the parent
/// never receives a compact good it cannot decode.
#[derive(Debug, Clone)]
pub struct ParentLink<V, U> {
    state: LinkState,
    queue: VecDeque<Message<V, U>>,
}
impl <V: Value, U: Utility> ParentLink<V, U> {
    pub fn new() -> Self {
        ParentLink { state: LinkState::Acked, queue: VecDeque::new() }
    }
    pub fn state(&self) -> LinkState {
        self.state
    }
    /// Number of messages waiting for an acknowledgement
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }
    /// Returns the messages which may be sent right away
    pub fn push(&mut self, message: Message<V, U>) -> Vec<Message<V, U>> {
        match self.state {
            LinkState::Acked => {
                if message.has_variables() {
                    self.state = LinkState::Unacked;
                }
                vec![message]
            },
            LinkState::Unacked => {
                self.queue.push_back(message);
                vec![]
            }
        }
    }
    /// Records an acknowledgement and returns the messages it releases
    pub fn ack(&mut self) -> Vec<Message<V, U>> {
        self.state = LinkState::Acked;
        let mut out = vec![];
        while let Some(message) = self.queue.pop_front() {
            let blocking = message.has_variables();
            out.push(message);
            if blocking {
                self.state = LinkState::Unacked;
                break;
            }
        }
        out
    }
}
impl <V: Value, U: Utility> Default for ParentLink<V, U> {
    fn default() -> Self {
        Self::new()
    }
}

/// The ASODPOP runtime of one variable
pub struct AsodpopVariable<V: Value, U: Utility> {
    config: SolverConfig,
    runtime: VariableRuntime<V, U>,
    started: bool,
    terminated: bool,
    /// The messages received before the start
    postponed: Vec<Envelope<V, U>>,
    link: ParentLink<V, U>,
    /// The latest values received from the parent and pseudo-parents
    context: Context<V>,
    /// The current (possibly speculative) value of the variable
    value: Option<V>,
    last_sent: Option<Good<V, U>>,
    /// True when the parent still waits for a confirmed good
    not_responded: bool,
    done_sent: bool,
}

impl <V: Value, U: Utility> AsodpopVariable<V, U> {
    pub fn new(config: SolverConfig, runtime: VariableRuntime<V, U>) -> Self {
        AsodpopVariable {
            config, runtime,
            started: false,
            terminated: false,
            postponed: vec![],
            link: ParentLink::new(),
            context: Context::default(),
            value: None,
            last_sent: None,
            not_responded: false,
            done_sent: false,
        }
    }
    /// The current value of the variable
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }
    pub fn link(&self) -> &ParentLink<V, U> {
        &self.link
    }

    fn send_to_parent(&mut self, message: Message<V, U>, net: &mut dyn Transport<V, U>) {
        for message in self.link.push(message) {
            self.runtime.send_to_parent(message, net);
        }
    }
    fn send_good(&mut self, good: Good<V, U>, net: &mut dyn Transport<V, U>) {
        self.not_responded = !good.confirmed;
        if good.confirmed {
            // the tree only forgets a good once told so
            self.runtime.tree.remove_amax();
        }
        if self.last_sent.as_ref() == Some(&good) {
            return;
        }
        self.last_sent = Some(good.clone());
        let message = self.runtime.util_message(good, self.config.share_domains);
        self.send_to_parent(message, net);
    }
    fn on_ask(&mut self, net: &mut dyn Transport<V, U>) {
        let amax = self.runtime.tree.get_amax();
        if !self.runtime.infeasible && (amax.is_some() || self.runtime.tree.has_more()) {
            match amax {
                Some(good) if good.confirmed || !self.runtime.tree.not_enough_info() => {
                    self.send_good(good, net);
                    if self.not_responded {
                        self.runtime.ask_children(net);
                    }
                },
                _ => {
                    self.not_responded = true;
                    self.runtime.ask_children(net);
                }
            }
        } else if !self.done_sent {
            self.done_sent = true;
            self.not_responded = false;
            self.send_to_parent(Message::Done, net);
        }
    }
    fn on_util(&mut self, sender: &str, message: Message<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let child = self.runtime.child_index(sender);
        let announced = message.has_variables();
        if announced {
            net.send(Envelope::new(&self.runtime.variable, sender, Message::Ack));
        }
        let good = match self.runtime.receive_util(child, message) {
            Some(good) => good,
            None => return,
        };
        if good.confirmed {
            self.runtime.asked[child] = false;
        }

        if self.runtime.is_root() && self.runtime.tree.is_valuation_sufficient() {
            self.terminate(net, stats);
            return;
        }
        let value = self.runtime.tree.best_assignment_for_own_variable(&self.context);
        if self.value.as_ref() != Some(&value) || good.confirmed || announced {
            self.value = Some(value.clone());
            self.runtime.send_value(Some(&self.context), &value, false, net);
        }
        if self.runtime.is_root() {
            if good.confirmed && !self.runtime.asked[child] {
                self.runtime.ask_child(child, net);
            }
        } else if self.not_responded {
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
            if self.runtime.infeasible || self.runtime.tree.is_valuation_sufficient() {
                self.terminate(net, stats);
            } else {
                self.runtime.ask_children(net);
            }
        } else if self.not_responded {
            self.on_ask(net);
        }
    }
    fn on_value(&mut self, context: Option<Context<V>>, confirmed: bool, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        if confirmed {
            self.terminated = true;
            self.runtime.report_width(stats);
            let value = match context {
                Some(context) => {
                    self.context = context;
                    self.runtime.propagate_value(Some(&self.context), true, net)
                },
                None => self.runtime.propagate_value(None, true, net),
            };
            debug!(variable = %self.runtime.variable, ?value, "terminated");
            self.runtime.report_assignment(value.clone(), stats);
            self.value = Some(value);
            return;
        }
        if let Some(context) = context {
            for (var, value) in context {
                // pseudo-parents tell their values directly
                if !self.runtime.pseudo_parents.contains(&var) {
                    self.context.insert(var, value);
                }
            }
        }
        self.update_value(net);
    }
    fn on_pseudo_value(&mut self, sender: String, value: V, net: &mut dyn Transport<V, U>) {
        self.context.insert(sender, value);
        self.update_value(net);
    }
    /// Recomputes the current value and tells the children when it changed
    fn update_value(&mut self, net: &mut dyn Transport<V, U>) {
        let value = self.runtime.tree.best_assignment_for_own_variable(&self.context);
        if self.value.as_ref() != Some(&value) {
            self.value = Some(value.clone());
            self.runtime.send_value(Some(&self.context), &value, false, net);
        }
    }
    /// At the root, ends the whole resolution
    fn terminate(&mut self, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        self.terminated = true;
        let objective = self.config.objective();
        let utility = self.runtime.tree.best_utility().unwrap_or_else(|| objective.infeasible());
        debug!(variable = %self.runtime.variable, ?utility, "optimum found");
        stats.report(Report::OptimalUtility { variable: self.runtime.variable.clone(), utility });
        self.runtime.report_width(stats);
        let value = if objective.is_infeasible(utility) {
            self.runtime.propagate_value(None, true, net)
        } else {
            let context = Context::default();
            let value = self.runtime.tree.own_variable_value(&context);
            self.runtime.send_value(Some(&context), &value, true, net);
            value
        };
        self.runtime.report_assignment(value.clone(), stats);
        self.value = Some(value);
    }
    fn dispatch(&mut self, envelope: Envelope<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        let Envelope { sender, receiver, message } = envelope;
        assert_eq!(receiver, self.runtime.variable, "message delivered to the wrong variable");
        if self.terminated {
            debug!(variable = %receiver, from = %sender, kind = message.kind(), "late message ignored");
            return;
        }
        debug!(variable = %receiver, from = %sender, kind = message.kind(), "receive");
        match message {
            Message::Ask => self.on_ask(net),
            Message::Done => self.on_done(&sender, net, stats),
            Message::Ack => {
                for message in self.link.ack() {
                    self.runtime.send_to_parent(message, net);
                }
            },
            Message::ValueChild { context, confirmed } => self.on_value(context, confirmed, net, stats),
            Message::ValuePseudo { value } => self.on_pseudo_value(sender, value, net),
            util => self.on_util(&sender, util, net, stats),
        }
    }
}

impl <V: Value, U: Utility> VariableProtocol<V, U> for AsodpopVariable<V, U> {
    fn variable(&self) -> &str {
        &self.runtime.variable
    }
    fn start(&mut self, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        if self.started {
            return;
        }
        self.started = true;
        let value = self.runtime.domain[0].clone();
        self.value = Some(value.clone());
        self.runtime.send_value(Some(&self.context), &value, false, net);
        if self.runtime.is_root() {
            if self.runtime.children.is_empty() {
                self.terminate(net, stats);
            } else {
                self.runtime.ask_children(net);
            }
        }
        for envelope in std::mem::take(&mut self.postponed) {
            self.dispatch(envelope, net, stats);
        }
    }
    fn handle(&mut self, envelope: Envelope<V, U>, net: &mut dyn Transport<V, U>, stats: &mut dyn StatsCollector<V, U>) {
        if self.started {
            self.dispatch(envelope, net, stats);
        } else {
            self.postponed.push(envelope);
        }
    }
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_parent_link {
    use crate::{Good, LinkState, Message, ParentLink};

    fn vars(utility: i32) -> Message<i32, i32> {
        Message::util_vars(Good::new(vec!["x".to_string()], vec![0], utility), vec![vec![0, 1]])
    }
    fn util(utility: i32) -> Message<i32, i32> {
        Message::Util { values: vec![0], utility, confirmed: false }
    }

    #[test]
    fn compact_goods_flow_freely_on_an_acked_link() {
        let mut link = ParentLink::new();
        assert_eq!(vec![util(1)], link.push(util(1)));
        assert_eq!(LinkState::Acked, link.state());
    }
    #[test]
    fn everything_waits_behind_an_unacked_growth() {
        let mut link = ParentLink::new();
        assert_eq!(vec![vars(1)], link.push(vars(1)));
        assert_eq!(LinkState::Unacked, link.state());
        assert!(link.push(util(2)).is_empty());
        assert!(link.push(Message::Done).is_empty());
        assert_eq!(2, link.backlog());

        assert_eq!(vec![util(2), Message::Done], link.ack());
        assert_eq!(LinkState::Acked, link.state());
        assert_eq!(0, link.backlog());
    }
    #[test]
    fn an_ack_releases_messages_up_to_the_next_growth() {
        let mut link = ParentLink::new();
        link.push(vars(1));
        link.push(util(2));
        link.push(vars(3));
        link.push(util(4));
        assert_eq!(vec![util(2), vars(3)], link.ack());
        assert_eq!(LinkState::Unacked, link.state());
        assert_eq!(vec![util(4)], link.ack());
        assert_eq!(LinkState::Acked, link.state());
    }
}

#[cfg(test)]
mod test_asodpop {
    use crate::{AsodpopVariable, Envelope, Hypercube, Message, Report, SolverConfig, Topology,
        UtilitySpace, VariableProtocol, VariableRuntime};

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }
    fn space(vars: &[&str], utils: Vec<i32>) -> Box<dyn UtilitySpace<i32, i32>> {
        let domains = vars.iter().map(|_| vec![0, 1]).collect();
        Box::new(Hypercube::new(names(vars), domains, utils).unwrap())
    }
    fn variable(topology: Topology<i32, i32>) -> AsodpopVariable<i32, i32> {
        let config = SolverConfig::default();
        AsodpopVariable::new(config, VariableRuntime::new(topology, config.tree_config(true)).unwrap())
    }

    #[test]
    fn the_start_publishes_a_speculative_value() {
        let mut x = variable(Topology::new("x", vec![0, 1]).with_child("c").with_pseudo_child("p"));
        let mut net: Vec<Envelope<i32, i32>> = vec![];
        let mut stats: Vec<Report<i32, i32>> = vec![];
        x.start(&mut net, &mut stats);
        assert!(matches!(net[0].message, Message::ValueChild { context: Some(_), confirmed: false }));
        assert_eq!(Message::ValuePseudo { value: 0 }, net[1].message);
        assert_eq!(Message::Ask, net[2].message);
    }
    #[test]
    fn a_leaf_answers_with_confirmed_goods_and_waits_for_the_ack() {
        let mut c = variable(Topology::new("c", vec![0, 1]).with_parent("x").with_space(space(&["x", "c"], vec![1, 4, 3, 2])));
        let mut net: Vec<Envelope<i32, i32>> = vec![];
        let mut stats: Vec<Report<i32, i32>> = vec![];
        c.start(&mut net, &mut stats);
        assert!(net.is_empty());

        c.handle(Envelope::new("x", "c", Message::Ask), &mut net, &mut stats);
        assert!(matches!(net[0].message, Message::UtilVars { utility: 4, confirmed: true, .. }));
        // the next good waits for the acknowledgement
        c.handle(Envelope::new("x", "c", Message::Ask), &mut net, &mut stats);
        assert_eq!(1, net.len());
        c.handle(Envelope::new("x", "c", Message::Ack), &mut net, &mut stats);
        assert_eq!(Message::Util { values: vec![1], utility: 3, confirmed: true }, net[1].message);
    }
    #[test]
    fn the_root_acknowledges_growth_and_terminates_once_sufficient() {
        let mut x = variable(Topology::new("x", vec![0, 1]).with_child("c").with_space(space(&["x"], vec![1, 0])));
        let mut net: Vec<Envelope<i32, i32>> = vec![];
        let mut stats: Vec<Report<i32, i32>> = vec![];
        x.start(&mut net, &mut stats);
        net.clear();

        let first = Message::util_vars(crate::Good::new(names(&["x"]), vec![1], 7), vec![vec![0, 1]]);
        x.handle(Envelope::new("c", "x", first), &mut net, &mut stats);
        assert_eq!(Message::Ack, net[0].message);
        assert!(!x.is_terminated());
        // x=0 is still open: the root asks again
        assert!(net.iter().any(|e| e.message == Message::Ask));

        x.handle(Envelope::new("c", "x", Message::Util { values: vec![0], utility: 4, confirmed: true }), &mut net, &mut stats);
        assert!(x.is_terminated());
        assert_eq!(Some(&1), x.value());
        assert_eq!(Report::OptimalUtility { variable: "x".to_string(), utility: 7 }, stats[0]);
        let last = net.last().unwrap();
        match &last.message {
            Message::ValueChild { context: Some(ctx), confirmed: true } => assert_eq!(Some(&1), ctx.get("x")),
            other => panic!("unexpected {:?}", other),
        }
    }
    #[test]
    fn speculative_values_do_not_terminate() {
        let mut c = variable(Topology::new("c", vec![0, 1]).with_parent("x").with_space(space(&["x", "c"], vec![1, 4, 3, 2])));
        let mut net: Vec<Envelope<i32, i32>> = vec![];
        let mut stats: Vec<Report<i32, i32>> = vec![];
        c.start(&mut net, &mut stats);
        let mut ctx = fxhash::FxHashMap::default();
        ctx.insert("x".to_string(), 1);
        c.handle(Envelope::new("x", "c", Message::ValueChild { context: Some(ctx.clone()), confirmed: false }), &mut net, &mut stats);
        assert!(!c.is_terminated());
        assert_eq!(Some(&0), c.value());
        ctx.insert("x".to_string(), 0);
        c.handle(Envelope::new("x", "c", Message::ValueChild { context: Some(ctx), confirmed: true }), &mut net, &mut stats);
        assert!(c.is_terminated());
        assert_eq!(Some(&1), c.value());
    }
    #[test]
    fn a_singleton_root_terminates_on_start() {
        let mut x = variable(Topology::new("x", vec![0, 1]).with_space(space(&["x"], vec![3, 5])));
        let mut net: Vec<Envelope<i32, i32>> = vec![];
        let mut stats: Vec<Report<i32, i32>> = vec![];
        x.start(&mut net, &mut stats);
        assert!(x.is_terminated());
        assert_eq!(Some(&1), x.value());
        assert_eq!(Report::OptimalUtility { variable: "x".to_string(), utility: 5 }, stats[0]);
    }
}

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

//! This module provides what both propagation protocols know about a given
//! variable: its position in the pseudo-tree, its goods tree and the way
//! goods and values are sent around.

use fxhash::FxHashSet;
use tracing::debug;

use crate::{AssignmentReport, Context, Envelope, Error, Good, GoodsTree, InnerNodeTree, LeafNodeTree,
    LocalProblem, Message, Report, Result, StatsCollector, TreeConfig, Transport, Utility, UtilitySpace,
    UtilContent, Value};

/// The position of a variable in the pseudo-tree along with the utility
/// spaces it owns. This is what a topology provider hands to each variable.
pub struct Topology<V: Value, U: Utility> {
    pub variable: String,
    pub domain: Vec<V>,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub pseudo_parents: Vec<String>,
    pub pseudo_children: Vec<String>,
    pub spaces: Vec<Box<dyn UtilitySpace<V, U>>>,
}

impl <V: Value, U: Utility> Topology<V, U> {
    /// A variable without any neighbor nor constraint
    pub fn new(variable: &str, domain: Vec<V>) -> Self {
        Topology {
            variable: variable.to_string(),
            domain,
            parent: None,
            children: vec![],
            pseudo_parents: vec![],
            pseudo_children: vec![],
            spaces: vec![],
        }
    }
    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }
    pub fn with_child(mut self, child: &str) -> Self {
        self.children.push(child.to_string());
        self
    }
    pub fn with_pseudo_parent(mut self, pseudo_parent: &str) -> Self {
        self.pseudo_parents.push(pseudo_parent.to_string());
        self
    }
    pub fn with_pseudo_child(mut self, pseudo_child: &str) -> Self {
        self.pseudo_children.push(pseudo_child.to_string());
        self
    }
    pub fn with_space(mut self, space: Box<dyn UtilitySpace<V, U>>) -> Self {
        self.spaces.push(space);
        self
    }
}

/// The per-variable state shared by the ODPOP and ASODPOP state machines
pub struct VariableRuntime<V: Value, U: Utility> {
    pub variable: String,
    pub domain: Vec<V>,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub pseudo_parents: Vec<String>,
    pub pseudo_children: Vec<String>,
    pub tree: Box<dyn GoodsTree<V, U>>,
    /// For each child, true when that child must not be asked right now:
    /// either an ASK is pending or the child told it is done.
    pub asked: Vec<bool>,
    /// True when the separator grew since the last good sent to the parent
    pub new_variable: bool,
    /// True once the tree proved the subproblem infeasible
    pub infeasible: bool,
    pub goods_sent: usize,
    collect_stats: bool,
}

impl <V: Value, U: Utility> VariableRuntime<V, U> {
    /// Validates the topology and builds the goods tree of the variable
    pub fn new(topology: Topology<V, U>, config: TreeConfig) -> Result<Self> {
        let Topology { variable, domain, parent, children, pseudo_parents, pseudo_children, spaces } = topology;
        if domain.is_empty() {
            return Err(Error::EmptyDomain(variable));
        }
        let mut seen = FxHashSet::default();
        for child in children.iter() {
            if !seen.insert(child.as_str()) {
                return Err(Error::DuplicateChild { variable, child: child.clone() });
            }
        }
        let problem = LocalProblem::new(config.objective(), &variable, domain.clone(), spaces)?;
        let tree: Box<dyn GoodsTree<V, U>> = if children.is_empty() {
            Box::new(LeafNodeTree::new(problem))
        } else {
            Box::new(InnerNodeTree::new(config, problem, children.clone())?)
        };
        Ok(VariableRuntime {
            variable, domain, parent,
            asked: vec![false; children.len()],
            children, pseudo_parents, pseudo_children, tree,
            new_variable: true,
            infeasible: false,
            goods_sent: 0,
            collect_stats: config.collect_stats,
        })
    }
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
    /// The index of the given child. A sender which is not a child of this
    /// variable means the protocol went out of sync with the topology.
    pub fn child_index(&self, name: &str) -> usize {
        match self.children.iter().position(|c| c == name) {
            Some(index) => index,
            None => panic!("{} is not a child of {}", name, self.variable),
        }
    }
    /// Sends a message to the parent (if any)
    pub fn send_to_parent(&self, message: Message<V, U>, net: &mut dyn Transport<V, U>) {
        if let Some(parent) = self.parent.as_ref() {
            debug!(from = %self.variable, to = %parent, kind = message.kind(), "send");
            net.send(Envelope::new(&self.variable, parent, message));
        }
    }
    /// Asks for more goods to every child which may be asked
    pub fn ask_children(&mut self, net: &mut dyn Transport<V, U>) -> usize {
        let mut count = 0;
        for (child, asked) in self.children.iter().zip(self.asked.iter_mut()) {
            if !*asked {
                *asked = true;
                count += 1;
                debug!(from = %self.variable, to = %child, "ask");
                net.send(Envelope::new(&self.variable, child, Message::Ask));
            }
        }
        count
    }
    /// Asks the given child only
    pub fn ask_child(&mut self, child: usize, net: &mut dyn Transport<V, U>) {
        self.asked[child] = true;
        debug!(from = %self.variable, to = %self.children[child], "ask");
        net.send(Envelope::new(&self.variable, &self.children[child], Message::Ask));
    }
    /// Wraps a good in the most appropriate UTIL message. The variable names
    /// are sent exactly once after each separator growth.
    pub fn util_message(&mut self, good: Good<V, U>, share_domains: bool) -> Message<V, U> {
        self.goods_sent += 1;
        if self.new_variable {
            self.new_variable = false;
            if share_domains {
                let domains = self.tree.domains();
                Message::util_vars(good, domains)
            } else {
                let _ = self.tree.take_domain_size_update();
                let sizes = self.tree.final_domain_sizes();
                Message::util_dom_vars(good, sizes)
            }
        } else if share_domains {
            Message::util(good)
        } else {
            match self.tree.take_domain_size_update() {
                Some(sizes) => Message::util_dom(good, sizes),
                None => Message::util(good),
            }
        }
    }
    /// Decodes a UTIL message sent by the given child and feeds the tree
    /// with it. Returns the decoded good.
    pub fn receive_util(&mut self, child: usize, message: Message<V, U>) -> Option<Good<V, U>> {
        let tree = &self.tree;
        let UtilContent { good, domains, sizes, announced } =
            message.into_util(|| tree.child_separator_reporting_order(child))?;
        if announced {
            self.tree.set_children_separator(child, &good.variables);
        }
        if self.tree.ignore_good(&good, child) {
            debug!(variable = %self.variable, child = %self.children[child], "ignored a stale speculative good");
            return None;
        }
        let discovered = self.tree.add(&good, child, domains.as_ref());
        if let Some(sizes) = sizes {
            self.tree.set_final_domain_size(&good.variables, &sizes);
        }
        if discovered {
            debug!(variable = %self.variable, separator = ?self.tree.separator(), "separator grew");
        }
        self.new_variable |= discovered;
        Some(good)
    }
    /// Chooses the value of the variable given the context received from
    /// the parent, forwards the context to the children and the value to the
    /// pseudo-children. A None context stands for an infeasible subproblem:
    /// an arbitrary value is picked and the None context is forwarded.
    pub fn propagate_value(&self, context: Option<&Context<V>>, confirmed: bool, net: &mut dyn Transport<V, U>) -> V {
        let value = match context {
            Some(context) => self.tree.best_assignment_for_own_variable(context),
            None => self.domain[0].clone(),
        };
        self.send_value(context, &value, confirmed, net);
        value
    }
    /// Forwards the context (extended with the value of this variable) to
    /// the children and the value to the pseudo-children
    pub fn send_value(&self, context: Option<&Context<V>>, value: &V, confirmed: bool, net: &mut dyn Transport<V, U>) {
        let full = context.map(|context| {
            let mut full = context.clone();
            full.insert(self.variable.clone(), value.clone());
            full
        });
        for (i, child) in self.children.iter().enumerate() {
            let context = full.as_ref().map(|full| self.tree.child_values(full, i));
            debug!(from = %self.variable, to = %child, confirmed, "value");
            net.send(Envelope::new(&self.variable, child, Message::ValueChild { context, confirmed }));
        }
        for pseudo in self.pseudo_children.iter() {
            net.send(Envelope::new(&self.variable, pseudo, Message::ValuePseudo { value: value.clone() }));
        }
    }
    /// Hands the induced width of the variable over to the collector
    pub fn report_width(&self, stats: &mut dyn StatsCollector<V, U>) {
        stats.report(Report::InducedWidth { variable: self.variable.clone(), width: self.tree.separator().len() });
    }
    /// Hands the final value of the variable over to the collector
    pub fn report_assignment(&self, value: V, stats: &mut dyn StatsCollector<V, U>) {
        if !self.collect_stats {
            return;
        }
        let tree = self.tree.stats();
        stats.report(Report::Assignment(AssignmentReport {
            variable: self.variable.clone(),
            value,
            tree_fill: tree.tree_fill(),
            dummy_fill: tree.dummy_fill(),
            dummies: tree.dummies,
            goods_sent: self.goods_sent,
            space_size: tree.space_size,
            speculative_goods: tree.speculative_goods,
            confirmed_goods: tree.confirmed_goods,
        }));
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_runtime {
    use fxhash::FxHashMap;

    use crate::{Envelope, Error, Good, Hypercube, Message, Topology, TreeConfig, UtilitySpace, VariableRuntime};

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }
    fn space(vars: &[&str], utils: Vec<i32>) -> Box<dyn UtilitySpace<i32, i32>> {
        let domains = vars.iter().map(|_| vec![0, 1]).collect();
        Box::new(Hypercube::new(names(vars), domains, utils).unwrap())
    }

    #[test]
    fn an_empty_domain_is_rejected() {
        let topo: Topology<i32, i32> = Topology::new("x", vec![]);
        assert_eq!(Some(Error::EmptyDomain("x".to_string())), VariableRuntime::new(topo, TreeConfig::default()).err());
    }
    #[test]
    fn a_child_listed_twice_is_rejected() {
        let topo: Topology<i32, i32> = Topology::new("x", vec![0, 1]).with_child("y").with_child("y");
        let err = VariableRuntime::new(topo, TreeConfig::default()).err();
        assert_eq!(Some(Error::DuplicateChild { variable: "x".to_string(), child: "y".to_string() }), err);
    }
    #[test]
    fn too_many_children_are_rejected() {
        let mut topo: Topology<i32, i32> = Topology::new("x", vec![0, 1]);
        for i in 0..25 {
            topo = topo.with_child(&format!("c{}", i));
        }
        assert!(matches!(VariableRuntime::new(topo, TreeConfig::default()), Err(Error::TooManyChildren { .. })));
    }
    #[test]
    fn a_space_without_domain_is_rejected() {
        struct Broken(Vec<String>);
        impl UtilitySpace<i32, i32> for Broken {
            fn variables(&self) -> &[String] { &self.0 }
            fn domain(&self, _: &str) -> Option<&[i32]> { None }
            fn utility(&self, _: &[i32]) -> i32 { 0 }
        }
        let topo: Topology<i32, i32> = Topology::new("x", vec![0, 1]).with_space(Box::new(Broken(names(&["y", "x"]))));
        assert!(matches!(VariableRuntime::new(topo, TreeConfig::default()), Err(Error::MissingDomain { .. })));
    }
    #[test]
    fn the_first_good_carries_the_variables_then_compact_goods_follow() {
        let topo = Topology::new("x", vec![0, 1]).with_parent("y").with_space(space(&["y", "x"], vec![1, 4, 3, 2]));
        let mut rt = VariableRuntime::new(topo, TreeConfig::default()).unwrap();
        let first = rt.tree.get_amax().unwrap();
        rt.tree.remove_amax();
        assert!(rt.util_message(first, true).has_variables());
        let second = rt.tree.get_amax().unwrap();
        assert_eq!(Message::Util { values: vec![1], utility: 3, confirmed: true }, rt.util_message(second, true));
        assert_eq!(2, rt.goods_sent);
    }
    #[test]
    fn without_shared_domains_the_sizes_are_sent() {
        let topo = Topology::new("x", vec![0, 1]).with_parent("y").with_space(space(&["y", "x"], vec![1, 4, 3, 2]));
        let mut rt = VariableRuntime::new(topo, TreeConfig::default()).unwrap();
        let first = rt.tree.get_amax().unwrap();
        let msg = rt.util_message(first, false);
        assert!(matches!(msg, Message::UtilDomVars { ref sizes, .. } if sizes == &vec![Some(2)]));
    }
    #[test]
    fn received_goods_feed_the_tree() {
        let topo = Topology::new("x", vec![0, 1]).with_child("c");
        let mut rt: VariableRuntime<i32, i32> = VariableRuntime::new(topo, TreeConfig::default()).unwrap();
        let good = Good::new(names(&["x"]), vec![1], 6);
        let msg = Message::util_vars(good, vec![vec![0, 1]]);
        let decoded = rt.receive_util(0, msg).unwrap();
        assert_eq!(6, decoded.utility);
        assert_eq!(names(&["x"]), rt.tree.child_separator_reporting_order(0));
        let compact = Message::Util { values: vec![0], utility: 2, confirmed: true };
        assert_eq!(names(&["x"]), rt.receive_util(0, compact).unwrap().variables);
        let amax = rt.tree.get_amax().unwrap();
        assert_eq!(6, amax.utility);
    }
    #[test]
    fn values_are_forwarded_to_children_and_pseudo_children() {
        let topo = Topology::new("x", vec![0, 1]).with_child("c").with_pseudo_child("p");
        let rt: VariableRuntime<i32, i32> = VariableRuntime::new(topo, TreeConfig::default()).unwrap();
        let mut sent: Vec<Envelope<i32, i32>> = vec![];
        let value = rt.propagate_value(None, true, &mut sent);
        assert_eq!(0, value);
        assert_eq!(2, sent.len());
        assert_eq!(Message::ValueChild { context: None, confirmed: true }, sent[0].message);
        assert_eq!(Message::ValuePseudo { value: 0 }, sent[1].message);

        sent.clear();
        rt.propagate_value(Some(&FxHashMap::default()), false, &mut sent);
        match &sent[0].message {
            Message::ValueChild { context: Some(ctx), confirmed: false } => assert!(ctx.contains_key("x")),
            other => panic!("unexpected {:?}", other),
        }
    }
    #[test]
    #[should_panic]
    fn a_stranger_is_not_a_child() {
        let topo: Topology<i32, i32> = Topology::new("x", vec![0, 1]).with_child("c");
        let rt = VariableRuntime::new(topo, TreeConfig::default()).unwrap();
        rt.child_index("z");
    }
}

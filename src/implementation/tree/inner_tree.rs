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

//! This module provides the goods tree of a variable having children in the
//! pseudo-tree. The tree branches on the separator variables (the variables
//! discovered most recently being closest to the root) and finally on the
//! owner's own variable. Each leaf stands for one complete assignment and
//! aggregates the local utility of that assignment with the goods reported
//! by the children for the compatible partial assignments.
//!
//! The same structure serves both protocols. When it is configured as
//! speculative, it accepts goods bearing on variables or values it has never
//! heard of. Until a variable is known to be complete, every node branching
//! on it reserves one dummy slot standing for all the values which have not
//! been seen yet.

use fxhash::FxHashMap;
use tracing::trace;

use crate::{Branch, Context, Domains, Error, Good, GoodsTree, InnerNode, LeafNode, LocalProblem,
    LocalSolution, Node, Objective, Registry, Result, SeparatorVariable, TreeConfig, TreeStats,
    UpperBoundSums, Utility, Value, VarId, MAX_CHILDREN};

/// Everything the tree knows about one of the children of its owner. What
/// the child reported lives in the leaves.
#[derive(Debug, Clone)]
pub(super) struct ChildInfo {
    pub(super) name: String,
    /// The variables the goods of this child bear on (in the order they are
    /// reported)
    pub(super) order: Vec<String>,
    /// The registry id of each variable in `order`
    pub(super) ids: Vec<VarId>,
    /// The order announced by the child for its upcoming compact goods
    pub(super) announced: Option<Vec<String>>,
    pub(super) done: bool,
    /// The outcome of the first `set_child_done` call for this child
    pub(super) infeasible: bool,
}
impl ChildInfo {
    fn new(name: String) -> Self {
        ChildInfo { name, order: vec![], ids: vec![], announced: None, done: false, infeasible: false }
    }
}

/// A good of one child, as it is recorded in each leaf it bears on
#[derive(Debug, Clone, Copy)]
struct Contribution<U> {
    child: usize,
    utility: U,
    confirmed: bool,
}

/// The leaves created while walking the tree
#[derive(Debug, Default)]
struct Created {
    leaves: usize,
    dummy_leaves: usize,
    /// True when the coverage counters must follow the new leaves
    counting: bool,
    /// The position (in `solutions`) of the local solution of each new leaf
    covered: Vec<usize>,
}

/// The goods tree of a variable having children
pub struct InnerNodeTree<V: Value, U: Utility> {
    pub(super) config: TreeConfig,
    pub(super) objective: Objective,
    pub(super) registry: Registry<V>,
    pub(super) problem: LocalProblem<V, U>,
    /// The registry id of each variable of the local problem
    pub(super) local_ids: Vec<VarId>,
    /// All the feasible local solutions, best first
    pub(super) solutions: Vec<LocalSolution<U>>,
    /// The position of each local solution in `solutions`
    pub(super) solution_pos: FxHashMap<Vec<usize>, usize>,
    pub(super) children: Vec<ChildInfo>,
    pub(super) table: UpperBoundSums<U>,
    pub(super) root: InnerNode<U>,
    /// The bound of every leaf must be computed again. Only an infeasible
    /// child bound requires it, because it changes the value of the leaves
    /// and not only their bound.
    pub(super) bounds_dirty: bool,
    /// The coverage counters must be counted again (the shape of the tree
    /// changed)
    pub(super) coverage_dirty: bool,
    /// The number of assignments of the non-local separator variables each
    /// local solution must be covered for. None while one of these variables
    /// is incomplete.
    pub(super) required: Option<usize>,
    /// The number of these assignments each local solution is covered for
    pub(super) cover: Vec<usize>,
    /// The position (in `solutions`) of the best local solution that is not
    /// fully covered by leaves
    pub(super) best_uncovered: Option<usize>,
    /// The path to the leaf of the last good returned by `get_amax`
    amax: Option<Vec<usize>>,
    sizes_changed: bool,
    stats: TreeStats,
    last_produced: Option<Good<V, U>>,
}

impl <V: Value, U: Utility> InnerNodeTree<V, U> {
    /// Creates the tree of the variable owning `problem` and having the given
    /// children (in the order children indices refer to).
    pub fn new(config: TreeConfig, problem: LocalProblem<V, U>, children: Vec<String>) -> Result<Self> {
        if children.len() > MAX_CHILDREN {
            return Err(Error::TooManyChildren {
                variable: problem.own_variable().to_string(),
                count: children.len(),
                max: MAX_CHILDREN,
            });
        }
        let vars = problem.variables().iter().zip(problem.domains().iter())
            .map(|(name, dom)| SeparatorVariable::new(name.clone(), dom.clone(), true, true))
            .collect::<Vec<_>>();
        let local_ids = (0..vars.len()).collect();
        let registry = Registry::new(vars);

        let solutions = problem.solutions();
        let solution_pos = solutions.iter().enumerate().map(|(i, s)| (s.index.clone(), i)).collect();

        let root = InnerNode::new(Branch::Real, registry.at_depth(0).branching());
        let table = UpperBoundSums::new(children.len());
        let children = children.into_iter().map(ChildInfo::new).collect();

        Ok(InnerNodeTree {
            objective: config.objective(),
            config,
            registry,
            problem,
            local_ids,
            solutions,
            solution_pos,
            children,
            table,
            root,
            bounds_dirty: false,
            coverage_dirty: true,
            required: None,
            cover: vec![],
            best_uncovered: None,
            amax: None,
            sizes_changed: false,
            stats: TreeStats::default(),
            last_produced: None,
        })
    }

    pub fn nb_children(&self) -> usize {
        self.children.len()
    }
    /// The name of the given child
    pub fn child_name(&self, child: usize) -> &str {
        &self.child(child).name
    }
    fn child(&self, child: usize) -> &ChildInfo {
        match self.children.get(child) {
            Some(info) => info,
            None => panic!("{} has no child number {}", self.own_variable(), child),
        }
    }
    fn var_id(&self, name: &str) -> VarId {
        match self.registry.id_of(name) {
            Some(id) => id,
            None => panic!("{} knows no variable named {}", self.own_variable(), name),
        }
    }
    pub(super) fn last_depth(&self) -> usize {
        self.registry.len() - 1
    }
    fn take_root(&mut self) -> InnerNode<U> {
        std::mem::replace(&mut self.root, InnerNode::new(Branch::Real, 0))
    }

    // ------------------------------------------------------------------------
    // --- KEYS ---------------------------------------------------------------
    // ------------------------------------------------------------------------
    /// The slot of each value of a good the given child reports
    fn key_of(&self, child: usize, values: &[V]) -> Vec<usize> {
        self.child(child).ids.iter().zip(values.iter())
            .map(|(id, value)| {
                let var = self.registry.get(*id);
                match var.index_of(value) {
                    Some(index) => index,
                    None => panic!("{:?} is not a known value of {}", value, var.name),
                }
            })
            .collect()
    }
    /// The index of the local solution along the given path
    pub(super) fn local_key(&self, path: &[usize]) -> Vec<usize> {
        self.local_ids.iter().map(|id| path[self.registry.depth_of(*id)]).collect()
    }
    fn local_utility(&self, path: &[usize]) -> U {
        if self.problem.is_empty() {
            U::zero()
        } else {
            self.problem.utility_by_index(&self.local_key(path))
        }
    }

    // ------------------------------------------------------------------------
    // --- LEAVES -------------------------------------------------------------
    // ------------------------------------------------------------------------
    /// The confirmed utility of the leaf plus the bounds of the children
    /// which did not confirm it
    pub(super) fn leaf_ub(&self, leaf: &LeafNode<U>) -> U {
        if self.objective.is_infeasible(leaf.confirmed_util) {
            return leaf.confirmed_util;
        }
        match self.table.sum(leaf.confirmed.missing(self.children.len())) {
            Some(sum) => leaf.confirmed_util.add(sum),
            None => self.objective.unbounded(),
        }
    }
    fn contribute(&self, leaf: &mut LeafNode<U>, contribution: Contribution<U>) {
        leaf.report(contribution.child, contribution.utility, contribution.confirmed);
        let ub = self.leaf_ub(leaf);
        leaf.ub = ub;
    }

    /// Walks down all the paths compatible with the `fixed` slots, records
    /// the contribution in the leaves found along the way and creates the
    /// missing ones. Every node visited gets its caches recomputed.
    #[allow(clippy::too_many_arguments)]
    fn walk(&self, node: &mut InnerNode<U>, depth: usize, fixed: &[Option<usize>], path: &mut Vec<usize>,
            in_dummy: bool, contribution: Contribution<U>, created: &mut Created)
    {
        let last = self.last_depth();
        let nb_children = self.children.len();
        let var = self.registry.at_depth(depth);
        let range = match fixed[depth] {
            Some(slot) => slot..slot + 1,
            None => 0..node.children.len(),
        };
        for slot in range {
            let dummy = var.is_dummy_slot(slot);
            let branch = if dummy { Branch::Dummy } else { Branch::Real };
            path.push(slot);
            if depth == last {
                match node.children[slot].as_deref_mut() {
                    Some(Node::Leaf(leaf)) => self.contribute(leaf, contribution),
                    Some(Node::Inner(_)) => {},
                    None => {
                        let local = self.local_utility(path);
                        if !self.objective.is_infeasible(local) {
                            let mut leaf = LeafNode::new(branch, local, nb_children);
                            self.contribute(&mut leaf, contribution);
                            node.children[slot] = Some(Box::new(Node::Leaf(leaf)));
                            created.leaves += 1;
                            if in_dummy || dummy {
                                created.dummy_leaves += 1;
                            } else if created.counting {
                                if let Some(pos) = self.solution_pos.get(&self.local_key(path)) {
                                    created.covered.push(*pos);
                                }
                            }
                        }
                    }
                }
            } else {
                let fresh = node.children[slot].is_none();
                if fresh {
                    let branching = self.registry.at_depth(depth + 1).branching();
                    node.children[slot] = Some(Box::new(Node::Inner(InnerNode::new(branch, branching))));
                }
                let mut empty = false;
                if let Some(Node::Inner(child)) = node.children[slot].as_deref_mut() {
                    if child.alive {
                        self.walk(child, depth + 1, fixed, path, in_dummy || dummy, contribution, created);
                    }
                    empty = child.nb_present() == 0;
                }
                if fresh && empty {
                    node.children[slot] = None;
                }
            }
            path.pop();
        }
        node.recompute(self.objective, nb_children);
    }

    /// Recomputes the bound of every leaf and the caches of every node
    fn rebuild_node(&self, node: &mut InnerNode<U>, depth: usize) {
        let last = self.last_depth();
        for child in node.children.iter_mut().flatten() {
            match child.as_mut() {
                Node::Leaf(leaf) => {
                    let ub = self.leaf_ub(leaf);
                    leaf.ub = ub;
                },
                Node::Inner(inner) if depth < last => self.rebuild_node(inner, depth + 1),
                Node::Inner(_) => {},
            }
        }
        node.recompute(self.objective, self.children.len());
    }

    /// Brings the bound cached by `node` up to date. The cached bounds of the
    /// leaves can only be too loose (the children bounds only get tighter),
    /// so it suffices to tighten the child holding the best bound until that
    /// child keeps it.
    fn refresh_ub(&self, node: &mut InnerNode<U>) {
        while let Some(best) = node.max_ub {
            let ub = match node.children[best].as_deref_mut() {
                Some(Node::Leaf(leaf)) => {
                    let ub = self.leaf_ub(leaf);
                    leaf.ub = ub;
                    Some(ub)
                },
                Some(Node::Inner(inner)) => {
                    self.refresh_ub(inner);
                    inner.ub
                },
                None => None,
            };
            if ub == node.ub {
                return;
            }
            node.recompute(self.objective, self.children.len());
        }
    }

    /// Brings the bound of the root and the local upper bound up to date
    pub(super) fn refresh(&mut self) {
        let mut root = self.take_root();
        if self.bounds_dirty {
            self.rebuild_node(&mut root, 0);
            self.bounds_dirty = false;
        }
        self.refresh_ub(&mut root);
        self.root = root;
        self.update_local_bound();
    }

    // ------------------------------------------------------------------------
    // --- LOCAL UPPER BOUND --------------------------------------------------
    // ------------------------------------------------------------------------
    /// True when the coverage counters are to be kept up to date as leaves
    /// get created and nodes killed
    fn counting(&self) -> bool {
        !self.coverage_dirty && self.required.is_some()
    }
    fn cover(&mut self, pos: usize) {
        if let Some(count) = self.cover.get_mut(pos) {
            *count += 1;
        }
    }
    /// Moves `best_uncovered` to the best local solution which is not yet
    /// covered by leaves for every assignment of the other separator
    /// variables. The counters only grow between two recounts, hence the
    /// position never moves back.
    fn update_local_bound(&mut self) {
        if self.coverage_dirty {
            self.recount_coverage();
            self.coverage_dirty = false;
        }
        if let (Some(required), Some(mut pos)) = (self.required, self.best_uncovered) {
            while pos < self.cover.len() && self.cover[pos] >= required {
                pos += 1;
            }
            self.best_uncovered = if pos < self.cover.len() { Some(pos) } else { None };
        }
    }
    /// Counts the coverage of every local solution from scratch. This only
    /// happens when the shape of the tree changes.
    pub(super) fn recount_coverage(&mut self) {
        let last = self.last_depth();
        let mut required = Some(1_usize);
        for depth in 0..last {
            let var = self.registry.at_depth(depth);
            if !var.local {
                required = match required {
                    Some(r) if var.is_complete() => Some(r.saturating_mul(var.domain.len())),
                    _ => None,
                };
            }
        }
        self.required = required;
        self.cover.clear();
        self.best_uncovered = if self.solutions.is_empty() { None } else { Some(0) };
        if required.is_some() && !self.solutions.is_empty() {
            let mut cover = vec![0; self.solutions.len()];
            let mut path = vec![];
            self.count_coverage(&self.root, 0, &mut path, &mut cover);
            self.cover = cover;
        }
    }
    /// Counts, for each local solution, the number of separator assignments
    /// for which it has been covered. A killed node covers all its values.
    pub(super) fn count_coverage(&self, node: &InnerNode<U>, depth: usize, path: &mut Vec<usize>, cover: &mut [usize]) {
        let last = self.last_depth();
        let var = self.registry.at_depth(depth);
        if depth == last {
            for slot in 0..var.domain.len() {
                let present = node.children.get(slot).map_or(false, |c| c.is_some());
                if node.killed || present {
                    path.push(slot);
                    if let Some(pos) = self.solution_pos.get(&self.local_key(path)) {
                        cover[*pos] += 1;
                    }
                    path.pop();
                }
            }
        } else {
            for (slot, child) in node.children.iter().enumerate() {
                if var.is_dummy_slot(slot) {
                    continue;
                }
                if let Some(Node::Inner(child)) = child.as_deref() {
                    path.push(slot);
                    self.count_coverage(child, depth + 1, path, cover);
                    path.pop();
                }
            }
        }
    }
    /// Whatever the children report for the best uncovered local solution,
    /// it cannot exceed its local utility plus the sum of the children bounds.
    pub(super) fn local_ub(&self) -> Option<U> {
        self.best_uncovered.map(|pos| match self.table.total() {
            Some(total) => self.solutions[pos].utility.add(total),
            None => self.objective.unbounded(),
        })
    }

    // ------------------------------------------------------------------------
    // --- GROWTH -------------------------------------------------------------
    // ------------------------------------------------------------------------
    /// Registers a variable never seen before and branches on it at the root.
    /// Each slot of the new root holds a copy of the former tree.
    fn insert_variable(&mut self, name: &str, domain: Option<&Vec<V>>) {
        let complete = domain.is_some();
        let var = SeparatorVariable::new(name.to_string(), domain.cloned().unwrap_or_default(), complete, false);
        let branching = var.branching();
        let dummy = if var.has_dummy() { Some(var.domain.len()) } else { None };
        self.registry.insert_front(var);

        let old = std::mem::replace(&mut self.root, InnerNode::new(Branch::Real, branching));
        for slot in 0..branching {
            let mut copy = old.clone();
            copy.branch = if Some(slot) == dummy { Branch::Dummy } else { Branch::Real };
            self.root.children[slot] = Some(Box::new(Node::Inner(copy)));
        }
        self.root.recompute(self.objective, self.children.len());
        self.sizes_changed = true;
        self.coverage_dirty = true;
        trace!(owner = self.own_variable(), variable = name, complete, "new separator variable");
    }

    /// Registers a value of the domain of a variable. When that value was
    /// unknown, every node branching on the variable gets a new slot holding
    /// a copy of its dummy child: what the children reported for the unseen
    /// values also holds for this one. Returns true iff the value was unknown.
    fn register_value(&mut self, id: VarId, value: &V) -> bool {
        let var = self.registry.get(id);
        if var.index_of(value).is_some() {
            return false;
        }
        if !var.has_dummy() {
            panic!("{:?} is not in the domain of {}", value, var.name);
        }
        let index = match self.registry.grow_domain(id, value) {
            Some(index) => index,
            None => return false,
        };
        let depth = self.registry.depth_of(id);
        let (objective, nb_children) = (self.objective, self.children.len());
        update_at_depth(&mut self.root, 0, depth, objective, nb_children, &mut |node: &mut InnerNode<U>| {
            let copy = node.children.get(index).cloned().flatten().map(|mut n| {
                n.set_branch(Branch::Real);
                n
            });
            node.children.insert(index, copy);
        });
        self.coverage_dirty = true;
        trace!(owner = self.own_variable(), variable = %self.registry.get(id).name, index, "dummy value made real");
        if self.registry.get(id).is_complete() {
            self.drop_dummies(id);
        }
        true
    }

    /// Records the final domain size of a variable. Returns true iff this
    /// changed anything.
    fn set_final_size(&mut self, id: VarId, size: usize) -> bool {
        let var = self.registry.get_mut(id);
        if var.is_complete() || var.final_size == Some(size) || size < var.domain.len() {
            return false;
        }
        var.final_size = Some(size);
        self.sizes_changed = true;
        if self.registry.get(id).is_complete() {
            self.drop_dummies(id);
        }
        true
    }

    /// Removes the dummy slot of every node branching on a complete variable
    fn drop_dummies(&mut self, id: VarId) {
        let depth = self.registry.depth_of(id);
        let branching = self.registry.get(id).branching();
        let (objective, nb_children) = (self.objective, self.children.len());
        update_at_depth(&mut self.root, 0, depth, objective, nb_children, &mut |node: &mut InnerNode<U>| {
            node.children.truncate(branching);
        });
        self.coverage_dirty = true;
        trace!(owner = self.own_variable(), variable = %self.registry.get(id).name, "domain complete");
    }

    /// Makes the goods of a child bear on the given variables. The leaves
    /// keep whatever the child reported before.
    fn rekey_child(&mut self, child: usize, variables: &[String]) {
        if self.child(child).order.as_slice() == variables {
            return;
        }
        let ids = variables.iter().map(|v| self.var_id(v)).collect();
        let info = &mut self.children[child];
        info.order = variables.to_vec();
        info.ids = ids;
    }

    // ------------------------------------------------------------------------
    // --- PATHS --------------------------------------------------------------
    // ------------------------------------------------------------------------
    /// The path to the leaf having the best utility
    fn util_path(&self) -> Option<Vec<usize>> {
        let last = self.last_depth();
        let mut path = Vec::with_capacity(last + 1);
        let mut node = &self.root;
        for depth in 0..=last {
            let slot = node.max_util?;
            path.push(slot);
            if depth < last {
                node = node.children[slot].as_deref()?.as_inner()?;
            }
        }
        Some(path)
    }
    fn leaf_at(&self, path: &[usize]) -> Option<&LeafNode<U>> {
        let last = self.last_depth();
        let mut node = &self.root;
        for slot in path.iter().take(last) {
            node = node.children[*slot].as_deref()?.as_inner()?;
        }
        node.children[path[last]].as_deref()?.as_leaf()
    }
    /// The first leaf compatible with the `fixed` slots
    fn first_leaf<'a>(&self, node: &'a InnerNode<U>, depth: usize, fixed: &[Option<usize>]) -> Option<&'a LeafNode<U>> {
        let range = match fixed[depth] {
            Some(slot) => slot..slot + 1,
            None => 0..node.children.len(),
        };
        for slot in range {
            match node.children.get(slot).and_then(|c| c.as_deref()) {
                Some(Node::Leaf(leaf)) => return Some(leaf),
                Some(Node::Inner(inner)) => {
                    if let Some(leaf) = self.first_leaf(inner, depth + 1, fixed) {
                        return Some(leaf);
                    }
                },
                None => {},
            }
        }
        None
    }
    /// The good made of the separator values along the given path
    fn separator_good(&self, path: &[usize], utility: U, confirmed: bool) -> Good<V, U> {
        let last = self.last_depth();
        let variables = (0..last).map(|d| self.registry.at_depth(d).name.clone()).collect();
        let values = (0..last).map(|d| self.registry.at_depth(d).domain[path[d]].clone()).collect();
        Good::with_status(variables, values, utility, confirmed)
    }
    /// Discards all the assignments of the own variable but the one of the
    /// given path, and makes sure they are never considered again.
    fn remove_path(&mut self, path: &[usize]) {
        let last = self.last_depth();
        let nb_children = self.children.len();
        let freed = remove_below(&mut self.root, 0, last, path, self.objective, nb_children);
        if self.counting() {
            let mut path = path.to_vec();
            for slot in freed {
                path[last] = slot;
                let pos = self.solution_pos.get(&self.local_key(&path)).copied();
                if let Some(pos) = pos {
                    self.cover(pos);
                }
            }
        }
    }
    /// The best bound on everything that is not yet known
    pub(super) fn total_ub(&self) -> Option<U> {
        let root_ub = if self.root.alive { self.root.ub } else { None };
        self.objective.best_of_opt(root_ub, self.local_ub())
    }
    fn is_hopeless(&self) -> bool {
        self.total_ub().map_or(true, |ub| self.objective.is_infeasible(ub))
    }
    fn kill_root(&mut self) {
        self.root.killed = true;
        self.root.alive = false;
        trace!(owner = self.own_variable(), "nothing feasible remains");
    }
    /// The speculative good of a variable whose separator only comprises
    /// local variables and which has no complete leaf yet.
    fn local_guess(&self) -> Option<Good<V, U>> {
        let last = self.last_depth();
        let all_local = (0..last).all(|d| self.registry.at_depth(d).local);
        if !all_local || self.children.iter().any(|c| c.done) {
            return None;
        }
        let solution = &self.solutions[self.best_uncovered?];
        let mut path = vec![0; last + 1];
        for (pos, id) in self.local_ids.iter().enumerate() {
            path[self.registry.depth_of(*id)] = solution.index[pos];
        }
        Some(self.separator_good(&path, solution.utility, false))
    }
    fn record(&mut self, good: &Good<V, U>) {
        if self.last_produced.as_ref() != Some(good) {
            self.stats.goods_produced += 1;
            if good.confirmed {
                self.stats.confirmed_goods += 1;
            } else {
                self.stats.speculative_goods += 1;
            }
            self.last_produced = Some(good.clone());
        }
    }

    /// Best-first search for the own value among the leaves compatible with
    /// the context. Complete leaves are preferred over partial ones.
    fn search(&self, node: &InnerNode<U>, depth: usize, slots: &[Option<usize>], best: &mut Option<(bool, U, usize)>) {
        let last = self.last_depth();
        let var = self.registry.at_depth(depth);
        let range = match slots[depth] {
            Some(slot) => slot..slot + 1,
            None => 0..var.domain.len(),
        };
        for slot in range {
            match node.children.get(slot).and_then(|c| c.as_deref()) {
                Some(Node::Leaf(leaf)) if depth == last => {
                    let nb = self.children.len();
                    let (complete, util) = match leaf.value(self.objective, nb) {
                        Some(value) => (true, value),
                        None => (false, leaf.util),
                    };
                    let improves = match best {
                        None => true,
                        Some((bc, bu, _)) => (complete && !*bc) || (complete == *bc && self.objective.better(util, *bu)),
                    };
                    if improves {
                        *best = Some((complete, util, slot));
                    }
                },
                Some(Node::Inner(child)) if depth < last => self.search(child, depth + 1, slots, best),
                _ => {},
            }
        }
    }
}

/// Applies `f` to every inner node at the `target` depth, then recomputes the
/// caches of these nodes and of all their ancestors
fn update_at_depth<U, F>(node: &mut InnerNode<U>, depth: usize, target: usize, objective: Objective, nb_children: usize, f: &mut F)
    where U: Utility, F: FnMut(&mut InnerNode<U>)
{
    if depth == target {
        f(node);
    } else {
        for child in node.children.iter_mut().flatten() {
            if let Node::Inner(inner) = &mut **child {
                update_at_depth(inner, depth + 1, target, objective, nb_children, f);
            }
        }
    }
    node.recompute(objective, nb_children);
}

/// Kills the node branching on the own variable along `path`, keeping only
/// the leaf at the end of the path. Returns the own-variable slots which had
/// no leaf until then.
fn remove_below<U: Utility>(node: &mut InnerNode<U>, depth: usize, last: usize, path: &[usize], objective: Objective, nb_children: usize) -> Vec<usize> {
    let freed = if depth == last {
        let freed = if node.killed {
            vec![]
        } else {
            (0..node.children.len())
                .filter(|slot| *slot != path[depth] && node.children[*slot].is_none())
                .collect()
        };
        for (slot, child) in node.children.iter_mut().enumerate() {
            if slot != path[depth] {
                *child = None;
            }
        }
        node.killed = true;
        freed
    } else if let Some(Node::Inner(child)) = node.children[path[depth]].as_deref_mut() {
        remove_below(child, depth + 1, last, path, objective, nb_children)
    } else {
        vec![]
    };
    node.recompute(objective, nb_children);
    freed
}

impl <V: Value, U: Utility> GoodsTree<V, U> for InnerNodeTree<V, U> {
    fn own_variable(&self) -> &str {
        self.problem.own_variable()
    }

    fn separator(&self) -> Vec<String> {
        let last = self.last_depth();
        (0..last).map(|d| self.registry.at_depth(d).name.clone()).collect()
    }

    fn add(&mut self, good: &Good<V, U>, sender: usize, domains: Option<&Domains<V>>) -> bool {
        self.child(sender);
        if self.config.speculative && self.ignore_good(good, sender) {
            trace!(owner = self.own_variable(), child = sender, "speculative good ignored");
            return false;
        }
        self.amax = None;

        let mut discovered = false;
        for var in good.variables.iter() {
            if self.registry.id_of(var).is_none() {
                self.insert_variable(var, domains.and_then(|d| d.get(var)));
                discovered = true;
            }
        }
        if let Some(domains) = domains {
            for (name, domain) in domains.iter() {
                if let Some(id) = self.registry.id_of(name) {
                    if !self.registry.get(id).is_complete() {
                        for value in domain.iter() {
                            self.register_value(id, value);
                        }
                        self.set_final_size(id, domain.len());
                    }
                }
            }
        }
        for (var, value) in good.variables.iter().zip(good.values.iter()) {
            let id = self.var_id(var);
            self.register_value(id, value);
        }

        self.rekey_child(sender, &good.variables);
        let key = self.key_of(sender, &good.values);
        if good.confirmed && !self.children[sender].done
            && self.table.tighten(sender, good.utility, self.objective)
            && self.objective.is_infeasible(good.utility)
        {
            self.bounds_dirty = true;
        }

        let mut fixed = vec![None; self.registry.len()];
        for (id, slot) in self.child(sender).ids.iter().zip(key.iter()) {
            fixed[self.registry.depth_of(*id)] = Some(*slot);
        }
        let contribution = Contribution { child: sender, utility: good.utility, confirmed: good.confirmed };
        let mut root = self.take_root();
        let mut created = Created { counting: self.counting(), ..Created::default() };
        if root.alive {
            let mut path = vec![];
            self.walk(&mut root, 0, &fixed, &mut path, false, contribution, &mut created);
        }
        self.root = root;
        for pos in created.covered {
            self.cover(pos);
        }
        if self.config.collect_stats {
            self.stats.leaves += created.leaves;
            self.stats.dummy_leaves += created.dummy_leaves;
        }
        if self.bounds_dirty {
            self.refresh();
        }
        discovered
    }

    fn get_amax(&mut self) -> Option<Good<V, U>> {
        self.amax = None;
        self.refresh();
        if !self.root.alive {
            return None;
        }
        if self.is_hopeless() {
            self.kill_root();
            return None;
        }
        let ub = self.total_ub();
        let util = match self.root.util {
            Some(util) => util,
            None if self.config.speculative => {
                let guess = self.local_guess();
                if let Some(good) = guess.as_ref() {
                    self.record(good);
                }
                return guess;
            },
            None => return None,
        };
        if self.objective.is_infeasible(util) {
            return None;
        }
        let path = self.util_path()?;
        let leaf_confirmed = self.leaf_at(&path)?.is_confirmed(self.children.len());
        let confirmed = leaf_confirmed && ub.map_or(true, |ub| !self.objective.better(ub, util));
        if !confirmed && !self.config.speculative {
            return None;
        }
        let good = self.separator_good(&path, util, confirmed);
        self.amax = Some(path);
        self.record(&good);
        Some(good)
    }

    fn remove_amax(&mut self) {
        if let Some(path) = self.amax.take() {
            self.remove_path(&path);
        }
    }

    fn is_valuation_sufficient(&mut self) -> bool {
        self.refresh();
        if self.is_hopeless() {
            return true;
        }
        let util = match self.root.util {
            Some(util) if self.root.alive => util,
            _ => return false,
        };
        let confirmed = self.util_path()
            .and_then(|path| self.leaf_at(&path).map(|l| l.is_confirmed(self.children.len())))
            .unwrap_or(false);
        confirmed && self.total_ub().map_or(true, |ub| !self.objective.better(ub, util))
    }

    fn has_more(&self) -> bool {
        self.root.alive && self.children.iter().any(|c| !c.done)
    }

    fn set_child_done(&mut self, child: usize) -> bool {
        if self.child(child).done {
            return self.children[child].infeasible;
        }
        self.children[child].done = true;
        self.table.tighten(child, self.objective.infeasible(), self.objective);
        self.bounds_dirty = true;
        self.refresh();
        let infeasible = self.is_hopeless();
        self.children[child].infeasible = infeasible;
        trace!(owner = self.own_variable(), child, infeasible, "child done");
        infeasible
    }

    fn best_assignment_for_own_variable(&self, context: &Context<V>) -> V {
        let last = self.last_depth();
        let slots = (0..=last)
            .map(|d| {
                let var = self.registry.at_depth(d);
                if d == last { None } else { context.get(&var.name).and_then(|v| var.index_of(v)) }
            })
            .collect::<Vec<_>>();
        let mut best = None;
        self.search(&self.root, 0, &slots, &mut best);
        let own = self.registry.at_depth(last);
        if let Some((_, _, slot)) = best {
            return own.domain[slot].clone();
        }
        if let Some(path) = self.util_path() {
            return own.domain[path[last]].clone();
        }
        own.domain[0].clone()
    }

    fn best_utility(&mut self) -> Option<U> {
        self.refresh();
        if self.is_hopeless() {
            return Some(self.objective.infeasible());
        }
        self.root.util
    }

    fn ignore_good(&self, good: &Good<V, U>, child: usize) -> bool {
        if good.confirmed || !self.config.speculative {
            return false;
        }
        let info = self.child(child);
        if info.order != good.variables {
            return false;
        }
        let mut fixed = vec![None; self.registry.len()];
        for (id, value) in info.ids.iter().zip(good.values.iter()) {
            match self.registry.get(*id).index_of(value) {
                Some(slot) => fixed[self.registry.depth_of(*id)] = Some(slot),
                None => return false,
            }
        }
        // the leaves of an assignment all learn a confirmation at once
        self.first_leaf(&self.root, 0, &fixed).map_or(false, |leaf| leaf.confirmed.contains(child))
    }

    fn child_values(&self, context: &Context<V>, child: usize) -> Context<V> {
        let own = self.own_variable();
        self.child(child).order.iter()
            .map(|v| v.as_str())
            .chain(std::iter::once(own))
            .filter_map(|v| context.get(v).map(|val| (v.to_string(), val.clone())))
            .collect()
    }

    fn set_children_separator(&mut self, child: usize, variables: &[String]) {
        self.child(child);
        self.children[child].announced = Some(variables.to_vec());
    }

    fn child_separator_reporting_order(&self, child: usize) -> Vec<String> {
        let info = self.child(child);
        info.announced.clone().unwrap_or_else(|| info.order.clone())
    }

    fn domains(&self) -> Vec<Vec<V>> {
        let last = self.last_depth();
        (0..last).map(|d| self.registry.at_depth(d).domain.clone()).collect()
    }

    fn final_domain_sizes(&self) -> Vec<Option<usize>> {
        let last = self.last_depth();
        (0..last).map(|d| self.registry.at_depth(d).final_size).collect()
    }

    fn set_final_domain_size(&mut self, variables: &[String], sizes: &[Option<usize>]) {
        for (var, size) in variables.iter().zip(sizes.iter()) {
            if let (Some(id), Some(size)) = (self.registry.id_of(var), size) {
                self.set_final_size(id, *size);
            }
        }
    }

    fn take_domain_size_update(&mut self) -> Option<Vec<Option<usize>>> {
        if self.sizes_changed {
            self.sizes_changed = false;
            Some(self.final_domain_sizes())
        } else {
            None
        }
    }

    fn not_enough_info(&self) -> bool {
        self.registry.len() <= 1
    }

    fn stats(&self) -> TreeStats {
        let mut stats = self.stats.clone();
        stats.space_size = (0..self.registry.len())
            .map(|d| self.registry.at_depth(d).domain.len() as f64)
            .product();
        stats.dummies = (0..self.registry.len())
            .filter(|d| self.registry.at_depth(*d).has_dummy())
            .count();
        stats
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

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

//! This module provides the registry of the variables a goods tree knows
//! about. Variables live in an arena and are addressed by a stable integer
//! id; the order in which they are branched on in the tree (their depth) is
//! an indirection on top of that arena. Discovering a new variable thus only
//! costs one insertion at the front of the order plus a remap of the depths.

use fxhash::FxHashMap;

use crate::Value;

/// The identifier of a variable in the registry
pub type VarId = usize;

/// What a tree knows about one of its variables
#[derive(Debug, Clone)]
pub struct SeparatorVariable<V: Value> {
    pub name: String,
    /// The known domain. It is append-only: the index of a value never
    /// changes once the value is known.
    pub domain: Vec<V>,
    /// The index of each known value
    pub pointers: FxHashMap<V, usize>,
    /// The final size of the domain (when known)
    pub final_size: Option<usize>,
    /// True iff the variable occurs in the local problem of the owner
    pub local: bool,
}
impl <V: Value> SeparatorVariable<V> {
    pub fn new(name: String, domain: Vec<V>, complete: bool, local: bool) -> Self {
        let pointers = domain.iter().cloned().enumerate().map(|(i, v)| (v, i)).collect();
        let final_size = if complete { Some(domain.len()) } else { None };
        SeparatorVariable { name, domain, pointers, final_size, local }
    }
    /// True iff every value of the domain is known
    pub fn is_complete(&self) -> bool {
        self.final_size == Some(self.domain.len())
    }
    /// True iff the nodes branching on this variable reserve a slot for the
    /// values that have not been seen yet
    pub fn has_dummy(&self) -> bool {
        !self.is_complete()
    }
    /// The number of slots of a node branching on this variable. When it
    /// exists, the dummy slot is the last one.
    pub fn branching(&self) -> usize {
        self.domain.len() + self.has_dummy() as usize
    }
    /// True iff `slot` is the dummy slot
    pub fn is_dummy_slot(&self, slot: usize) -> bool {
        slot == self.domain.len() && self.has_dummy()
    }
    pub fn index_of(&self, value: &V) -> Option<usize> {
        self.pointers.get(value).copied()
    }
}

/// The registry of all the variables of a goods tree
#[derive(Debug, Clone)]
pub struct Registry<V: Value> {
    vars: Vec<SeparatorVariable<V>>,
    by_name: FxHashMap<String, VarId>,
    /// depth -> variable
    order: Vec<VarId>,
    /// variable -> depth
    depth: Vec<usize>,
}

impl <V: Value> Registry<V> {
    /// Creates a registry whose variables are branched on in the given order
    pub fn new(vars: Vec<SeparatorVariable<V>>) -> Self {
        let by_name = vars.iter().enumerate().map(|(i, v)| (v.name.clone(), i)).collect();
        let order = (0..vars.len()).collect::<Vec<_>>();
        let depth = order.clone();
        Registry { vars, by_name, order, depth }
    }
    /// The number of variables (hence the depth of the leaves)
    pub fn len(&self) -> usize {
        self.order.len()
    }
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
    pub fn id_of(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }
    pub fn get(&self, id: VarId) -> &SeparatorVariable<V> {
        &self.vars[id]
    }
    pub fn get_mut(&mut self, id: VarId) -> &mut SeparatorVariable<V> {
        &mut self.vars[id]
    }
    pub fn at_depth(&self, depth: usize) -> &SeparatorVariable<V> {
        &self.vars[self.order[depth]]
    }
    pub fn id_at_depth(&self, depth: usize) -> VarId {
        self.order[depth]
    }
    pub fn depth_of(&self, id: VarId) -> usize {
        self.depth[id]
    }
    /// The variable ids in depth order
    pub fn order(&self) -> &[VarId] {
        &self.order
    }
    /// Registers a new variable and branches on it before all the others
    pub fn insert_front(&mut self, var: SeparatorVariable<V>) -> VarId {
        let id = self.vars.len();
        self.by_name.insert(var.name.clone(), id);
        self.vars.push(var);
        self.order.insert(0, id);
        self.depth.push(0);
        for (d, v) in self.order.iter().enumerate() {
            self.depth[*v] = d;
        }
        id
    }
    /// Registers a value in the domain of a variable. Returns the index of
    /// that value if it was not known so far.
    pub fn grow_domain(&mut self, id: VarId, value: &V) -> Option<usize> {
        let var = &mut self.vars[id];
        if var.pointers.contains_key(value) {
            return None;
        }
        let index = var.domain.len();
        var.domain.push(value.clone());
        var.pointers.insert(value.clone(), index);
        Some(index)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

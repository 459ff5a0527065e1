//! Strongly connected component of a loop dependence graph

use crate::features::dependence::DependenceEdge;
use crate::shared::models::{Function, InstId, SccId};
use rustc_hash::FxHashSet;

/// One SCC: a maximal set of mutually dependent loop instructions
#[derive(Debug, Clone)]
pub struct Scc {
    id: SccId,
    members: Vec<InstId>,
    member_set: FxHashSet<InstId>,
    internal_edges: Vec<DependenceEdge>,
}

impl Scc {
    pub(crate) fn new(id: SccId, members: Vec<InstId>) -> Self {
        let member_set = members.iter().copied().collect();
        Self {
            id,
            members,
            member_set,
            internal_edges: Vec::new(),
        }
    }

    pub(crate) fn push_internal(&mut self, edge: DependenceEdge) {
        self.internal_edges.push(edge);
    }

    pub fn id(&self) -> SccId {
        self.id
    }

    /// Members in program order
    pub fn members(&self) -> &[InstId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, inst: InstId) -> bool {
        self.member_set.contains(&inst)
    }

    /// Dependences between two members of this SCC
    pub fn internal_edges(&self) -> &[DependenceEdge] {
        &self.internal_edges
    }

    /// A single instruction without a self-dependence
    pub fn is_trivial(&self) -> bool {
        self.members.len() == 1 && self.internal_edges.is_empty()
    }

    /// Has a data or memory dependence from one iteration to the next
    pub fn has_loop_carried_value_dependence(&self) -> bool {
        self.internal_edges
            .iter()
            .any(|e| e.loop_carried && e.kind.carries_value())
    }

    /// PHI members
    pub fn phis<'f>(&'f self, func: &'f Function) -> impl Iterator<Item = InstId> + 'f {
        self.members
            .iter()
            .copied()
            .filter(move |&m| func.inst(m).map_or(false, |i| i.is_phi()))
    }
}

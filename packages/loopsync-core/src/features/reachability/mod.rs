//! Instruction-level reachability inside one loop
//!
//! The control-flow successor of an instruction is the next instruction of
//! its block, or the first instruction of every in-loop successor block for a
//! terminator. Back-edges to the header close an iteration and are followed
//! only in [`ReachMode::CrossIteration`].

use crate::errors::{LoopSyncError, Result};
use crate::features::loop_structure::LoopStructure;
use crate::shared::models::{Function, InstId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Which paths `can_reach` considers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachMode {
    /// Paths inside one iteration (back-edges excluded)
    #[default]
    IntraIteration,
    /// Paths that may wrap around into the next iteration
    CrossIteration,
}

/// Precomputed reachability table for one loop
#[derive(Debug, Clone)]
pub struct ReachabilityAnalysis {
    mode: ReachMode,
    /// Intra-iteration control flow, always without back-edges
    flow: DiGraph<InstId, ()>,
    node_map: FxHashMap<InstId, NodeIndex>,
    /// Non-empty-path successors per node, under `mode`
    reach: Vec<FxHashSet<InstId>>,
    start: Option<NodeIndex>,
    ends: Vec<NodeIndex>,
    program_order: Vec<InstId>,
}

impl ReachabilityAnalysis {
    pub fn compute(func: &Function, lp: &LoopStructure, mode: ReachMode) -> Result<Self> {
        let mut flow = DiGraph::with_capacity(lp.insts().len(), lp.insts().len());
        let mut node_map = FxHashMap::default();
        for &inst in lp.insts() {
            node_map.insert(inst, flow.add_node(inst));
        }

        let mut back_edges: Vec<(NodeIndex, NodeIndex)> = Vec::new();
        let mut ends = Vec::new();
        for &block_id in lp.blocks() {
            let block = func.expect_block(block_id)?;
            for pair in block.insts.windows(2) {
                flow.add_edge(node_map[&pair[0]], node_map[&pair[1]], ());
            }
            let Some(&last) = block.insts.last() else {
                continue;
            };
            let last = node_map[&last];
            let mut leaves_iteration = false;
            for &succ in &block.succs {
                if !lp.contains_block(succ) {
                    leaves_iteration = true;
                    continue;
                }
                let Some(&first) = func.expect_block(succ)?.insts.first() else {
                    continue;
                };
                let first = node_map[&first];
                if lp.is_back_edge(block_id, succ) {
                    leaves_iteration = true;
                    back_edges.push((last, first));
                } else {
                    flow.add_edge(last, first, ());
                }
            }
            if leaves_iteration {
                ends.push(last);
            }
        }

        let start = func
            .expect_block(lp.header())?
            .insts
            .first()
            .map(|inst| node_map[inst]);

        let mut walk = flow.clone();
        if mode == ReachMode::CrossIteration {
            for &(from, to) in &back_edges {
                walk.add_edge(from, to, ());
            }
        }
        let reach = walk
            .node_indices()
            .map(|node| {
                let mut seen = FxHashSet::default();
                let mut dfs = Dfs::empty(&walk);
                for succ in walk.neighbors(node) {
                    dfs.move_to(succ);
                    while let Some(n) = dfs.next(&walk) {
                        seen.insert(walk[n]);
                    }
                }
                seen
            })
            .collect();

        tracing::debug!(
            loop_id = %lp.id(),
            insts = flow.node_count(),
            back_edges = back_edges.len(),
            ?mode,
            "reachability computed"
        );
        Ok(Self {
            mode,
            flow,
            node_map,
            reach,
            start,
            ends,
            program_order: lp.insts().to_vec(),
        })
    }

    pub fn mode(&self) -> ReachMode {
        self.mode
    }

    /// Position of `inst` in loop program order
    pub fn program_position(&self, inst: InstId) -> Option<usize> {
        self.node_map.get(&inst).map(|node| node.index())
    }

    fn node(&self, inst: InstId) -> Result<NodeIndex> {
        self.node_map.get(&inst).copied().ok_or_else(|| {
            LoopSyncError::precondition(format!("{} is outside the analyzed loop", inst))
        })
    }

    /// Whether a non-empty path leads from `from` to `to`
    pub fn can_reach(&self, from: InstId, to: InstId) -> Result<bool> {
        let from = self.node(from)?;
        self.node(to)?;
        Ok(self.reach[from.index()].contains(&to))
    }

    /// Members of `set` reached from the iteration start without first
    /// passing through another member
    pub fn entry_instructions(&self, set: &[InstId]) -> Result<Vec<InstId>> {
        let members = self.members(set)?;
        Ok(self.frontier(self.start.into_iter().collect(), &members, Direction::Outgoing))
    }

    /// Members of `set` from which the iteration end is reached without
    /// passing through another member
    pub fn exit_instructions(&self, set: &[InstId]) -> Result<Vec<InstId>> {
        let members = self.members(set)?;
        Ok(self.frontier(self.ends.clone(), &members, Direction::Incoming))
    }

    fn members(&self, set: &[InstId]) -> Result<FxHashSet<InstId>> {
        set.iter()
            .map(|&inst| self.node(inst).map(|_| inst))
            .collect()
    }

    /// Breadth-first walk from `seeds` that stops at (and records) members
    fn frontier(
        &self,
        seeds: Vec<NodeIndex>,
        members: &FxHashSet<InstId>,
        dir: Direction,
    ) -> Vec<InstId> {
        let mut found = FxHashSet::default();
        let mut visited: FxHashSet<NodeIndex> = seeds.iter().copied().collect();
        let mut queue: VecDeque<NodeIndex> = seeds.into();
        while let Some(node) = queue.pop_front() {
            let inst = self.flow[node];
            if members.contains(&inst) {
                found.insert(inst);
                continue;
            }
            for next in self.flow.neighbors_directed(node, dir) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        self.program_order
            .iter()
            .copied()
            .filter(|inst| found.contains(inst))
            .collect()
    }
}

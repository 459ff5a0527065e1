//! Loop Dependence Graph
//!
//! Per-loop graph of data, memory and control dependences between the loop's
//! instructions, on top of petgraph:
//! - Nodes are loop instructions, added in program order
//! - Edges carry the dependence kind and whether they cross the back-edge
//!
//! Edges normally come from the dependence-analysis collaborator through
//! `add_dependence`. `with_def_use` seeds the graph with SSA def-use edges,
//! which is enough for register-only recurrences.

use crate::errors::{LoopSyncError, Result};
use crate::features::loop_structure::LoopStructure;
use crate::shared::models::{Function, InstId, LoopId, Opcode};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Dependence kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependenceKind {
    /// Register def-use
    Data,
    /// Through memory (RAW, WAR, WAW)
    Memory,
    /// Control dependence on a branch
    Control,
}

impl DependenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependenceKind::Data => "DATA",
            DependenceKind::Memory => "MEMORY",
            DependenceKind::Control => "CONTROL",
        }
    }

    /// Data and memory dependences carry values
    pub fn carries_value(&self) -> bool {
        matches!(self, DependenceKind::Data | DependenceKind::Memory)
    }
}

/// A dependence between two loop instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependenceEdge {
    pub from: InstId,
    pub to: InstId,
    pub kind: DependenceKind,
    /// Source executes in iteration i, destination in iteration i+1
    #[serde(default)]
    pub loop_carried: bool,
}

impl DependenceEdge {
    pub fn new(from: InstId, to: InstId, kind: DependenceKind) -> Self {
        Self {
            from,
            to,
            kind,
            loop_carried: false,
        }
    }

    pub fn data(from: InstId, to: InstId) -> Self {
        Self::new(from, to, DependenceKind::Data)
    }

    pub fn memory(from: InstId, to: InstId) -> Self {
        Self::new(from, to, DependenceKind::Memory)
    }

    pub fn control(from: InstId, to: InstId) -> Self {
        Self::new(from, to, DependenceKind::Control)
    }

    /// Mark the edge as crossing the back-edge
    pub fn carried(mut self) -> Self {
        self.loop_carried = true;
        self
    }
}

/// Dependence graph restricted to one loop
#[derive(Debug, Clone)]
pub struct DependenceGraph {
    loop_id: LoopId,
    graph: DiGraph<InstId, DependenceEdge>,
    node_map: FxHashMap<InstId, NodeIndex>,
}

impl DependenceGraph {
    /// Empty graph holding every loop instruction as a node
    pub fn new(lp: &LoopStructure) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = FxHashMap::default();
        for &inst in lp.insts() {
            let idx = graph.add_node(inst);
            node_map.insert(inst, idx);
        }
        Self {
            loop_id: lp.id(),
            graph,
            node_map,
        }
    }

    /// Graph seeded with the SSA def-use edges between loop instructions.
    ///
    /// A use by a header PHI through a latch incoming edge is loop-carried.
    pub fn with_def_use(func: &Function, lp: &LoopStructure) -> Result<Self> {
        let mut dg = Self::new(lp);
        for &user in lp.insts() {
            let inst = func.expect_inst(user)?;
            if inst.is_phi() && inst.block == lp.header() {
                for (incoming, operand) in inst.incoming() {
                    let Some(def) = operand.as_inst() else {
                        continue;
                    };
                    if !lp.contains_inst(def) {
                        continue;
                    }
                    let mut edge = DependenceEdge::data(def, user);
                    edge.loop_carried = lp.is_back_edge(incoming, lp.header());
                    dg.add_dependence(edge)?;
                }
                continue;
            }
            for def in inst.inst_operands() {
                if lp.contains_inst(def) {
                    dg.add_dependence(DependenceEdge::data(def, user))?;
                }
            }
        }
        Ok(dg)
    }

    /// Control dependences of the loop-exiting conditional branches.
    ///
    /// Each exiting branch decides whether the rest of the loop runs again:
    /// instructions before it in program order depend on it across the
    /// back-edge, instructions after it within the same iteration.
    /// Returns the number of edges added.
    pub fn add_exit_control_dependences(
        &mut self,
        func: &Function,
        lp: &LoopStructure,
    ) -> Result<usize> {
        let before = self.edge_count();
        for (pos, &branch) in lp.insts().iter().enumerate() {
            let inst = func.expect_inst(branch)?;
            if inst.opcode != Opcode::CondBr {
                continue;
            }
            let exits = func
                .expect_block(inst.block)?
                .succs
                .iter()
                .any(|succ| !lp.contains_block(*succ));
            if !exits {
                continue;
            }
            for (other_pos, &target) in lp.insts().iter().enumerate() {
                if target == branch {
                    continue;
                }
                let mut edge = DependenceEdge::control(branch, target);
                edge.loop_carried = other_pos < pos;
                self.add_dependence(edge)?;
            }
        }
        Ok(self.edge_count() - before)
    }

    pub fn loop_id(&self) -> LoopId {
        self.loop_id
    }

    /// Add a dependence; both endpoints must be loop instructions.
    /// Exact duplicates are ignored.
    pub fn add_dependence(&mut self, edge: DependenceEdge) -> Result<()> {
        let from = self.index_of(edge.from)?;
        let to = self.index_of(edge.to)?;
        let duplicate = self
            .graph
            .edges_connecting(from, to)
            .any(|e| e.weight() == &edge);
        if !duplicate {
            self.graph.add_edge(from, to, edge);
        }
        Ok(())
    }

    fn index_of(&self, inst: InstId) -> Result<NodeIndex> {
        self.node_map.get(&inst).copied().ok_or_else(|| {
            LoopSyncError::precondition(format!(
                "{} is outside {} and cannot carry a dependence",
                inst, self.loop_id
            ))
        })
    }

    pub fn contains(&self, inst: InstId) -> bool {
        self.node_map.contains_key(&inst)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Loop instructions in program order
    pub fn insts(&self) -> impl Iterator<Item = InstId> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependenceEdge> + '_ {
        self.graph.edge_weights()
    }

    /// Dependences whose source is `inst`
    pub fn outgoing(&self, inst: InstId) -> Vec<&DependenceEdge> {
        self.directed(inst, Direction::Outgoing)
    }

    /// Dependences whose destination is `inst`
    pub fn incoming(&self, inst: InstId) -> Vec<&DependenceEdge> {
        self.directed(inst, Direction::Incoming)
    }

    fn directed(&self, inst: InstId, dir: Direction) -> Vec<&DependenceEdge> {
        let Some(&idx) = self.node_map.get(&inst) else {
            return Vec::new();
        };
        let mut edges: Vec<&DependenceEdge> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| e.weight())
            .collect();
        // petgraph walks adjacency lists newest-first
        edges.reverse();
        edges
    }

    /// Strongly connected components (Tarjan), trivial singletons included.
    ///
    /// Members are sorted in program order and components are ordered by
    /// their first member, so the result is independent of edge insertion
    /// order.
    pub fn strongly_connected_components(&self) -> Vec<Vec<InstId>> {
        let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph);
        for component in &mut components {
            component.sort();
        }
        components.sort_by_key(|c| c.first().copied());
        components
            .into_iter()
            .map(|c| c.into_iter().map(|idx| self.graph[idx]).collect())
            .collect()
    }
}

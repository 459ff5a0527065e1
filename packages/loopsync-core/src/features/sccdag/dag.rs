//! SCCDAG construction and queries

use super::scc::Scc;
use crate::errors::{ConsistencyViolation, LoopSyncError, Result};
use crate::features::dependence::{DependenceEdge, DependenceGraph};
use crate::shared::models::{InstId, LoopId, SccId};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Deduplicated edge between two distinct SCCs
#[derive(Debug, Clone)]
pub struct SccDagEdge {
    pub from: SccId,
    pub to: SccId,
    /// Underlying dependences summarized by this edge
    pub dependences: Vec<DependenceEdge>,
}

/// Condensation of a loop dependence graph
///
/// `SccId(k)` is node `k` of the petgraph graph and position `k` of the SCC
/// table. Ids follow discovery order: SCCs are numbered by their first
/// member in program order.
#[derive(Debug, Clone)]
pub struct SccDag {
    loop_id: LoopId,
    graph: DiGraph<SccId, SccDagEdge>,
    sccs: Vec<Scc>,
    inst_to_scc: FxHashMap<InstId, SccId>,
}

impl SccDag {
    /// Condense a dependence graph
    pub fn build(dg: &DependenceGraph) -> Result<Self> {
        let components = dg.strongly_connected_components();

        let mut graph = DiGraph::with_capacity(components.len(), 0);
        let mut sccs = Vec::with_capacity(components.len());
        let mut inst_to_scc = FxHashMap::default();
        for (pos, members) in components.into_iter().enumerate() {
            let id = SccId::from_index(pos);
            graph.add_node(id);
            for &inst in &members {
                inst_to_scc.insert(inst, id);
            }
            sccs.push(Scc::new(id, members));
        }

        let mut cut_edges: FxHashMap<(SccId, SccId), Vec<DependenceEdge>> = FxHashMap::default();
        let mut cut_order: Vec<(SccId, SccId)> = Vec::new();
        for edge in dg.edges() {
            let (Some(&from), Some(&to)) = (inst_to_scc.get(&edge.from), inst_to_scc.get(&edge.to))
            else {
                return Err(LoopSyncError::precondition(format!(
                    "dependence {} -> {} references an instruction outside {}",
                    edge.from,
                    edge.to,
                    dg.loop_id()
                )));
            };
            if from == to {
                sccs[from.index()].push_internal(*edge);
            } else {
                let bucket = cut_edges.entry((from, to)).or_default();
                if bucket.is_empty() {
                    cut_order.push((from, to));
                }
                bucket.push(*edge);
            }
        }
        cut_order.sort();
        for key in cut_order {
            let dependences = cut_edges.remove(&key).unwrap_or_default();
            graph.add_edge(
                NodeIndex::new(key.0.index()),
                NodeIndex::new(key.1.index()),
                SccDagEdge {
                    from: key.0,
                    to: key.1,
                    dependences,
                },
            );
        }

        let dag = Self {
            loop_id: dg.loop_id(),
            graph,
            sccs,
            inst_to_scc,
        };
        if let Err(cycle) = toposort(&dag.graph, None) {
            return Err(ConsistencyViolation::CyclicSccDag {
                scc: dag.graph[cycle.node_id()],
            }
            .into());
        }

        tracing::debug!(
            loop_id = %dag.loop_id,
            nodes = dag.sccs.len(),
            edges = dag.graph.edge_count(),
            "sccdag built"
        );
        Ok(dag)
    }

    pub fn loop_id(&self) -> LoopId {
        self.loop_id
    }

    pub fn len(&self) -> usize {
        self.sccs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sccs.is_empty()
    }

    /// All nodes in id order
    pub fn nodes(&self) -> &[Scc] {
        &self.sccs
    }

    pub fn scc(&self, id: SccId) -> Option<&Scc> {
        self.sccs.get(id.index())
    }

    pub fn expect_scc(&self, id: SccId) -> Result<&Scc> {
        self.scc(id).ok_or_else(|| {
            LoopSyncError::precondition(format!("{} is not a node of the {} SCCDAG", id, self.loop_id))
        })
    }

    /// SCC holding `inst`
    pub fn scc_of(&self, inst: InstId) -> Option<SccId> {
        self.inst_to_scc.get(&inst).copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = &SccDagEdge> + '_ {
        self.graph.edge_weights()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn successors(&self, id: SccId) -> Vec<SccId> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: SccId) -> Vec<SccId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: SccId, dir: Direction) -> Vec<SccId> {
        if id.index() >= self.sccs.len() {
            return Vec::new();
        }
        let mut out: Vec<SccId> = self
            .graph
            .neighbors_directed(NodeIndex::new(id.index()), dir)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Cut dependences leaving `id`
    pub fn outgoing_dependences(&self, id: SccId) -> Vec<&DependenceEdge> {
        self.cut_dependences(id, Direction::Outgoing)
    }

    /// Cut dependences entering `id`
    pub fn incoming_dependences(&self, id: SccId) -> Vec<&DependenceEdge> {
        self.cut_dependences(id, Direction::Incoming)
    }

    fn cut_dependences(&self, id: SccId, dir: Direction) -> Vec<&DependenceEdge> {
        if id.index() >= self.sccs.len() {
            return Vec::new();
        }
        let mut edges: Vec<&SccDagEdge> = self
            .graph
            .edges_directed(NodeIndex::new(id.index()), dir)
            .map(|e| e.weight())
            .collect();
        edges.sort_by_key(|e| (e.from, e.to));
        edges.into_iter().flat_map(|e| e.dependences.iter()).collect()
    }

    /// Nodes without incoming edges, in id order
    pub fn top_level_nodes(&self) -> Vec<SccId> {
        self.sccs
            .iter()
            .map(Scc::id)
            .filter(|&id| {
                self.graph
                    .neighbors_directed(NodeIndex::new(id.index()), Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Kahn topological order; ready nodes are taken in discovery (id) order
    pub fn topological_order(&self) -> Vec<SccId> {
        let mut in_degree: Vec<usize> = (0..self.sccs.len())
            .map(|i| {
                self.graph
                    .edges_directed(NodeIndex::new(i), Direction::Incoming)
                    .count()
            })
            .collect();
        let mut ready: BinaryHeap<Reverse<SccId>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| Reverse(SccId::from_index(i)))
            .collect();

        let mut order = Vec::with_capacity(self.sccs.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for edge in self
                .graph
                .edges_directed(NodeIndex::new(id.index()), Direction::Outgoing)
            {
                let succ = edge.target().index();
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(Reverse(SccId::from_index(succ)));
                }
            }
        }
        order
    }

    /// Longest-path depth of every node from the top-level nodes, by id
    pub fn depths(&self) -> Vec<usize> {
        let mut depth = vec![0usize; self.sccs.len()];
        for id in self.topological_order() {
            for succ in self.successors(id) {
                depth[succ.index()] = depth[succ.index()].max(depth[id.index()] + 1);
            }
        }
        depth
    }

    /// SCCs touched by a loop-carried data or memory dependence, either
    /// internally or as an endpoint of a cut edge
    pub fn loop_carried_sccs(&self) -> FxHashSet<SccId> {
        let mut carried: FxHashSet<SccId> = self
            .sccs
            .iter()
            .filter(|s| s.has_loop_carried_value_dependence())
            .map(Scc::id)
            .collect();
        for edge in self.graph.edge_weights() {
            if edge
                .dependences
                .iter()
                .any(|d| d.loop_carried && d.kind.carries_value())
            {
                carried.insert(edge.from);
                carried.insert(edge.to);
            }
        }
        carried
    }

    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }
}

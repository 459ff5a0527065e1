//! Sequential segment domain types

use crate::errors::Result;
use crate::features::dependence::DependenceGraph;
use crate::features::loop_structure::LoopStructure;
use crate::features::partitioner::Partition;
use crate::features::scc_attributes::SccClassification;
use crate::shared::models::{Function, InstId, LoopId, SccId, SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Loop-body region that replicas execute in original iteration order.
///
/// Every replica acquires segments in ascending `id` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialSegment {
    pub id: SegmentId,
    /// Index of the guarded partition set
    pub partition_index: usize,
    /// Cloned instructions of the set, program order
    pub instructions: Vec<InstId>,
    /// Where the segment must be acquired
    pub entries: Vec<InstId>,
    /// Where the segment must be released
    pub exits: Vec<InstId>,
}

impl SequentialSegment {
    pub fn contains(&self, inst: InstId) -> bool {
        self.instructions.contains(&inst)
    }
}

/// How reducible accumulators are treated by the decision rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduciblePolicy {
    /// Replicas keep private partial results; no segment
    #[default]
    Parallel,
    /// Reducible SCCs are ordered like sequential ones
    Sequential,
}

/// Original instruction -> clone(s) in the task body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMap {
    clones: BTreeMap<InstId, Vec<InstId>>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every instruction of `func` to itself
    pub fn identity(func: &Function) -> Self {
        Self {
            clones: func.insts().iter().map(|i| (i.id, vec![i.id])).collect(),
        }
    }

    /// Record one more clone of `original`
    pub fn insert(&mut self, original: InstId, clone: InstId) {
        let entry = self.clones.entry(original).or_default();
        if !entry.contains(&clone) {
            entry.push(clone);
        }
    }

    pub fn with(mut self, original: InstId, clone: InstId) -> Self {
        self.insert(original, clone);
        self
    }

    /// Clones in insertion order
    pub fn clones_of(&self, original: InstId) -> &[InstId] {
        self.clones.get(&original).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.clones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }
}

/// Owned analysis inputs of one loop
#[derive(Debug, Clone)]
pub struct LoopAnalysis {
    pub function: Function,
    pub structure: LoopStructure,
    pub dependences: DependenceGraph,
}

impl LoopAnalysis {
    /// Loop with its SSA def-use dependences
    pub fn with_def_use(function: Function, structure: LoopStructure) -> Result<Self> {
        let dependences = DependenceGraph::with_def_use(&function, &structure)?;
        Ok(Self {
            function,
            structure,
            dependences,
        })
    }

    pub fn view(&self) -> LoopView<'_> {
        LoopView {
            func: &self.function,
            lp: &self.structure,
            dg: &self.dependences,
        }
    }
}

/// Borrowed analysis inputs of one loop
#[derive(Debug, Clone, Copy)]
pub struct LoopView<'a> {
    pub func: &'a Function,
    pub lp: &'a LoopStructure,
    pub dg: &'a DependenceGraph,
}

impl LoopView<'_> {
    pub fn loop_id(&self) -> LoopId {
        self.lp.id()
    }
}

/// Everything one synthesis attempt produced
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub loop_id: LoopId,
    pub segments: Vec<SequentialSegment>,
    /// Partition of the cloned SCCDAG
    pub partition: Partition,
    /// Tags of the original SCCDAG
    pub classification: SccClassification,
    /// Original SCC index -> cloned SCC
    pub scc_map: Vec<SccId>,
    /// Unique top-level node of the cloned SCCDAG
    pub preamble: Option<SccId>,
    /// Cloned SCCs touched by a loop-carried data or memory dependence
    pub loop_carried: Vec<SccId>,
    pub iv_governed: bool,
}

impl SynthesisReport {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segment guarding `inst` in the cloned body
    pub fn segment_of(&self, inst: InstId) -> Option<&SequentialSegment> {
        self.segments.iter().find(|s| s.contains(inst))
    }
}

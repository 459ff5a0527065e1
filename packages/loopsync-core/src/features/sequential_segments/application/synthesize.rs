//! Sequential Segment Synthesis Use Case
//!
//! ## Algorithm
//! 1. Map every original SCC to exactly one cloned SCC through the
//!    correlation map
//! 2. Partition the cloned SCCDAG and compute reachability on the cloned loop
//! 3. Check that the cloned SCCDAG has a single preamble node
//! 4. Classify the original SCCDAG and carry the tags to the cloned SCCs
//! 5. Collect the cloned SCCs touched by loop-carried data/memory dependences
//! 6. Decide per partition set and allocate segments in set order
//!
//! A set needs a segment when one of its SCCs is still sequential after the
//! exemptions in [`requires_synchronization`].

use crate::config::LoopSyncConfig;
use crate::errors::{ConsistencyViolation, Result};
use crate::features::partitioner::{partition, Partition};
use crate::features::reachability::ReachabilityAnalysis;
use crate::features::scc_attributes::{
    ClassifierContext, InductionFactsPort, SccAttributes, SccClassification, SccClassifier,
};
use crate::features::sccdag::SccDag;
use crate::features::sequential_segments::domain::{
    CorrelationMap, LoopView, ReduciblePolicy, SequentialSegment, SynthesisReport,
};
use crate::features::sequential_segments::infrastructure::dump_sccdags;
use crate::shared::models::{InstId, SccId, SegmentId};
use rustc_hash::FxHashSet;

/// Inputs of the per-set decision and allocation step
pub struct SegmentInputs<'a> {
    pub cloned_dag: &'a SccDag,
    pub reach: &'a ReachabilityAnalysis,
    pub partition: &'a Partition,
    /// Tags of the original SCCDAG, by original SCC id
    pub classification: &'a SccClassification,
    /// Original SCC index -> cloned SCC
    pub scc_map: &'a [SccId],
    /// Cloned SCCs touched by a loop-carried data or memory dependence
    pub loop_carried: &'a FxHashSet<SccId>,
    /// Whether the original loop's trip count is known before entry
    pub iv_governed: bool,
    pub policy: ReduciblePolicy,
}

/// Whether an SCC with `tag` forces its partition set into a segment
pub fn requires_synchronization(
    tag: &SccAttributes,
    loop_carried: bool,
    iv_governed: bool,
    policy: ReduciblePolicy,
) -> bool {
    if tag.is_induction_variable() {
        return false;
    }
    if iv_governed && !loop_carried {
        return false;
    }
    match tag {
        SccAttributes::InductionVariable { .. } | SccAttributes::PeriodicVariable { .. } => false,
        SccAttributes::ReducibleAccumulator { .. } => policy == ReduciblePolicy::Sequential,
        SccAttributes::ControlOnly => loop_carried,
        SccAttributes::Sequential => true,
    }
}

/// Decide every partition set and allocate segments, ids in set order
pub fn synthesize(inputs: &SegmentInputs<'_>) -> Result<Vec<SequentialSegment>> {
    // cloned SCC -> original SCCs mapped onto it
    let mut originals: Vec<Vec<SccId>> = vec![Vec::new(); inputs.cloned_dag.len()];
    for (original, cloned) in inputs.scc_map.iter().enumerate() {
        if let Some(slot) = originals.get_mut(cloned.index()) {
            slot.push(SccId::from_index(original));
        }
    }

    let mut segments = Vec::new();
    for (set_index, set) in inputs.partition.sets().iter().enumerate() {
        let mut forcing: Option<SccId> = None;
        let mut reducible: Option<SccId> = None;
        for &cloned in set {
            let carried = inputs.loop_carried.contains(&cloned);
            let mapped = originals.get(cloned.index()).map_or(&[][..], Vec::as_slice);
            if mapped.is_empty() {
                return Err(ConsistencyViolation::UnmappedTaskScc { scc: cloned }.into());
            }
            for &original in mapped {
                let tag = inputs.classification.expect(original)?;
                if matches!(tag, SccAttributes::ReducibleAccumulator { .. }) {
                    reducible.get_or_insert(cloned);
                }
                if forcing.is_none()
                    && requires_synchronization(tag, carried, inputs.iv_governed, inputs.policy)
                {
                    forcing = Some(cloned);
                }
            }
        }

        let Some(cause) = forcing else {
            tracing::debug!(set = set_index, sccs = set.len(), "partition set runs in parallel");
            continue;
        };
        if let Some(scc) = reducible {
            if inputs.policy == ReduciblePolicy::Parallel {
                tracing::warn!(
                    set = set_index,
                    reducible = %scc,
                    "reducible scc shares a partition set with a sequential segment"
                );
            }
        }

        let mut instructions = Vec::new();
        for &cloned in set {
            instructions.extend_from_slice(inputs.cloned_dag.expect_scc(cloned)?.members());
        }
        let instructions = program_ordered(instructions, inputs.reach);
        let entries = inputs.reach.entry_instructions(&instructions)?;
        let exits = inputs.reach.exit_instructions(&instructions)?;

        let id = SegmentId::from_index(segments.len());
        tracing::debug!(
            segment = %id,
            set = set_index,
            cause = %cause,
            insts = instructions.len(),
            entries = entries.len(),
            exits = exits.len(),
            "sequential segment allocated"
        );
        segments.push(SequentialSegment {
            id,
            partition_index: set_index,
            instructions,
            entries,
            exits,
        });
    }
    Ok(segments)
}

fn program_ordered(mut insts: Vec<InstId>, reach: &ReachabilityAnalysis) -> Vec<InstId> {
    insts.sort_by_key(|inst| reach.program_position(*inst));
    insts
}

/// Driver: builds the intermediate artifacts and runs [`synthesize`]
#[derive(Debug, Clone, Default)]
pub struct SequentialSegmentSynthesizer {
    config: LoopSyncConfig,
    classifier: SccClassifier,
}

impl SequentialSegmentSynthesizer {
    pub fn new(config: LoopSyncConfig) -> Result<Self> {
        config.validate()?;
        let classifier = SccClassifier::new(config.classifier.clone());
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &LoopSyncConfig {
        &self.config
    }

    /// Identify the sequential segments of `cloned`, the task body of
    /// `original`
    pub fn identify(
        &self,
        original: LoopView<'_>,
        cloned: LoopView<'_>,
        correlation: &CorrelationMap,
        facts: &dyn InductionFactsPort,
    ) -> Result<SynthesisReport> {
        let original_dag = SccDag::build(original.dg)?;
        let cloned_dag = SccDag::build(cloned.dg)?;
        tracing::info!(
            loop_id = %original.loop_id(),
            original_sccs = original_dag.len(),
            task_sccs = cloned_dag.len(),
            "identifying sequential segments"
        );

        if let Some(dir) = &self.config.segments.dump_dir {
            dump_sccdags(
                dir,
                cloned.loop_id(),
                (&original_dag, original.func),
                (&cloned_dag, cloned.func),
            );
        }

        let scc_map = map_sccs(&original_dag, &cloned_dag, cloned, correlation)?;

        let partition = partition(&cloned_dag, self.config.partition.target_granularity)?;
        let reach =
            ReachabilityAnalysis::compute(cloned.func, cloned.lp, self.config.reachability.mode)?;

        let top_level = cloned_dag.top_level_nodes();
        if self.config.segments.require_single_preamble && top_level.len() != 1 {
            return Err(ConsistencyViolation::MultiplePreambles {
                count: top_level.len(),
            }
            .into());
        }
        let preamble = top_level.first().copied();

        let classification = self.classifier.classify_all(&ClassifierContext {
            func: original.func,
            lp: original.lp,
            dag: &original_dag,
            facts,
        })?;
        let iv_governed = facts.is_iv_governed();

        let loop_carried = cloned_dag.loop_carried_sccs();

        let segments = synthesize(&SegmentInputs {
            cloned_dag: &cloned_dag,
            reach: &reach,
            partition: &partition,
            classification: &classification,
            scc_map: &scc_map,
            loop_carried: &loop_carried,
            iv_governed,
            policy: self.config.segments.reducible_policy,
        })?;

        tracing::info!(
            loop_id = %cloned.loop_id(),
            sets = partition.len(),
            segments = segments.len(),
            iv_governed,
            "sequential segments identified"
        );

        let mut loop_carried: Vec<SccId> = loop_carried.into_iter().collect();
        loop_carried.sort();
        Ok(SynthesisReport {
            loop_id: cloned.loop_id(),
            segments,
            partition,
            classification,
            scc_map,
            preamble,
            loop_carried,
            iv_governed,
        })
    }
}

/// Original SCC index -> the single cloned SCC holding every in-loop clone
/// of its members
fn map_sccs(
    original_dag: &SccDag,
    cloned_dag: &SccDag,
    cloned: LoopView<'_>,
    correlation: &CorrelationMap,
) -> Result<Vec<SccId>> {
    original_dag
        .nodes()
        .iter()
        .map(|scc| -> Result<SccId> {
            let mut candidates: Vec<SccId> = Vec::new();
            for &member in scc.members() {
                // spilled loop-carried PHIs also map to clones outside the loop
                for &clone in correlation.clones_of(member) {
                    if !cloned.lp.contains_inst(clone) {
                        continue;
                    }
                    let target = cloned_dag
                        .scc_of(clone)
                        .ok_or(ConsistencyViolation::OrphanInstruction { inst: clone })?;
                    if !candidates.contains(&target) {
                        candidates.push(target);
                    }
                }
            }
            candidates.sort();
            match candidates.as_slice() {
                [single] => Ok(*single),
                [] => Err(ConsistencyViolation::UnmappedScc { scc: scc.id() }.into()),
                _ => Err(ConsistencyViolation::AmbiguousScc {
                    scc: scc.id(),
                    candidates,
                }
                .into()),
            }
        })
        .collect()
}

//! Per-loop planning with sequential fallback
//!
//! A failed analysis invariant abandons parallelization of that loop only;
//! other loops are planned independently.

use super::synthesize::SequentialSegmentSynthesizer;
use crate::features::scc_attributes::InductionFactsPort;
use crate::features::sequential_segments::domain::{CorrelationMap, LoopView, SequentialSegment};
use crate::shared::models::LoopId;
use serde::Serialize;

/// One loop to plan
#[derive(Clone, Copy)]
pub struct LoopJob<'a> {
    pub original: LoopView<'a>,
    pub cloned: LoopView<'a>,
    pub correlation: &'a CorrelationMap,
    pub facts: &'a dyn InductionFactsPort,
}

impl LoopJob<'_> {
    pub fn loop_id(&self) -> LoopId {
        self.original.loop_id()
    }
}

/// Outcome of planning one loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum LoopPlan {
    /// Run replicas concurrently, ordering only these segments
    Parallel { segments: Vec<SequentialSegment> },
    /// Keep the loop sequential
    Sequential { reason: String },
}

impl LoopPlan {
    pub fn is_parallel(&self) -> bool {
        matches!(self, LoopPlan::Parallel { .. })
    }

    pub fn segments(&self) -> &[SequentialSegment] {
        match self {
            LoopPlan::Parallel { segments } => segments,
            LoopPlan::Sequential { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoopPlanner {
    synthesizer: SequentialSegmentSynthesizer,
}

impl LoopPlanner {
    pub fn new(synthesizer: SequentialSegmentSynthesizer) -> Self {
        Self { synthesizer }
    }

    pub fn plan(&self, job: LoopJob<'_>) -> LoopPlan {
        match self
            .synthesizer
            .identify(job.original, job.cloned, job.correlation, job.facts)
        {
            Ok(report) => LoopPlan::Parallel {
                segments: report.segments,
            },
            Err(e) => {
                if e.aborts_loop_only() {
                    tracing::warn!(loop_id = %job.loop_id(), error = %e, "leaving loop sequential");
                } else {
                    tracing::error!(loop_id = %job.loop_id(), error = %e, "loop analysis failed");
                }
                LoopPlan::Sequential {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Plan every loop independently
    pub fn plan_all<'a>(
        &self,
        jobs: impl IntoIterator<Item = LoopJob<'a>>,
    ) -> Vec<(LoopId, LoopPlan)> {
        let plans: Vec<(LoopId, LoopPlan)> = jobs
            .into_iter()
            .map(|job| (job.loop_id(), self.plan(job)))
            .collect();
        let parallel = plans.iter().filter(|(_, p)| p.is_parallel()).count();
        tracing::info!(loops = plans.len(), parallel, "loop planning complete");
        plans
    }
}

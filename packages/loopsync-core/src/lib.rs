/*
 * loopsync-core - Sequential Segment Synthesis for Parallelized Loops
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : IR model (functions, blocks, instructions, handles)
 * - features/    : Vertical slices (loop → dependence → sccdag → attributes →
 *                  partitioner → reachability → sequential segments)
 * - config/      : Presets and stage configuration (YAML)
 *
 * Given an original loop and the cloned body run by every replica, decides
 * which groups of mutually dependent instructions must execute in original
 * iteration order and where those regions start and end.
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Analysis entry points take many inputs
#![allow(clippy::type_complexity)] // Handle-keyed tables
#![allow(clippy::unnecessary_map_or)] // map_or style for compatibility
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::should_implement_trait)] // from_str naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (analysis stages)
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{LoopSyncConfig, Preset};
pub use errors::{ConsistencyViolation, LoopSyncError, Result};
pub use features::dependence::{DependenceEdge, DependenceGraph, DependenceKind};
pub use features::loop_structure::LoopStructure;
pub use features::partitioner::{partition, Partition};
pub use features::reachability::{ReachMode, ReachabilityAnalysis};
pub use features::scc_attributes::{
    InductionFacts, InductionFactsPort, SccAttributes, SccClassification, SccClassifier,
};
pub use features::sccdag::{Scc, SccDag};
pub use features::sequencer::{SegmentGuard, SegmentSequencer};
pub use features::sequential_segments::{
    CorrelationMap, LoopAnalysis, LoopFixture, LoopJob, LoopPlan, LoopPlanner, LoopView,
    SequentialSegment, SequentialSegmentSynthesizer, SynthesisReport,
};
pub use shared::models::{
    BlockId, Function, FunctionBuilder, InstId, LoopId, Opcode, Operand, SccId, SegmentId,
};

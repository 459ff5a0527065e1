//! Error types for loopsync-core
//!
//! Provides unified error handling across the crate. Analysis failures are
//! never transient: an internal consistency violation aborts parallelization of
//! the loop being analyzed, and a precondition violation rejects a malformed
//! query.

use crate::config::ConfigError;
use crate::shared::models::{InstId, SccId};
use thiserror::Error;

/// Main error type for loopsync-core operations
#[derive(Debug, Error)]
pub enum LoopSyncError {
    /// A required invariant of the analysis does not hold
    #[error("Internal consistency violation: {0}")]
    InternalConsistency(#[from] ConsistencyViolation),

    /// Caller asked a question the analysis cannot answer
    #[error("Precondition violation: {0}")]
    Precondition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON fixture error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The distinguishable kinds of internal consistency violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyViolation {
    /// No instruction of an original SCC has a clone inside the cloned loop.
    #[error("original {scc} has no counterpart in the cloned loop")]
    UnmappedScc { scc: SccId },

    /// The clones of an original SCC are split across several cloned SCCs.
    #[error("original {scc} maps to more than one cloned SCC ({candidates:?})")]
    AmbiguousScc { scc: SccId, candidates: Vec<SccId> },

    /// A cloned SCC has no original SCC mapped onto it.
    #[error("cloned {scc} has no counterpart in the original loop")]
    UnmappedTaskScc { scc: SccId },

    /// The cloned loop's SCCDAG must have exactly one top-level node.
    #[error("loop SCCDAG has {count} top-level nodes, expected exactly one preamble")]
    MultiplePreambles { count: usize },

    /// An SCC could not be given any attribute.
    #[error("{scc} cannot be classified")]
    UnclassifiableScc { scc: SccId },

    /// Condensation produced a cycle.
    #[error("SCCDAG contains a cycle through {scc}")]
    CyclicSccDag { scc: SccId },

    /// A dependence points from a later partition set to an earlier one.
    #[error("dependence {from} -> {to} points from set {from_set} back to set {to_set}")]
    PartitionOrder {
        from: SccId,
        to: SccId,
        from_set: usize,
        to_set: usize,
    },

    /// Partition sets do not cover every SCCDAG node exactly once.
    #[error("partition does not cover {scc} exactly once")]
    PartitionCover { scc: SccId },

    /// A cloned instruction appears in no cloned SCC.
    #[error("cloned instruction {inst} is not part of the cloned SCCDAG")]
    OrphanInstruction { inst: InstId },
}

impl LoopSyncError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        LoopSyncError::Precondition(msg.into())
    }

    /// True when the error means "leave this loop sequential" rather than a
    /// problem with the caller's environment.
    pub fn aborts_loop_only(&self) -> bool {
        matches!(
            self,
            LoopSyncError::InternalConsistency(_) | LoopSyncError::Precondition(_)
        )
    }
}

/// Result type alias for loopsync operations
pub type Result<T> = std::result::Result<T, LoopSyncError>;

//! Stage-specific configuration types

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use crate::features::reachability::ReachMode;
use crate::features::sequential_segments::ReduciblePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Partitioner
// ============================================================================

/// Partitioner configuration
///
/// `target_granularity` is the maximum number of SCCDAG nodes merged into one
/// partition set. `usize::MAX` keeps the whole SCCDAG in a single set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub target_granularity: usize,
}

impl PartitionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.target_granularity == 0 {
            return Err(ConfigError::range_with_hint(
                "target_granularity",
                self.target_granularity,
                1,
                "unbounded",
                "use 1 for one SCC per partition set",
            ));
        }
        Ok(())
    }

    /// Builder: Set target_granularity
    pub fn target_granularity(mut self, v: usize) -> Self {
        self.target_granularity = v;
        self
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self {
            target_granularity: preset.target_granularity(),
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

// ============================================================================
// Reachability
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    pub mode: ReachMode,
}

impl ReachabilityConfig {
    /// Builder: Set mode
    pub fn mode(mut self, v: ReachMode) -> Self {
        self.mode = v;
        self
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Treat FAdd/FMul chains as reducible (default: false)
    pub allow_fp_reassociation: bool,
}

impl ClassifierConfig {
    /// Builder: Set allow_fp_reassociation
    pub fn allow_fp_reassociation(mut self, v: bool) -> Self {
        self.allow_fp_reassociation = v;
        self
    }
}

// ============================================================================
// Sequential segments
// ============================================================================

/// Segment synthesis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Whether reducible accumulators may force a segment
    pub reducible_policy: ReduciblePolicy,

    /// Reject cloned loops whose SCCDAG has more than one top-level node
    pub require_single_preamble: bool,

    /// Directory receiving `sccdag-*.dot` dumps (None = no dump)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<PathBuf>,
}

impl SegmentConfig {
    /// Builder: Set reducible_policy
    pub fn reducible_policy(mut self, v: ReduciblePolicy) -> Self {
        self.reducible_policy = v;
        self
    }

    /// Builder: Set require_single_preamble
    pub fn require_single_preamble(mut self, v: bool) -> Self {
        self.require_single_preamble = v;
        self
    }

    /// Builder: Set dump_dir
    pub fn dump_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(v.into());
        self
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            reducible_policy: ReduciblePolicy::default(),
            require_single_preamble: true,
            dump_dir: None,
        }
    }
}

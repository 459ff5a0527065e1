//! Configuration System
//!
//! Two tiers, the same way the rest of the pipeline is configured:
//! - Level 1: Preset - one-liner choosing the partition granularity
//! - Level 2: Stage override / YAML - complete control
//!
//! # Examples
//!
//! ```rust,ignore
//! use loopsync_core::config::{LoopSyncConfig, Preset};
//!
//! let config = LoopSyncConfig::preset(Preset::Fine);
//!
//! let config = LoopSyncConfig::preset(Preset::Balanced)
//!     .partition(|c| c.target_granularity(2))
//!     .build()?;
//!
//! let config = LoopSyncConfig::from_yaml("loopsync.yaml")?;
//! ```

pub mod error;
pub mod io;
pub mod preset;
pub mod stage_configs;

pub use error::{ConfigError, ConfigResult};
pub use io::ConfigExportV1;
pub use preset::Preset;
pub use stage_configs::{ClassifierConfig, PartitionConfig, ReachabilityConfig, SegmentConfig};

use serde::{Deserialize, Serialize};

/// Current YAML schema version
pub const CONFIG_VERSION: u32 = 1;

/// Complete configuration for one synthesis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSyncConfig {
    pub preset: Preset,
    pub partition: PartitionConfig,
    pub reachability: ReachabilityConfig,
    pub classifier: ClassifierConfig,
    pub segments: SegmentConfig,
}

impl LoopSyncConfig {
    /// Start from a preset
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            partition: PartitionConfig::from_preset(preset),
            reachability: ReachabilityConfig::default(),
            classifier: ClassifierConfig::default(),
            segments: SegmentConfig::default(),
        }
    }

    /// Override partition settings
    pub fn partition(mut self, f: impl FnOnce(PartitionConfig) -> PartitionConfig) -> Self {
        self.partition = f(self.partition);
        self
    }

    /// Override reachability settings
    pub fn reachability(
        mut self,
        f: impl FnOnce(ReachabilityConfig) -> ReachabilityConfig,
    ) -> Self {
        self.reachability = f(self.reachability);
        self
    }

    /// Override classifier settings
    pub fn classifier(mut self, f: impl FnOnce(ClassifierConfig) -> ClassifierConfig) -> Self {
        self.classifier = f(self.classifier);
        self
    }

    /// Override segment settings
    pub fn segments(mut self, f: impl FnOnce(SegmentConfig) -> SegmentConfig) -> Self {
        self.segments = f(self.segments);
        self
    }

    /// Validate every stage
    pub fn validate(&self) -> ConfigResult<()> {
        self.partition.validate()
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }
}

impl Default for LoopSyncConfig {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

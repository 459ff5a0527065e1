//! Preset configurations
//!
//! Presets choose how finely the SCCDAG is cut into partitions. Finer cuts give
//! smaller sequential segments and more overlap between replicas.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// One SCC per partition set
    Fine,

    /// Up to four consecutive SCCs per set
    Balanced,

    /// A single set holding the whole SCCDAG
    Coarse,
}

impl Preset {
    /// Partition granularity implied by the preset
    pub fn target_granularity(&self) -> usize {
        match self {
            Self::Fine => 1,
            Self::Balanced => 4,
            Self::Coarse => usize::MAX,
        }
    }

    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "fine" => Ok(Self::Fine),
            "balanced" => Ok(Self::Balanced),
            "coarse" => Ok(Self::Coarse),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fine => "fine",
            Self::Balanced => "balanced",
            Self::Coarse => "coarse",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Fine
    }
}

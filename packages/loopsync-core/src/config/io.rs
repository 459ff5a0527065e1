//! Configuration I/O (YAML loading)

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::stage_configs::*;
use super::{LoopSyncConfig, CONFIG_VERSION};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// YAML Schema v1
///
/// Stage sections are optional; missing sections come from the preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachability: Option<ReachabilityConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<SegmentConfig>,
}

impl LoopSyncConfig {
    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(text)?;
        match export.version {
            None => return Err(ConfigError::MissingVersion),
            Some(CONFIG_VERSION) => {}
            Some(found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: vec![CONFIG_VERSION],
                })
            }
        }

        let mut config = LoopSyncConfig::preset(Preset::from_str(&export.preset)?);
        if let Some(partition) = export.partition {
            config.partition = partition;
        }
        if let Some(reachability) = export.reachability {
            config.reachability = reachability;
        }
        if let Some(classifier) = export.classifier {
            config.classifier = classifier;
        }
        if let Some(segments) = export.segments {
            config.segments = segments;
        }
        config.build()
    }

    /// Serialize to YAML (schema v1)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(CONFIG_VERSION),
            preset: self.preset.as_str().to_string(),
            partition: Some(self.partition.clone()),
            reachability: Some(self.reachability.clone()),
            classifier: Some(self.classifier.clone()),
            segments: Some(self.segments.clone()),
        };
        Ok(serde_yaml::to_string(&export)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reachability::ReachMode;
    use crate::features::sequential_segments::ReduciblePolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_yaml_roundtrip() {
        let config = LoopSyncConfig::preset(Preset::Balanced)
            .partition(|c| c.target_granularity(2))
            .segments(|c| c.reducible_policy(ReduciblePolicy::Sequential));

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("preset: balanced"));
        assert!(yaml.contains("target_granularity: 2"));

        let back = LoopSyncConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_yaml_loading_with_partial_overrides() {
        let yaml_content = r#"
version: 1
preset: coarse
reachability:
  mode: cross_iteration
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = LoopSyncConfig::from_yaml(temp_file.path()).unwrap();
        assert_eq!(config.preset, Preset::Coarse);
        assert_eq!(config.partition.target_granularity, usize::MAX);
        assert_eq!(config.reachability.mode, ReachMode::CrossIteration);
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = LoopSyncConfig::from_yaml_str("preset: fine\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = LoopSyncConfig::from_yaml_str("version: 2\npreset: fine\n");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_yaml_invalid_granularity() {
        let yaml = "version: 1\npreset: fine\npartition:\n  target_granularity: 0\n";
        assert!(matches!(
            LoopSyncConfig::from_yaml_str(yaml),
            Err(ConfigError::Range { .. })
        ));
    }
}

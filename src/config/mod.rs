//! Configuration types for the subsampling pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for voxel-grid subsampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsampleConfig {
    /// Edge length of the cubic grid cells
    #[serde(default = "default_cell_size", alias = "sample_dl")]
    pub cell_size: f32,

    /// Process the clouds of a batch on the rayon thread pool
    #[serde(default = "default_parallel_batches")]
    pub parallel_batches: bool,
}

fn default_cell_size() -> f32 {
    0.1
}

fn default_parallel_batches() -> bool {
    true
}

impl Default for SubsampleConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            parallel_batches: default_parallel_batches(),
        }
    }
}

/// Configuration for reading and writing point cloud files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Column / PLY property holding class labels
    #[serde(default = "default_label_column")]
    pub label_column: String,

    /// Carry extra scalar columns through as features
    #[serde(default = "default_true")]
    pub keep_features: bool,

    /// Carry the label column through
    #[serde(default = "default_true")]
    pub keep_labels: bool,
}

fn default_label_column() -> String {
    "label".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            label_column: default_label_column(),
            keep_features: true,
            keep_labels: true,
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub subsample: SubsampleConfig,

    #[serde(default)]
    pub io: IoConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_subsample_config() {
        let config = SubsampleConfig::default();
        assert_eq!(config.cell_size, 0.1);
        assert!(config.parallel_batches);
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.io.label_column, "label");
        assert!(config.io.keep_features);
        assert!(config.io.keep_labels);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PipelineConfig = serde_yaml::from_str("subsample:\n  sample_dl: 1.1\n").unwrap();
        assert_eq!(config.subsample.cell_size, 1.1);
        assert!(config.subsample.parallel_batches);
        assert_eq!(config.io, IoConfig::default());
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = PipelineConfig::default();
        config.subsample.cell_size = 0.25;
        config.io.label_column = "class".to_string();
        config.to_yaml(&path).unwrap();

        let loaded = PipelineConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

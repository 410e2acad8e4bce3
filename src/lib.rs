//! Voxel-grid point cloud subsampling.
//!
//! This crate provides tools for:
//! - Merging all points of a cubic grid cell into their barycenter
//! - Averaging per-point feature vectors over the same cells
//! - Resolving per-cell class labels by majority vote
//! - Subsampling batches of independent clouds packed into one buffer (parallelized)
//! - Loading and writing ASCII PLY and CSV point clouds
//!
//! # Example
//!
//! ```
//! use voxel_subsample::{subsample, Array};
//!
//! let points = Array::from_points(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
//! let labels = Array::from_i32_vec(vec![2, 2, 7]);
//!
//! let out = subsample(Some(&points), 1.5, None, Some(&labels)).unwrap();
//! assert_eq!(out.points.as_f32().unwrap(), &[0.5, 0.0, 0.0, 5.0, 0.0, 0.0]);
//! assert_eq!(out.labels.unwrap().as_i32().unwrap(), &[2, 7]);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use crate::config::{IoConfig, PipelineConfig, SubsampleConfig};
pub use crate::core::array::{Array, DType};
pub use crate::core::cloud::{FeatureMatrix, PointCloud};
pub use crate::core::error::{ErrorKind, SubsampleError};
pub use crate::processors::subsample::{
    subsample, subsample_batch, subsample_batch_with, subsample_cloud, subsample_clouds,
    BatchSubsampled, Subsampled,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

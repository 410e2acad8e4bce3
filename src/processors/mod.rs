//! Data processing modules.

pub mod accumulator;
pub mod batch;
pub mod grid;
pub mod subsample;
pub mod validate;

// Re-export key types for convenience
pub use accumulator::{CellRecord, CellTable, FinalizedCells, LabelVote};
pub use batch::{batch_offsets, check_batch_sizes, split_view};
pub use grid::{cell_key, CellKey};
pub use subsample::{
    subsample, subsample_batch, subsample_batch_with, subsample_cloud, subsample_clouds,
    BatchSubsampled, Subsampled,
};
pub use validate::{validate_batch, validate_cloud, CloudView, FeatureView};

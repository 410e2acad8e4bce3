//! Up-front validation of engine inputs.
//!
//! Every check runs before any accumulation starts, so a failing call has no
//! side effects and produces no partial output. A successful validation yields
//! borrowed, typed views over the caller's buffers.

use std::ops::Range;

use crate::core::array::{Array, DType};
use crate::core::error::{Result, SubsampleError};

use super::batch::check_batch_sizes;

/// Borrowed `[rows, dim]` feature matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureView<'a> {
    pub data: &'a [f32],
    pub dim: usize,
}

/// Validated, borrowed view of one cloud (or of a whole packed batch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudView<'a> {
    /// Flat `[rows, 3]` coordinates.
    pub points: &'a [f32],
    pub features: Option<FeatureView<'a>>,
    pub labels: Option<&'a [i32]>,
}

impl<'a> CloudView<'a> {
    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Width of the feature vectors, if features are present.
    #[inline]
    pub fn feature_dim(&self) -> Option<usize> {
        self.features.map(|f| f.dim)
    }

    #[inline]
    pub fn point(&self, i: usize) -> &'a [f32] {
        &self.points[i * 3..i * 3 + 3]
    }

    #[inline]
    pub fn feature(&self, i: usize) -> Option<&'a [f32]> {
        self.features.map(|f| &f.data[i * f.dim..(i + 1) * f.dim])
    }

    #[inline]
    pub fn label(&self, i: usize) -> Option<i32> {
        self.labels.map(|l| l[i])
    }

    /// View over rows `range` of this view.
    pub fn slice(&self, range: Range<usize>) -> CloudView<'a> {
        CloudView {
            points: &self.points[range.start * 3..range.end * 3],
            features: self.features.map(|f| FeatureView {
                data: &f.data[range.start * f.dim..range.end * f.dim],
                dim: f.dim,
            }),
            labels: self.labels.map(|l| &l[range]),
        }
    }
}

/// The cell edge length must be finite and strictly positive.
pub fn check_cell_size(cell_size: f32) -> Result<()> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(SubsampleError::InvalidCellSize(cell_size))
    }
}

fn require<'a>(arr: Option<&'a Array>, name: &'static str) -> Result<&'a Array> {
    arr.ok_or(SubsampleError::MissingArgument(name))
}

fn check_rank(arr: &Array, name: &'static str, expected: usize) -> Result<()> {
    if arr.ndim() != expected {
        return Err(SubsampleError::WrongRank {
            name,
            expected,
            shape: arr.shape().to_vec(),
        });
    }
    Ok(())
}

fn f32_data<'a>(arr: &'a Array, name: &'static str) -> Result<&'a [f32]> {
    arr.as_f32().ok_or(SubsampleError::WrongDType {
        name,
        expected: DType::F32,
        actual: arr.dtype(),
    })
}

fn i32_data<'a>(arr: &'a Array, name: &'static str) -> Result<&'a [i32]> {
    arr.as_i32().ok_or(SubsampleError::WrongDType {
        name,
        expected: DType::I32,
        actual: arr.dtype(),
    })
}

/// Points must be a `[N, 3]` float32 array.
pub fn validate_points(points: &Array) -> Result<&[f32]> {
    let data = f32_data(points, "points")?;
    check_rank(points, "points", 2)?;
    if points.shape()[1] != 3 {
        return Err(SubsampleError::WrongInnerDim {
            name: "points",
            expected: 3,
            shape: points.shape().to_vec(),
        });
    }
    Ok(data)
}

/// Features must be a `[N, F]` float32 array.
pub fn validate_features(features: &Array, num_points: usize) -> Result<FeatureView<'_>> {
    let data = f32_data(features, "features")?;
    check_rank(features, "features", 2)?;
    if features.rows() != num_points {
        return Err(SubsampleError::RowCountMismatch {
            name: "features",
            expected: num_points,
            actual: features.rows(),
        });
    }
    Ok(FeatureView {
        data,
        dim: features.shape()[1],
    })
}

/// Labels must be a `[N]` int32 array.
pub fn validate_labels(labels: &Array, num_points: usize) -> Result<&[i32]> {
    let data = i32_data(labels, "labels")?;
    check_rank(labels, "labels", 1)?;
    if labels.rows() != num_points {
        return Err(SubsampleError::RowCountMismatch {
            name: "labels",
            expected: num_points,
            actual: labels.rows(),
        });
    }
    Ok(data)
}

/// Batch sizes must be a `[K]` int32 array of non-negative values summing to
/// the point count.
pub fn validate_batch_sizes(batch_sizes: &Array, num_points: usize) -> Result<Vec<usize>> {
    let data = i32_data(batch_sizes, "batch sizes")?;
    check_rank(batch_sizes, "batch sizes", 1)?;
    check_batch_sizes(data, num_points)
}

/// Validate a single-cloud call.
pub fn validate_cloud<'a>(
    points: Option<&'a Array>,
    features: Option<&'a Array>,
    labels: Option<&'a Array>,
    cell_size: f32,
) -> Result<CloudView<'a>> {
    let points = require(points, "points")?;
    check_cell_size(cell_size)?;

    let point_data = validate_points(points)?;
    let num_points = points.rows();
    let features = features
        .map(|f| validate_features(f, num_points))
        .transpose()?;
    let labels = labels.map(|l| validate_labels(l, num_points)).transpose()?;

    Ok(CloudView {
        points: point_data,
        features,
        labels,
    })
}

/// Validate a batched call, returning the packed view and per-cloud sizes.
pub fn validate_batch<'a>(
    points: Option<&'a Array>,
    batch_sizes: Option<&'a Array>,
    features: Option<&'a Array>,
    labels: Option<&'a Array>,
    cell_size: f32,
) -> Result<(CloudView<'a>, Vec<usize>)> {
    require(points, "points")?;
    let batch_sizes = require(batch_sizes, "batch sizes")?;

    let view = validate_cloud(points, features, labels, cell_size)?;
    let sizes = validate_batch_sizes(batch_sizes, view.len())?;
    Ok((view, sizes))
}

//! Voxel-grid subsampling engine.
//!
//! All points falling into the same cubic cell of edge length `cell_size` are
//! merged into one point at their mean position. Feature vectors are averaged
//! the same way and labels are resolved by a running majority vote.
//!
//! Two entry points mirror the binding-level API:
//! - [`subsample`] for one cloud,
//! - [`subsample_batch`] for several clouds packed into one buffer, described
//!   by per-cloud point counts.
//!
//! Within a cloud, cells are emitted in ascending `(kx, ky, kz)` key order.
//! In batched mode, rows are grouped by cloud in batch order and cells never
//! merge across clouds.
//!
//! # Example
//!
//! ```
//! use voxel_subsample::core::array::Array;
//! use voxel_subsample::processors::subsample::subsample;
//!
//! let points = Array::from_points(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5], [3.0, 0.0, 0.0]]);
//! let out = subsample(Some(&points), 1.0, None, None).unwrap();
//! assert_eq!(out.len(), 2);
//! ```

use rayon::prelude::*;

use crate::config::SubsampleConfig;
use crate::core::array::Array;
use crate::core::cloud::{FeatureMatrix, PointCloud};
use crate::core::error::{Result, SubsampleError};

use super::accumulator::{CellTable, FinalizedCells};
use super::batch::split_view;
use super::validate::{validate_batch, validate_cloud, CloudView};

/// Output of a single-cloud subsample.
#[derive(Debug, Clone, PartialEq)]
pub struct Subsampled {
    /// `[M, 3]` float32 cell means.
    pub points: Array,
    /// `[M, F]` float32 feature means, when features were supplied.
    pub features: Option<Array>,
    /// `[M]` int32 majority labels, when labels were supplied.
    pub labels: Option<Array>,
}

impl Subsampled {
    /// Number of output rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arrays in output order: points, then features and labels if present.
    pub fn into_arrays(self) -> Vec<Array> {
        let mut out = vec![self.points];
        out.extend(self.features);
        out.extend(self.labels);
        out
    }
}

/// Output of a batched subsample.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSubsampled {
    /// `[M, 3]` float32 cell means, grouped by cloud in batch order.
    pub points: Array,
    /// `[K]` int32 number of cells emitted per cloud.
    pub batch_sizes: Array,
    /// `[M, F]` float32 feature means, when features were supplied.
    pub features: Option<Array>,
    /// `[M]` int32 majority labels, when labels were supplied.
    pub labels: Option<Array>,
}

impl BatchSubsampled {
    /// Number of output rows across all clouds.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.rows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arrays in output order: points, batch sizes, then features and labels
    /// if present.
    pub fn into_arrays(self) -> Vec<Array> {
        let mut out = vec![self.points, self.batch_sizes];
        out.extend(self.features);
        out.extend(self.labels);
        out
    }
}

/// Build and finalize the cell table of one validated cloud.
///
/// Points are fed in input order, which the label vote depends on.
pub fn subsample_view(view: &CloudView<'_>, cell_size: f32) -> FinalizedCells {
    let n = view.len();
    let mut table = CellTable::with_capacity(
        cell_size,
        view.feature_dim(),
        view.labels.is_some(),
        n / 4,
    );
    for i in 0..n {
        table.insert(view.point(i), view.feature(i), view.label(i));
    }
    log::debug!("cell table: {} points -> {} cells", n, table.len());
    table.finalize()
}

fn assemble(cells: FinalizedCells, feature_dim: Option<usize>) -> Result<Subsampled> {
    let m = cells.len();
    let points = Array::from_f32(vec![m, 3], cells.points)?;
    let features = match (cells.features, feature_dim) {
        (Some(data), Some(dim)) => Some(Array::from_f32(vec![m, dim], data)?),
        _ => None,
    };
    let labels = cells.labels.map(Array::from_i32_vec);
    Ok(Subsampled {
        points,
        features,
        labels,
    })
}

/// Subsample one point cloud.
///
/// `points` is `[N, 3]` float32, `features` `[N, F]` float32 and `labels`
/// `[N]` int32. Features and labels are independently optional. All inputs are
/// validated before any work is done.
pub fn subsample(
    points: Option<&Array>,
    cell_size: f32,
    features: Option<&Array>,
    labels: Option<&Array>,
) -> Result<Subsampled> {
    let view = validate_cloud(points, features, labels, cell_size)?;
    let cells = subsample_view(&view, cell_size);
    assemble(cells, view.feature_dim())
}

/// Subsample several clouds packed into one buffer, processing clouds in
/// parallel.
///
/// `batch_sizes` is `[K]` int32 and must sum to `N`. See
/// [`subsample_batch_with`] to control parallelism.
pub fn subsample_batch(
    points: Option<&Array>,
    batch_sizes: Option<&Array>,
    cell_size: f32,
    features: Option<&Array>,
    labels: Option<&Array>,
) -> Result<BatchSubsampled> {
    let config = SubsampleConfig {
        cell_size,
        ..SubsampleConfig::default()
    };
    subsample_batch_with(points, batch_sizes, features, labels, &config)
}

/// Batched subsample driven by a [`SubsampleConfig`].
pub fn subsample_batch_with(
    points: Option<&Array>,
    batch_sizes: Option<&Array>,
    features: Option<&Array>,
    labels: Option<&Array>,
    config: &SubsampleConfig,
) -> Result<BatchSubsampled> {
    let cell_size = config.cell_size;
    let (view, sizes) = validate_batch(points, batch_sizes, features, labels, cell_size)?;
    let clouds = split_view(&view, &sizes);

    // Each cloud owns its table; collect keeps batch order.
    let per_cloud: Vec<FinalizedCells> = if config.parallel_batches {
        clouds
            .par_iter()
            .map(|cloud| subsample_view(cloud, cell_size))
            .collect()
    } else {
        clouds
            .iter()
            .map(|cloud| subsample_view(cloud, cell_size))
            .collect()
    };

    let total: usize = per_cloud.iter().map(FinalizedCells::len).sum();
    let feature_dim = view.feature_dim();
    let mut out_points = Vec::with_capacity(total * 3);
    let mut out_features = feature_dim.map(|dim| Vec::with_capacity(total * dim));
    let mut out_labels = view.labels.map(|_| Vec::with_capacity(total));
    let mut out_sizes = Vec::with_capacity(per_cloud.len());

    for cells in per_cloud {
        out_sizes.push(cells.len() as i32);
        out_points.extend_from_slice(&cells.points);
        if let (Some(out), Some(f)) = (out_features.as_mut(), cells.features) {
            out.extend_from_slice(&f);
        }
        if let (Some(out), Some(l)) = (out_labels.as_mut(), cells.labels) {
            out.extend_from_slice(&l);
        }
    }

    log::debug!(
        "batch of {} clouds: {} points -> {} cells",
        out_sizes.len(),
        view.len(),
        total
    );

    let merged = assemble(
        FinalizedCells {
            points: out_points,
            features: out_features,
            labels: out_labels,
        },
        feature_dim,
    )?;

    Ok(BatchSubsampled {
        points: merged.points,
        batch_sizes: Array::from_i32_vec(out_sizes),
        features: merged.features,
        labels: merged.labels,
    })
}

/// Subsample a typed point cloud.
///
/// Feature column names carry over to the output.
pub fn subsample_cloud(cloud: &PointCloud, config: &SubsampleConfig) -> Result<PointCloud> {
    let (points, features, labels) = cloud.to_arrays()?;
    let out = subsample(
        Some(&points),
        config.cell_size,
        features.as_ref(),
        labels.as_ref(),
    )?;
    let names = cloud.features.as_ref().map(|f| f.names.as_slice());
    PointCloud::from_arrays(out.points, out.features, out.labels, names)
}

/// Subsample several typed clouds as one batch.
///
/// Clouds are packed in order; every cloud must carry the same attributes
/// (features of equal width, labels on all or none). Returns one subsampled
/// cloud per input cloud.
pub fn subsample_clouds(
    clouds: &[PointCloud],
    config: &SubsampleConfig,
) -> Result<Vec<PointCloud>> {
    let packed = pack_clouds(clouds)?;
    let (points, features, labels) = packed.to_arrays()?;
    let sizes = Array::from_i32_vec(clouds.iter().map(|c| c.len() as i32).collect());

    let out = subsample_batch_with(
        Some(&points),
        Some(&sizes),
        features.as_ref(),
        labels.as_ref(),
        config,
    )?;

    let names = packed.features.as_ref().map(|f| f.names.as_slice());
    let merged = PointCloud::from_arrays(out.points, out.features, out.labels, names)?;
    let new_sizes = out.batch_sizes.as_i32().unwrap_or_default();
    Ok(unpack_cloud(merged, new_sizes))
}

/// Concatenate clouds into one packed cloud.
///
/// The first cloud decides which attributes the batch carries.
fn pack_clouds(clouds: &[PointCloud]) -> Result<PointCloud> {
    let total: usize = clouds.iter().map(PointCloud::len).sum();
    let first = clouds.first();
    let names = first
        .and_then(|c| c.features.as_ref())
        .map(|f| f.names.clone());
    let dim = names.as_ref().map_or(0, Vec::len);
    let with_labels = first.is_some_and(|c| c.labels.is_some());

    let mut packed = PointCloud::with_capacity(total);
    let mut features: Vec<f32> = Vec::with_capacity(total * dim);
    let mut labels: Vec<i32> = Vec::with_capacity(total);

    for cloud in clouds {
        packed.points.extend_from_slice(&cloud.points);

        match (&cloud.features, names.is_some()) {
            (Some(f), true) if f.dim() == dim && f.rows() == cloud.len() => {
                features.extend_from_slice(&f.data);
            }
            (None, false) => {}
            (f, _) => {
                return Err(SubsampleError::RowCountMismatch {
                    name: "features",
                    expected: cloud.len(),
                    actual: f.as_ref().map_or(0, FeatureMatrix::rows),
                });
            }
        }

        match (&cloud.labels, with_labels) {
            (Some(l), true) if l.len() == cloud.len() => labels.extend_from_slice(l),
            (None, false) => {}
            (l, _) => {
                return Err(SubsampleError::RowCountMismatch {
                    name: "labels",
                    expected: cloud.len(),
                    actual: l.as_ref().map_or(0, Vec::len),
                });
            }
        }
    }

    packed.features = names.map(|names| FeatureMatrix::with_names(names, features));
    packed.labels = with_labels.then_some(labels);
    Ok(packed)
}

/// Split a packed cloud back into clouds of the given sizes.
fn unpack_cloud(packed: PointCloud, sizes: &[i32]) -> Vec<PointCloud> {
    let mut out = Vec::with_capacity(sizes.len());
    let mut start = 0usize;
    for &n in sizes {
        let end = start + n as usize;
        let mut cloud = PointCloud::from_points(packed.points[start..end].to_vec());
        if let Some(f) = &packed.features {
            let dim = f.dim();
            cloud.features = Some(FeatureMatrix::with_names(
                f.names.clone(),
                f.data[start * dim..end * dim].to_vec(),
            ));
        }
        if let Some(l) = &packed.labels {
            cloud.labels = Some(l[start..end].to_vec());
        }
        out.push(cloud);
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn scenario_points() -> Vec<[f32; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [5.0, 0.0, 0.0],
            [5.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn test_subsample_points_only() {
        let points = Array::from_points(&scenario_points());
        let out = subsample(Some(&points), 1.1, None, None).unwrap();

        assert_eq!(out.points.shape(), &[2, 3]);
        assert_eq!(
            out.points.as_f32().unwrap(),
            &[0.4, 0.4, 0.4, 5.0, 0.5, 0.0]
        );
        assert!(out.features.is_none());
        assert!(out.labels.is_none());
        assert_eq!(out.into_arrays().len(), 1);
    }

    #[test]
    fn test_subsample_features_and_labels() {
        let points = Array::from_points(&scenario_points());
        let features = Array::from_f32(vec![7, 3], (0..21).map(|v| v as f32).collect()).unwrap();
        let labels = Array::from_i32_vec((0..7).collect());

        let out = subsample(Some(&points), 1.1, Some(&features), Some(&labels)).unwrap();
        assert_eq!(
            out.features.as_ref().unwrap().as_f32().unwrap(),
            &[6.0, 7.0, 8.0, 16.5, 17.5, 18.5]
        );
        assert_eq!(out.labels.as_ref().unwrap().as_i32().unwrap(), &[4, 6]);

        let arrays = out.into_arrays();
        assert_eq!(arrays.len(), 3);
        assert_eq!(arrays[1].shape(), &[2, 3]);
        assert_eq!(arrays[2].shape(), &[2]);
    }

    #[test]
    fn test_subsample_labels_without_features() {
        let points = Array::from_points(&scenario_points());
        let labels = Array::from_i32_vec(vec![1, 1, 2, 2, 9, 3, 3]);

        let out = subsample(Some(&points), 1.1, None, Some(&labels)).unwrap();
        assert!(out.features.is_none());
        // 1 and 2 tie at 2 ballots each before 9 is seen; 2 was counted last
        assert_eq!(out.labels.as_ref().unwrap().as_i32().unwrap(), &[2, 3]);
        assert_eq!(out.into_arrays().len(), 2);
    }

    #[test]
    fn test_subsample_empty_cloud() {
        let points = Array::from_points(&[]);
        let features = Array::from_f32(vec![0, 4], vec![]).unwrap();
        let out = subsample(Some(&points), 0.5, Some(&features), None).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.points.shape(), &[0, 3]);
        assert_eq!(out.features.unwrap().shape(), &[0, 4]);
    }

    #[test]
    fn test_subsample_rejects_before_work() {
        let points = Array::from_points(&scenario_points());
        let err = subsample(Some(&points.to_f64()), 1.1, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = subsample(None, 1.1, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn test_subsample_batch_scenario() {
        let points = Array::from_points(&scenario_points());
        let sizes = Array::from_i32_vec(vec![3, 2, 2]);
        let features = Array::from_f32(vec![7, 4], (0..28).map(|v| v as f32).collect()).unwrap();
        let labels = Array::from_i32_vec((0..7).collect());

        let out = subsample_batch(
            Some(&points),
            Some(&sizes),
            1.1,
            Some(&features),
            Some(&labels),
        )
        .unwrap();

        assert_eq!(out.batch_sizes.as_i32().unwrap(), &[1, 1, 1]);
        let pts = out.points.as_f32().unwrap();
        let expected = [1.0 / 3.0, 1.0 / 3.0, 0.0, 0.5, 0.5, 1.0, 5.0, 0.5, 0.0];
        for (a, b) in pts.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
        assert_eq!(
            out.features.as_ref().unwrap().as_f32().unwrap(),
            &[4.0, 5.0, 6.0, 7.0, 14.0, 15.0, 16.0, 17.0, 22.0, 23.0, 24.0, 25.0]
        );
        assert_eq!(out.labels.as_ref().unwrap().as_i32().unwrap(), &[2, 4, 6]);
        assert_eq!(out.into_arrays().len(), 4);
    }

    #[test]
    fn test_subsample_batch_never_merges_across_clouds() {
        let points = Array::from_points(&[[0.1, 0.1, 0.1], [0.2, 0.2, 0.2], [0.3, 0.3, 0.3]]);
        let sizes = Array::from_i32_vec(vec![1, 0, 2]);
        let out = subsample_batch(Some(&points), Some(&sizes), 1.0, None, None).unwrap();
        assert_eq!(out.batch_sizes.as_i32().unwrap(), &[1, 0, 1]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_subsample_batch_sequential_matches_parallel() {
        let pts: Vec<[f32; 3]> = (0..500)
            .map(|i| {
                let f = i as f32;
                [(f * 0.37) % 7.0, (f * 0.11) % 5.0, (f * 0.53) % 3.0]
            })
            .collect();
        let points = Array::from_points(&pts);
        let labels = Array::from_i32_vec((0..500).map(|i| i % 4).collect());
        let sizes = Array::from_i32_vec(vec![100, 250, 150]);

        let parallel = SubsampleConfig {
            cell_size: 0.75,
            parallel_batches: true,
        };
        let sequential = SubsampleConfig {
            parallel_batches: false,
            ..parallel.clone()
        };

        let a = subsample_batch_with(Some(&points), Some(&sizes), None, Some(&labels), &parallel)
            .unwrap();
        let b = subsample_batch_with(Some(&points), Some(&sizes), None, Some(&labels), &sequential)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_subsample_batch_sum_mismatch() {
        let points = Array::from_points(&scenario_points());
        let sizes = Array::from_i32_vec(vec![3, 3, 2]);
        let err = subsample_batch(Some(&points), Some(&sizes), 1.1, None, None).unwrap_err();
        assert_eq!(
            err,
            SubsampleError::BatchSumMismatch {
                sum: 8,
                num_points: 7
            }
        );
    }

    #[test]
    fn test_subsample_cloud_keeps_names() {
        let names = vec!["intensity".to_string()];
        let cloud = PointCloud::from_points(vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]])
            .with_features(FeatureMatrix::with_names(names.clone(), vec![2.0, 4.0]));
        let config = SubsampleConfig {
            cell_size: 1.0,
            ..SubsampleConfig::default()
        };

        let out = subsample_cloud(&cloud, &config).unwrap();
        assert_eq!(out.points, vec![[0.25, 0.0, 0.0]]);
        let features = out.features.unwrap();
        assert_eq!(features.names, names);
        assert_eq!(features.data, vec![3.0]);
    }

    #[test]
    fn test_subsample_clouds() {
        let a = PointCloud::from_points(vec![[0.0, 0.0, 0.0], [0.2, 0.0, 0.0]]).with_labels(vec![1, 1]);
        let b = PointCloud::from_points(vec![[0.1, 0.0, 0.0], [5.0, 0.0, 0.0]]).with_labels(vec![2, 3]);
        let config = SubsampleConfig {
            cell_size: 1.0,
            ..SubsampleConfig::default()
        };

        let out = subsample_clouds(&[a, b], &config).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0].labels, Some(vec![1]));
        assert_eq!(out[1].points, vec![[0.1, 0.0, 0.0], [5.0, 0.0, 0.0]]);
        assert_eq!(out[1].labels, Some(vec![2, 3]));
    }

    #[test]
    fn test_subsample_clouds_mismatched_attributes() {
        let a = PointCloud::from_points(vec![[0.0, 0.0, 0.0]]).with_labels(vec![1]);
        let b = PointCloud::from_points(vec![[1.0, 0.0, 0.0]]);
        let err = subsample_clouds(&[a, b], &SubsampleConfig::default()).unwrap_err();
        assert!(matches!(err, SubsampleError::RowCountMismatch { name: "labels", .. }));
    }

    #[test]
    fn test_nan_point_does_not_touch_finite_cell() {
        let points = Array::from_points(&[[0.2, 0.2, 0.2], [f32::NAN, 0.5, 0.5]]);
        let labels = Array::from_i32_vec(vec![1, 9]);
        let out = subsample(Some(&points), 1.0, None, Some(&labels)).unwrap();

        assert_eq!(out.len(), 2);
        let pts = out.points.as_f32().unwrap();
        // The NaN cell sorts first under its i64::MIN key.
        assert!(pts[0].is_nan());
        assert_eq!(&pts[1..3], &[0.5, 0.5]);
        assert_eq!(&pts[3..6], &[0.2, 0.2, 0.2]);
        assert_eq!(out.labels.unwrap().as_i32().unwrap(), &[9, 1]);
    }
}

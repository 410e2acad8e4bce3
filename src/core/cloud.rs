//! Strongly typed point cloud container.

use super::array::{Array, DType};
use super::error::{Result, SubsampleError};

/// Row-major matrix of per-point feature vectors with a fixed width.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names, one per feature dimension.
    pub names: Vec<String>,
    /// Flat row-major values, `rows * dim` long.
    pub data: Vec<f32>,
}

impl FeatureMatrix {
    /// Create a matrix with generated column names `f0..f{dim-1}`.
    pub fn new(dim: usize, data: Vec<f32>) -> Self {
        Self {
            names: (0..dim).map(|i| format!("f{}", i)).collect(),
            data,
        }
    }

    /// Create a matrix with explicit column names.
    pub fn with_names(names: Vec<String>, data: Vec<f32>) -> Self {
        Self { names, data }
    }

    /// Number of feature columns.
    #[inline]
    pub fn dim(&self) -> usize {
        self.names.len()
    }

    /// Number of rows held.
    #[inline]
    pub fn rows(&self) -> usize {
        match self.dim() {
            0 => 0,
            d => self.data.len() / d,
        }
    }

    /// Feature vector of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let d = self.dim();
        &self.data[i * d..(i + 1) * d]
    }

    /// Convert to an `[rows, dim]` float32 array.
    pub fn to_array(&self) -> Result<Array> {
        Array::from_f32(vec![self.rows(), self.dim()], self.data.clone())
    }
}

/// Container for a 3D point cloud with optional features and class labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    /// Point coordinates.
    pub points: Vec<[f32; 3]>,
    /// Optional per-point feature vectors.
    pub features: Option<FeatureMatrix>,
    /// Optional per-point class labels.
    pub labels: Option<Vec<i32>>,
}

impl PointCloud {
    /// Creates a new empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a point cloud holding only coordinates.
    pub fn from_points(points: Vec<[f32; 3]>) -> Self {
        Self {
            points,
            features: None,
            labels: None,
        }
    }

    /// Creates a new point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            features: None,
            labels: None,
        }
    }

    /// Attach feature vectors.
    pub fn with_features(mut self, features: FeatureMatrix) -> Self {
        self.features = Some(features);
        self
    }

    /// Attach class labels.
    pub fn with_labels(mut self, labels: Vec<i32>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Returns the number of points in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Width of the feature vectors, 0 without features.
    #[inline]
    pub fn feature_dim(&self) -> usize {
        self.features.as_ref().map_or(0, FeatureMatrix::dim)
    }

    /// Adds a point to the cloud.
    #[inline]
    pub fn push(&mut self, point: [f32; 3]) {
        self.points.push(point);
    }

    /// Convert into the array triple taken by the engine entry points.
    pub fn to_arrays(&self) -> Result<(Array, Option<Array>, Option<Array>)> {
        let points = Array::from_points(&self.points);
        let features = self.features.as_ref().map(FeatureMatrix::to_array).transpose()?;
        let labels = self.labels.clone().map(Array::from_i32_vec);
        Ok((points, features, labels))
    }

    /// Rebuild a cloud from engine output arrays.
    ///
    /// `feature_names` is reused when its length matches the feature width.
    pub fn from_arrays(
        points: Array,
        features: Option<Array>,
        labels: Option<Array>,
        feature_names: Option<&[String]>,
    ) -> Result<Self> {
        let points = array_to_points(points)?;

        let features = match features {
            Some(arr) => {
                let dim = arr.shape().get(1).copied().unwrap_or(0);
                let actual = arr.dtype();
                let data = arr.into_f32().ok_or(SubsampleError::WrongDType {
                    name: "features",
                    expected: DType::F32,
                    actual,
                })?;
                Some(match feature_names {
                    Some(names) if names.len() == dim => {
                        FeatureMatrix::with_names(names.to_vec(), data)
                    }
                    _ => FeatureMatrix::new(dim, data),
                })
            }
            None => None,
        };

        let labels = labels.and_then(Array::into_i32);

        Ok(Self {
            points,
            features,
            labels,
        })
    }
}

fn array_to_points(arr: Array) -> Result<Vec<[f32; 3]>> {
    if arr.ndim() != 2 || arr.shape()[1] != 3 {
        return Err(SubsampleError::WrongInnerDim {
            name: "points",
            expected: 3,
            shape: arr.shape().to_vec(),
        });
    }
    let actual = arr.dtype();
    let flat = arr.into_f32().ok_or(SubsampleError::WrongDType {
        name: "points",
        expected: DType::F32,
        actual,
    })?;
    Ok(flat
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_cloud_operations() {
        let mut cloud = PointCloud::new();
        assert!(cloud.is_empty());
        assert_eq!(cloud.len(), 0);

        cloud.push([1.0, 2.0, 3.0]);
        cloud.push([4.0, 5.0, 6.0]);

        assert_eq!(cloud.len(), 2);
        assert!(!cloud.is_empty());
        assert_eq!(cloud.feature_dim(), 0);
    }

    #[test]
    fn test_feature_matrix_rows() {
        let features = FeatureMatrix::new(2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(features.dim(), 2);
        assert_eq!(features.rows(), 3);
        assert_eq!(features.row(1), &[3.0, 4.0]);
        assert_eq!(features.names, vec!["f0", "f1"]);
    }

    #[test]
    fn test_array_round_trip_keeps_names() {
        let names = vec!["intensity".to_string(), "range".to_string()];
        let cloud = PointCloud::from_points(vec![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]])
            .with_features(FeatureMatrix::with_names(names.clone(), vec![1.0, 2.0, 3.0, 4.0]))
            .with_labels(vec![7, 8]);

        let (points, features, labels) = cloud.to_arrays().unwrap();
        assert_eq!(points.shape(), &[2, 3]);
        assert_eq!(features.as_ref().unwrap().shape(), &[2, 2]);
        assert_eq!(labels.as_ref().unwrap().shape(), &[2]);

        let rebuilt = PointCloud::from_arrays(points, features, labels, Some(&names)).unwrap();
        assert_eq!(rebuilt, cloud);
    }
}

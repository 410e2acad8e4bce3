//! Dynamically typed n-dimensional arrays.
//!
//! Bindings hand the engine arrays whose element type and rank are only known
//! at runtime. [`Array`] keeps the flat row-major buffer together with its
//! shape and element type so that validation can reject anything that is not
//! exactly what the engine expects.

use std::fmt;

use super::error::{Result, SubsampleError};

/// Element type of an [`Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    U8,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
        };
        f.write_str(name)
    }
}

/// Typed storage behind an [`Array`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
}

impl ArrayData {
    /// Element type of the stored values.
    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::U8(_) => DType::U8,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A flat row-major buffer with a shape and an element type.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    /// Create an array, checking that the shape matches the buffer length.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(SubsampleError::ShapeDataMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Create a float32 array.
    pub fn from_f32(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        Self::new(shape, ArrayData::F32(data))
    }

    /// Create an int32 array.
    pub fn from_i32(shape: Vec<usize>, data: Vec<i32>) -> Result<Self> {
        Self::new(shape, ArrayData::I32(data))
    }

    /// Create an `[n, 3]` float32 array from point rows.
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self {
            shape: vec![points.len(), 3],
            data: ArrayData::F32(points.as_flattened().to_vec()),
        }
    }

    /// Create a 1-D int32 array.
    pub fn from_i32_vec(values: Vec<i32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::I32(values),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    #[inline]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Number of rows (size of the first axis), 0 for a scalar.
    #[inline]
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Borrow the buffer if the array holds float32 values.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            ArrayData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow the buffer if the array holds int32 values.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            ArrayData::I32(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the array, returning its float32 buffer.
    pub fn into_f32(self) -> Option<Vec<f32>> {
        match self.data {
            ArrayData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the array, returning its int32 buffer.
    pub fn into_i32(self) -> Option<Vec<i32>> {
        match self.data {
            ArrayData::I32(v) => Some(v),
            _ => None,
        }
    }
}

/// Fixture conversions for unit tests.
#[cfg(test)]
impl Array {
    /// Copy the array into a float64 array, widening float32 values.
    pub(crate) fn to_f64(&self) -> Array {
        let values = match &self.data {
            ArrayData::F32(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::F64(v) => v.clone(),
            ArrayData::I32(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::I64(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::U8(v) => v.iter().map(|&x| x as f64).collect(),
        };
        Array {
            shape: self.shape.clone(),
            data: ArrayData::F64(values),
        }
    }

    /// Copy the array into an int32 array, truncating floats.
    pub(crate) fn to_i32(&self) -> Array {
        let values = match &self.data {
            ArrayData::F32(v) => v.iter().map(|&x| x as i32).collect(),
            ArrayData::F64(v) => v.iter().map(|&x| x as i32).collect(),
            ArrayData::I32(v) => v.clone(),
            ArrayData::I64(v) => v.iter().map(|&x| x as i32).collect(),
            ArrayData::U8(v) => v.iter().map(|&x| x as i32).collect(),
        };
        Array {
            shape: self.shape.clone(),
            data: ArrayData::I32(values),
        }
    }

    /// Return row `index` of a 2-D array as a 1-D array.
    pub(crate) fn row(&self, index: usize) -> Option<Array> {
        if self.ndim() != 2 || index >= self.shape[0] {
            return None;
        }
        let width = self.shape[1];
        let range = index * width..(index + 1) * width;
        let data = match &self.data {
            ArrayData::F32(v) => ArrayData::F32(v[range].to_vec()),
            ArrayData::F64(v) => ArrayData::F64(v[range].to_vec()),
            ArrayData::I32(v) => ArrayData::I32(v[range].to_vec()),
            ArrayData::I64(v) => ArrayData::I64(v[range].to_vec()),
            ArrayData::U8(v) => ArrayData::U8(v[range].to_vec()),
        };
        Some(Array {
            shape: vec![width],
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_shape() {
        let ok = Array::from_f32(vec![2, 3], vec![0.0; 6]);
        assert!(ok.is_ok());

        let err = Array::from_f32(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            SubsampleError::ShapeDataMismatch {
                shape: vec![2, 3],
                expected: 6,
                actual: 5,
            }
        );
    }

    #[test]
    fn test_from_points() {
        let arr = Array::from_points(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr.dtype(), DType::F32);
        assert_eq!(arr.rows(), 2);
        assert_eq!(arr.as_f32().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(arr.as_i32().is_none());
    }

    #[test]
    fn test_conversions_keep_shape() {
        let arr = Array::from_points(&[[1.5, 2.0, 3.0]]);
        let wide = arr.to_f64();
        assert_eq!(wide.dtype(), DType::F64);
        assert_eq!(wide.shape(), arr.shape());

        let ints = arr.to_i32();
        assert_eq!(ints.dtype(), DType::I32);
        assert_eq!(ints.as_i32().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_row() {
        let arr = Array::from_points(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let row = arr.row(1).unwrap();
        assert_eq!(row.shape(), &[3]);
        assert_eq!(row.as_f32().unwrap(), &[4.0, 5.0, 6.0]);
        assert!(arr.row(2).is_none());
        assert!(row.row(0).is_none());
    }

    #[test]
    fn test_scalar_shape() {
        let scalar = Array::from_f32(vec![], vec![1.0]).unwrap();
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.rows(), 0);
    }
}

//! Errors raised by array construction, input validation and subsampling.

use thiserror::Error;

use super::array::DType;

/// Coarse classification of a [`SubsampleError`].
///
/// Bindings map `InvalidType` onto their "wrong type / missing value" error
/// and `InvalidArgument` onto their "bad value" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required argument was absent.
    InvalidType,
    /// An argument was present but had the wrong element type, rank,
    /// shape or value.
    InvalidArgument,
}

/// Errors that can occur before or during subsampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubsampleError {
    #[error("{0} must not be None")]
    MissingArgument(&'static str),

    #[error("{name} must have element type {expected}, got {actual}")]
    WrongDType {
        name: &'static str,
        expected: DType,
        actual: DType,
    },

    #[error("{name} must be a {expected}-D array, got shape {shape:?}")]
    WrongRank {
        name: &'static str,
        expected: usize,
        shape: Vec<usize>,
    },

    #[error("{name} must have {expected} columns, got shape {shape:?}")]
    WrongInnerDim {
        name: &'static str,
        expected: usize,
        shape: Vec<usize>,
    },

    #[error("{name} has {actual} rows but points has {expected}")]
    RowCountMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("batch sizes sum to {sum} but points has {num_points} rows")]
    BatchSumMismatch { sum: i64, num_points: usize },

    #[error("batch size at index {index} is negative ({value})")]
    NegativeBatchSize { index: usize, value: i32 },

    #[error("cell size must be finite and > 0, got {0}")]
    InvalidCellSize(f32),

    #[error("shape {shape:?} holds {expected} elements but data has {actual}")]
    ShapeDataMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

impl SubsampleError {
    /// Classify this error as a missing argument or a bad argument.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingArgument(_) => ErrorKind::InvalidType,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

/// Result type for validation and subsampling.
pub type Result<T> = std::result::Result<T, SubsampleError>;

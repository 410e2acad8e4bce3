//! Core data types and I/O operations.

pub mod array;
pub mod cloud;
pub mod error;
pub mod loaders;
pub mod writers;

pub use array::{Array, ArrayData, DType};
pub use cloud::{FeatureMatrix, PointCloud};
pub use error::{ErrorKind, SubsampleError};
pub use loaders::{detect_format, load_point_cloud, FileFormat, LoaderError};
pub use writers::{write_csv, write_ply, write_point_cloud, WriteError};

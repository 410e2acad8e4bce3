//! Data writers for PLY and CSV formats.
//!
//! Both writers emit the same column layout the loaders read back:
//! `x, y, z`, then one column per feature, then the label column.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::cloud::PointCloud;
use super::loaders::{detect_format, FileFormat, LoaderError};
use crate::config::IoConfig;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// An attribute does not have one row per point.
    #[error("{name} has {actual} rows but the cloud has {expected} points")]
    RowCountMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Output path has no supported extension.
    #[error(transparent)]
    Format(#[from] LoaderError),
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Creates a buffered writer for the given path.
fn create_buffered_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

/// Check that features and labels have one row per point.
fn check_rows(cloud: &PointCloud) -> Result<()> {
    let n = cloud.len();
    if let Some(features) = &cloud.features {
        if features.rows() != n {
            return Err(WriteError::RowCountMismatch {
                name: "features",
                expected: n,
                actual: features.rows(),
            });
        }
    }
    if let Some(labels) = &cloud.labels {
        if labels.len() != n {
            return Err(WriteError::RowCountMismatch {
                name: "labels",
                expected: n,
                actual: labels.len(),
            });
        }
    }
    Ok(())
}

/// Column names in output order.
fn header(cloud: &PointCloud, label_column: &str) -> Vec<String> {
    let mut names = vec!["x".to_string(), "y".to_string(), "z".to_string()];
    if let Some(features) = &cloud.features {
        names.extend(features.names.iter().cloned());
    }
    if cloud.labels.is_some() {
        names.push(label_column.to_string());
    }
    names
}

/// Formatted values of row `i` in output order.
fn row_values(cloud: &PointCloud, i: usize) -> Vec<String> {
    let [x, y, z] = cloud.points[i];
    let mut values = vec![
        format!("{:.6}", x),
        format!("{:.6}", y),
        format!("{:.6}", z),
    ];
    if let Some(features) = &cloud.features {
        values.extend(features.row(i).iter().map(|v| format!("{:.6}", v)));
    }
    if let Some(labels) = &cloud.labels {
        values.push(labels[i].to_string());
    }
    values
}

/// Write a point cloud to an ASCII PLY file.
///
/// Coordinates and features are written as `float` properties, labels as an
/// `int` property named `label_column`.
///
/// # Errors
///
/// Returns an error if:
/// - Features or labels do not have one row per point
/// - Parent directories cannot be created
/// - File cannot be created or written to
///
/// # Example
///
/// ```no_run
/// use voxel_subsample::core::cloud::PointCloud;
/// use voxel_subsample::core::writers::write_ply;
/// use std::path::Path;
///
/// let cloud = PointCloud::default();
/// write_ply(Path::new("output.ply"), &cloud, "label").unwrap();
/// ```
pub fn write_ply(path: &Path, cloud: &PointCloud, label_column: &str) -> Result<()> {
    check_rows(cloud)?;
    ensure_parent_dirs(path)?;
    let mut writer = create_buffered_writer(path)?;

    let path_str = path.display().to_string();
    let write_err = |e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    };

    let mut head = format!(
        "ply\nformat ascii 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\n",
        cloud.len()
    );
    if let Some(features) = &cloud.features {
        for name in &features.names {
            head.push_str(&format!("property float {}\n", name));
        }
    }
    if cloud.labels.is_some() {
        head.push_str(&format!("property int {}\n", label_column));
    }
    head.push_str("end_header\n");
    writer.write_all(head.as_bytes()).map_err(write_err)?;

    for i in 0..cloud.len() {
        writeln!(writer, "{}", row_values(cloud, i).join(" ")).map_err(write_err)?;
    }

    writer.flush().map_err(write_err)?;

    Ok(())
}

/// Write a point cloud to CSV with a header row.
///
/// # Errors
///
/// Returns an error if:
/// - Features or labels do not have one row per point
/// - Parent directories cannot be created
/// - File cannot be created or written to
///
/// # Example
///
/// ```no_run
/// use voxel_subsample::core::cloud::PointCloud;
/// use voxel_subsample::core::writers::write_csv;
/// use std::path::Path;
///
/// let cloud = PointCloud::from_points(vec![[1.0, 2.0, 3.0]]).with_labels(vec![0]);
/// write_csv(Path::new("labels.csv"), &cloud, "label").unwrap();
/// ```
pub fn write_csv(path: &Path, cloud: &PointCloud, label_column: &str) -> Result<()> {
    check_rows(cloud)?;
    ensure_parent_dirs(path)?;

    let buf_writer = create_buffered_writer(path)?;
    let mut csv_writer = csv::Writer::from_writer(buf_writer);

    let path_str = path.display().to_string();
    let csv_err = |e| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record(header(cloud, label_column))
        .map_err(csv_err)?;

    for i in 0..cloud.len() {
        csv_writer
            .write_record(row_values(cloud, i))
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write a PLY or CSV point cloud, picking the writer from the extension.
pub fn write_point_cloud(path: &Path, cloud: &PointCloud, io: &IoConfig) -> Result<()> {
    match detect_format(path)? {
        FileFormat::Ply => write_ply(path, cloud, &io.label_column),
        FileFormat::Csv => write_csv(path, cloud, &io.label_column),
    }
}

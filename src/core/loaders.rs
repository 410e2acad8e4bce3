//! Data loaders for point cloud files.
//!
//! This module provides parsers for:
//! - ASCII PLY files with arbitrary scalar vertex properties
//! - CSV files with a header row
//!
//! In both formats the `x`, `y`, `z` columns become point coordinates, the
//! configured label column becomes integer class labels and every other
//! column becomes a feature column, in file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use super::cloud::{FeatureMatrix, PointCloud};
use crate::config::IoConfig;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid PLY file: {0}")]
    InvalidPly(String),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Point cloud file format, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// ASCII PLY
    Ply,
    /// CSV with a header row
    Csv,
}

impl FileFormat {
    /// File extension used when writing this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Ply => "ply",
            Self::Csv => "csv",
        }
    }
}

/// Detect the file format from the path extension (case-insensitive).
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<FileFormat> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("ply") => Ok(FileFormat::Ply),
        Some("csv") => Ok(FileFormat::Csv),
        _ => Err(LoaderError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Role of each column of an input file.
#[derive(Debug, Default)]
struct ColumnLayout {
    xyz: [usize; 3],
    label: Option<usize>,
    features: Vec<usize>,
    feature_names: Vec<String>,
}

impl ColumnLayout {
    fn from_names(names: &[String], io: &IoConfig) -> Result<Self> {
        let find = |wanted: &str| {
            names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(wanted))
        };

        let x = find("x").ok_or_else(|| LoaderError::MissingColumns("x".to_string()))?;
        let y = find("y").ok_or_else(|| LoaderError::MissingColumns("y".to_string()))?;
        let z = find("z").ok_or_else(|| LoaderError::MissingColumns("z".to_string()))?;
        let label_idx = find(io.label_column.as_str());

        let mut layout = ColumnLayout {
            xyz: [x, y, z],
            label: label_idx.filter(|_| io.keep_labels),
            ..Default::default()
        };

        if io.keep_features {
            for (i, name) in names.iter().enumerate() {
                if i == x || i == y || i == z || Some(i) == label_idx {
                    continue;
                }
                layout.features.push(i);
                layout.feature_names.push(name.clone());
            }
        }

        Ok(layout)
    }

    fn num_columns(&self) -> usize {
        let max_feature = self.features.iter().copied().max().unwrap_or(0);
        let max_xyz = self.xyz.iter().copied().max().unwrap_or(0);
        max_feature.max(max_xyz).max(self.label.unwrap_or(0)) + 1
    }
}

/// Parse an integer label, also accepting integral floats such as `3.0`.
fn parse_label(raw: &str) -> Option<i32> {
    if let Ok(label) = raw.parse::<i32>() {
        return Some(label);
    }
    let value = raw.parse::<f64>().ok()?;
    let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// Upper bound on rows preallocated from a size hint such as a PLY header.
const MAX_PREALLOC_ROWS: usize = 1 << 20;

/// Accumulates parsed rows into a [`PointCloud`].
struct CloudBuilder<'a> {
    layout: &'a ColumnLayout,
    points: Vec<[f32; 3]>,
    features: Vec<f32>,
    labels: Vec<i32>,
}

impl<'a> CloudBuilder<'a> {
    fn new(layout: &'a ColumnLayout, capacity: usize) -> Self {
        let capacity = capacity.min(MAX_PREALLOC_ROWS);
        Self {
            layout,
            points: Vec::with_capacity(capacity),
            features: Vec::with_capacity(capacity.saturating_mul(layout.features.len())),
            labels: Vec::new(),
        }
    }

    fn push_row<'s, F>(&mut self, get: F, row: usize) -> Result<()>
    where
        F: Fn(usize) -> Option<&'s str>,
    {
        let field = |idx: usize| {
            get(idx).ok_or_else(|| {
                LoaderError::ParseError(format!("row {}: missing column {}", row, idx))
            })
        };
        let float = |idx: usize| -> Result<f32> {
            let raw = field(idx)?.trim();
            raw.parse().map_err(|_| {
                LoaderError::ParseError(format!("row {}: invalid number '{}'", row, raw))
            })
        };

        let [xi, yi, zi] = self.layout.xyz;
        self.points.push([float(xi)?, float(yi)?, float(zi)?]);

        for &idx in &self.layout.features {
            self.features.push(float(idx)?);
        }

        if let Some(idx) = self.layout.label {
            let raw = field(idx)?.trim();
            let label = parse_label(raw).ok_or_else(|| {
                LoaderError::ParseError(format!("row {}: invalid label '{}'", row, raw))
            })?;
            self.labels.push(label);
        }

        Ok(())
    }

    fn finish(self) -> PointCloud {
        let features = (!self.layout.features.is_empty()).then(|| {
            FeatureMatrix::with_names(self.layout.feature_names.clone(), self.features)
        });
        let labels = self.layout.label.map(|_| self.labels);
        PointCloud {
            points: self.points,
            features,
            labels,
        }
    }
}

/// Load a point cloud from a CSV file with a header row.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
/// * `io` - Column handling options
///
/// # Errors
///
/// Returns an error if the file cannot be read, lacks x/y/z columns, holds a
/// non-numeric value, or has no data rows.
pub fn load_csv<P: AsRef<Path>>(path: P, io: &IoConfig) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let names: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let layout = ColumnLayout::from_names(&names, io)?;

    let mut builder = CloudBuilder::new(&layout, 10_000);
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        builder.push_row(|idx| record.get(idx), row + 1)?;
    }

    let cloud = builder.finish();
    if cloud.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok(cloud)
}

/// Load a point cloud from an ASCII PLY file.
///
/// Supports PLY files with a vertex element containing:
/// - Required: x, y, z properties
/// - Optional: a label property (name from `io.label_column`)
/// - Optional: any number of further scalar properties, read as features
///
/// List properties and elements other than `vertex` are not supported.
///
/// # Errors
///
/// Returns an error if the file is not a valid ASCII PLY or lacks required
/// properties.
pub fn load_ply<P: AsRef<Path>>(path: P, io: &IoConfig) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    // Check PLY magic number
    let first_line = lines
        .next()
        .ok_or_else(|| LoaderError::InvalidPly("Empty file".to_string()))??;

    if !first_line.trim().starts_with("ply") {
        return Err(LoaderError::InvalidPly(format!(
            "{} is not a PLY file",
            path.display()
        )));
    }

    // Parse header
    let mut num_vertices: Option<usize> = None;
    let mut prop_names: Vec<String> = Vec::new();
    let mut header_done = false;
    let mut in_vertex = false;

    for line in &mut lines {
        let line = line?;
        let stripped = line.trim();

        if stripped.starts_with("format") {
            if !stripped.contains("ascii") {
                return Err(LoaderError::InvalidPly(format!(
                    "only ASCII PLY is supported, got '{}'",
                    stripped
                )));
            }
        } else if stripped.starts_with("element") {
            let parts: Vec<&str> = stripped.split_whitespace().collect();
            in_vertex = parts.get(1) == Some(&"vertex");
            if in_vertex {
                num_vertices = parts.last().and_then(|s| s.parse().ok());
            } else if parts.last() != Some(&"0") {
                return Err(LoaderError::InvalidPly(format!(
                    "unsupported element: {}",
                    stripped
                )));
            }
        } else if stripped.starts_with("property") && in_vertex {
            let parts: Vec<&str> = stripped.split_whitespace().collect();
            if parts.get(1) == Some(&"list") {
                return Err(LoaderError::InvalidPly(
                    "list properties are not supported".to_string(),
                ));
            }
            if let Some(name) = parts.last() {
                prop_names.push(name.to_string());
            }
        } else if stripped == "end_header" {
            header_done = true;
            break;
        }
    }

    let num_vertices = num_vertices
        .ok_or_else(|| LoaderError::InvalidPly("No vertex count in header".to_string()))?;

    if !header_done {
        return Err(LoaderError::InvalidPly("Missing end_header".to_string()));
    }

    let layout = ColumnLayout::from_names(&prop_names, io)?;
    let min_columns = layout.num_columns();
    let mut builder = CloudBuilder::new(&layout, num_vertices);

    // Parse vertex data
    let mut vertex_count = 0;
    for line in lines {
        if vertex_count >= num_vertices {
            break;
        }

        let line = line?;
        let values: Vec<&str> = line.split_whitespace().collect();

        if values.is_empty() {
            continue;
        }
        if values.len() < min_columns {
            return Err(LoaderError::InvalidPly(format!(
                "vertex {} has {} values, expected at least {}",
                vertex_count,
                values.len(),
                min_columns
            )));
        }

        builder.push_row(|idx| values.get(idx).copied(), vertex_count)?;
        vertex_count += 1;
    }

    if vertex_count < num_vertices {
        return Err(LoaderError::InvalidPly(format!(
            "Expected {} vertices, found {}",
            num_vertices, vertex_count
        )));
    }

    let cloud = builder.finish();
    if cloud.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok(cloud)
}

/// Load a PLY or CSV point cloud, picking the parser from the extension.
pub fn load_point_cloud<P: AsRef<Path>>(path: P, io: &IoConfig) -> Result<PointCloud> {
    let path = path.as_ref();
    match detect_format(path)? {
        FileFormat::Ply => load_ply(path, io),
        FileFormat::Csv => load_csv(path, io),
    }
}

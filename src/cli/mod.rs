//! Command-line interface for voxel-grid subsampling.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{IoConfig, SubsampleConfig};
use crate::core::loaders::{detect_format, load_point_cloud};
use crate::core::writers::write_point_cloud;
use crate::processors::subsample::{subsample_cloud, subsample_clouds};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "voxel-subsample")]
#[command(about = "Voxel-grid point cloud subsampling", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subsample a single PLY or CSV point cloud
    Subsample {
        /// Input PLY or CSV file
        input: PathBuf,
        /// Output PLY or CSV file
        output: PathBuf,
        /// Grid cell edge length (overrides config)
        #[arg(short = 'd', long)]
        cell_size: Option<f32>,
        /// Drop feature columns
        #[arg(long)]
        no_features: bool,
        /// Drop the label column
        #[arg(long)]
        no_labels: bool,
    },

    /// Subsample several point clouds as one batch
    Batch {
        /// Input PLY or CSV files, processed in the given order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory for subsampled files
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Grid cell edge length (overrides config)
        #[arg(short = 'd', long)]
        cell_size: Option<f32>,
        /// Process clouds one after another instead of in parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Write the default configuration as YAML
    InitConfig {
        /// Destination YAML file
        path: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    let result = match cli.command {
        Commands::Subsample {
            input,
            output,
            cell_size,
            no_features,
            no_labels,
        } => cmd_subsample(&input, &output, cell_size, no_features, no_labels, &config),
        Commands::Batch {
            inputs,
            output_dir,
            cell_size,
            sequential,
        } => cmd_batch(&inputs, &output_dir, cell_size, sequential, &config),
        Commands::InitConfig { path } => cmd_init_config(&path),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Subsample settings with CLI overrides applied.
fn effective_subsample(config: &PipelineConfig, cell_size: Option<f32>) -> SubsampleConfig {
    SubsampleConfig {
        cell_size: cell_size.unwrap_or(config.subsample.cell_size),
        ..config.subsample.clone()
    }
}

fn cmd_subsample(
    input: &Path,
    output: &Path,
    cell_size: Option<f32>,
    no_features: bool,
    no_labels: bool,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    let io = IoConfig {
        keep_features: config.io.keep_features && !no_features,
        keep_labels: config.io.keep_labels && !no_labels,
        ..config.io.clone()
    };
    let sub = effective_subsample(config, cell_size);

    println!("Subsampling point cloud...");
    println!("Input: {}", input.display());
    println!("Output: {}", output.display());
    println!("Cell size: {}", sub.cell_size);

    let spinner = create_spinner("Loading point cloud...");

    let result = (|| {
        let cloud = load_point_cloud(input, &io)
            .with_context(|| format!("failed to load {}", input.display()))?;

        spinner.set_message("Subsampling...");
        let reduced = subsample_cloud(&cloud, &sub).context("subsampling failed")?;

        spinner.set_message("Writing output...");
        write_point_cloud(output, &reduced, &io)
            .with_context(|| format!("failed to write {}", output.display()))?;

        Ok::<_, anyhow::Error>((cloud, reduced))
    })();

    spinner.finish_and_clear();
    let (cloud, reduced) = result?;

    info!(
        "{}: {} points -> {} points",
        input.display(),
        cloud.len(),
        reduced.len()
    );

    print_summary(
        "Subsample Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output file", output.display().to_string()),
            ("Cell size", sub.cell_size.to_string()),
            ("Input points", cloud.len().to_string()),
            ("Output points", reduced.len().to_string()),
            ("Feature columns", reduced.feature_dim().to_string()),
            ("Labels", reduced.labels.is_some().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

/// Output path `<dir>/<stem>_subsampled.<ext>` for a batch input.
fn batch_output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let format = detect_format(input)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "cloud".to_string());
    Ok(output_dir.join(format!("{}_subsampled.{}", stem, format.extension())))
}

fn cmd_batch(
    inputs: &[PathBuf],
    output_dir: &Path,
    cell_size: Option<f32>,
    sequential: bool,
    config: &PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    let mut sub = effective_subsample(config, cell_size);
    if sequential {
        sub.parallel_batches = false;
    }

    let outputs = inputs
        .iter()
        .map(|input| batch_output_path(input, output_dir))
        .collect::<Result<Vec<_>>>()?;
    for (i, out) in outputs.iter().enumerate() {
        if outputs[..i].contains(out) {
            bail!("two inputs map to the same output file {}", out.display());
        }
    }

    println!("Subsampling batch of {} clouds...", inputs.len());
    println!("Output directory: {}", output_dir.display());
    println!("Cell size: {}", sub.cell_size);

    let spinner = create_spinner("Loading point clouds...");

    let result = (|| {
        let mut clouds = Vec::with_capacity(inputs.len());
        for input in inputs {
            spinner.set_message(format!("Loading {}...", input.display()));
            let cloud = load_point_cloud(input, &config.io)
                .with_context(|| format!("failed to load {}", input.display()))?;
            clouds.push(cloud);
        }

        spinner.set_message("Subsampling batch...");
        let reduced = subsample_clouds(&clouds, &sub).context("batch subsampling failed")?;

        for (cloud, out) in reduced.iter().zip(&outputs) {
            spinner.set_message(format!("Writing {}...", out.display()));
            write_point_cloud(out, cloud, &config.io)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }

        Ok::<_, anyhow::Error>((clouds, reduced))
    })();

    spinner.finish_and_clear();
    let (clouds, reduced) = result?;

    for ((input, before), after) in inputs.iter().zip(&clouds).zip(&reduced) {
        info!(
            "{}: {} points -> {} points",
            input.display(),
            before.len(),
            after.len()
        );
    }

    let total_in: usize = clouds.iter().map(|c| c.len()).sum();
    let total_out: usize = reduced.iter().map(|c| c.len()).sum();

    print_summary(
        "Batch Subsample Complete",
        &[
            ("Clouds", inputs.len().to_string()),
            ("Output directory", output_dir.display().to_string()),
            ("Cell size", sub.cell_size.to_string()),
            ("Input points", total_in.to_string()),
            ("Output points", total_out.to_string()),
            ("Parallel", sub.parallel_batches.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    PipelineConfig::default()
        .to_yaml(path)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

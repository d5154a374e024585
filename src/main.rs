//! toolpath CLI - drive the pathing and G-code pipeline from captured jobs
//!
//! Usage:
//!   toolpath-cli generate <job.json> -o <output.gcode> [options]
//!   toolpath-cli generate <job.json> --config my_config.json --first 0 --last 20
//!   toolpath-cli info <job.json>
//!
//! A job file is the serialized output of the upstream regioner: the layer
//! measure, the raster grid and the per-layer skeleton regions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;
use toolpath::progress::ProgressSink;
use toolpath::{GCoder, Grid, LayerMeasure, LayerPaths, Pather, PrintConfig, Skeleton};

/// Toolpath generation and G-code emission for fused-filament printers
#[derive(Parser, Debug)]
#[command(name = "toolpath-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate G-code from a captured job file
    Generate {
        /// Input job file (JSON)
        #[arg(value_name = "JOB")]
        job: PathBuf,

        /// Output G-code file
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Print configuration file (JSON)
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// First slice index to path (negative = from the start)
        #[arg(long, default_value = "-1")]
        first: i32,

        /// Last slice index to path (negative = to the end)
        #[arg(long, default_value = "-1")]
        last: i32,

        /// Title recorded in the G-code header (defaults to the job name)
        #[arg(long)]
        title: Option<String>,
    },

    /// Display information about a job file
    Info {
        /// Input job file (JSON)
        #[arg(value_name = "JOB")]
        job: PathBuf,
    },
}

/// A captured pathing job: everything the regioner hands downstream.
#[derive(Debug, Serialize, Deserialize)]
struct JobFile {
    measure: LayerMeasure,
    grid: Grid,
    skeleton: Skeleton,
}

impl JobFile {
    fn load(path: &PathBuf) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse job file {}", path.display()))
    }
}

/// Bridges the library progress sink onto an indicatif bar.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl ProgressSink for BarProgress {
    fn init_progress(&mut self, name: &str, total: usize) {
        self.bar = ProgressBar::new(total as u64);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        self.bar.set_message(name.to_string());
    }

    fn tick(&mut self) {
        self.bar.inc(1);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Generate {
            job,
            output,
            config,
            first,
            last,
            title,
        } => cmd_generate(job, output, config, first, last, title),
        Commands::Info { job } => cmd_info(job),
    }
}

fn cmd_generate(
    job_path: PathBuf,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
    first: i32,
    last: i32,
    title: Option<String>,
) -> Result<()> {
    info!("Loading job file: {}", job_path.display());
    let job = JobFile::load(&job_path)?;

    let config = match config_path {
        Some(path) => {
            info!("Loading print config from: {}", path.display());
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<PrintConfig>(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => PrintConfig::default(),
    };
    config.validate().context("Invalid print configuration")?;

    let output_path = output.unwrap_or_else(|| job_path.with_extension("gcode"));
    let file_title = title.unwrap_or_else(|| {
        job_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    });

    info!("Job layers: {}", job.skeleton.len());

    let mut progress = BarProgress::new();
    let mut pather = Pather::new(&config);
    let mut layerpaths = LayerPaths::new();
    pather.generate_paths(
        &job.skeleton,
        &job.measure,
        &job.grid,
        &mut layerpaths,
        first,
        last,
        &mut progress,
    );
    progress.bar.finish_and_clear();

    let file = fs::File::create(&output_path)
        .with_context(|| format!("Failed to create output file {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut gcoder = GCoder::new(&config);
    gcoder
        .write_gcode_file(&layerpaths, &job.measure, &mut writer, &file_title)
        .context("G-code emission failed")?;

    println!(
        "Wrote {} layer{} to {}",
        layerpaths.len(),
        if layerpaths.len() == 1 { "" } else { "s" },
        output_path.display()
    );
    Ok(())
}

fn cmd_info(job_path: PathBuf) -> Result<()> {
    let job = JobFile::load(&job_path)?;

    println!("Job: {}", job_path.display());
    println!("  Layers: {}", job.skeleton.len());
    println!(
        "  Grid lines: {} x, {} y",
        job.grid.x_values().len(),
        job.grid.y_values().len()
    );

    let mut outline_count = 0usize;
    let mut inset_count = 0usize;
    let mut spur_count = 0usize;
    for regions in &job.skeleton.layers {
        outline_count += regions.outline_loops.len();
        inset_count += regions.inset_loops.iter().map(Vec::len).sum::<usize>();
        spur_count += regions.spur_paths.iter().map(Vec::len).sum::<usize>();
    }
    println!("  Outline loops: {outline_count}");
    println!("  Inset loops: {inset_count}");
    println!("  Spur paths: {spur_count}");
    Ok(())
}

//! CLI entry point for the vessel feature pipeline.
//!
//! Provides subcommands for processing a single CSV of position reports and
//! for running a date range of partitioned input, with optional upload of the
//! resulting partitions to S3.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vessel_features::config::PipelineConfig;
use vessel_features::output::{append_records, print_json, write_partitions};
use vessel_features::pipeline::run_pipeline;
use vessel_features::source::{read_file, read_partitioned};
use vessel_features::stats::RunStats;
use vessel_features::upload::{S3Store, upload_partitions};

#[derive(Parser)]
#[command(name = "vessel_features")]
#[command(about = "Resample, trim and featurize vessel position tracks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single CSV file (plain or .gz) of position reports
    Process {
        /// Path to the input CSV
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// CSV file to append feature records to
        #[arg(short, long, default_value = "features.csv")]
        output: String,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Process a date range of daily partitions (date=YYYY-MM-DD.csv[.gz])
    Run {
        /// Directory containing the daily source partitions
        #[arg(short = 'i', long)]
        input_dir: PathBuf,

        /// First date to produce, inclusive (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,

        /// Last date to produce, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end_date: NaiveDate,

        /// Directory to write daily feature partitions to
        #[arg(short = 'd', long, default_value = "features")]
        output_dir: PathBuf,

        /// Gzip compress the output partitions
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Optional: S3 bucket name to upload partitions to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Key prefix for uploaded partitions
        #[arg(long, default_value = "features")]
        s3_prefix: String,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON file with pipeline parameters; flags below override it
    #[arg(long)]
    config: Option<String>,

    /// Sampling increment in minutes [default: 15]
    #[arg(long)]
    increment_min: Option<f64>,

    /// Largest gap in minutes to interpolate across [default: 120]
    #[arg(long)]
    max_gap_min: Option<f64>,

    /// Radius in km a vessel must stay within to count as stationary [default: 0.8]
    #[arg(long)]
    max_distance_km: Option<f64>,

    /// Shortest stationary period in minutes that gets trimmed [default: 2880]
    #[arg(long)]
    min_period_min: Option<f64>,
}

impl ConfigArgs {
    fn build(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("failed to load config from {path}"))?,
            None => PipelineConfig::default(),
        };

        if let Some(v) = self.increment_min {
            config.resample.increment_min = v;
        }
        if let Some(v) = self.max_gap_min {
            config.resample.max_gap_min = v;
        }
        if let Some(v) = self.max_distance_km {
            config.trim.max_distance_km = v;
        }
        if let Some(v) = self.min_period_min {
            config.trim.min_period_min = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/vessel_features.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vessel_features.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            source,
            output,
            config,
        } => {
            let config = config.build()?;
            process_file(source, output, config).await?;
        }
        Commands::Run {
            input_dir,
            start_date,
            end_date,
            output_dir,
            gzip,
            s3_bucket,
            s3_prefix,
            config,
        } => {
            let config = config.build()?;
            run_range(
                input_dir, start_date, end_date, output_dir, gzip, s3_bucket, s3_prefix, config,
            )
            .await?;
        }
    }

    Ok(())
}

/// Runs the pipeline over one file and appends the records to `output`.
#[tracing::instrument(skip(source, config), fields(source = %source.display()))]
async fn process_file(source: PathBuf, output: String, config: PipelineConfig) -> Result<()> {
    let stats = tokio::task::spawn_blocking(move || -> Result<RunStats> {
        let mut stats = RunStats::new();
        let observations = read_file(&source, &mut stats)
            .with_context(|| format!("failed to read {}", source.display()))?;
        info!(
            rows = stats.rows_read,
            malformed = stats.malformed_rows,
            "Source read"
        );

        let records = run_pipeline(observations, &config, &mut stats);
        append_records(&output, &records)?;
        stats.records_written = records.len();
        Ok(stats)
    })
    .await??;

    log_summary(&stats)?;
    Ok(())
}

/// Processes `[start_date, end_date]` from daily partitions, writes daily
/// feature partitions and optionally uploads them.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(
    skip(input_dir, output_dir, config, s3_bucket),
    fields(input_dir = %input_dir.display(), output_dir = %output_dir.display())
)]
async fn run_range(
    input_dir: PathBuf,
    start_date: NaiveDate,
    end_date: NaiveDate,
    output_dir: PathBuf,
    gzip: bool,
    s3_bucket: Option<String>,
    s3_prefix: String,
    config: PipelineConfig,
) -> Result<()> {
    let (stats, partitions) = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut stats = RunStats::new();
        let observations = read_partitioned(&input_dir, start_date, end_date, &mut stats)?;
        info!(
            rows = stats.rows_read,
            malformed = stats.malformed_rows,
            observations = observations.len(),
            "Source partitions read"
        );

        let records = run_pipeline(observations, &config, &mut stats);
        let partitions = write_partitions(&output_dir, &records, Some(start_date), gzip)?;

        stats.records_written = partitions.iter().map(|p| p.records).sum();
        stats.partitions_written = partitions.len();
        Ok((stats, partitions))
    })
    .await??;

    if partitions.is_empty() {
        warn!("No feature records produced for the requested range");
    }

    log_summary(&stats)?;

    match s3_bucket {
        Some(bucket) if !bucket.is_empty() => {
            info!(bucket = %bucket, prefix = %s3_prefix, gzip, "S3 upload enabled");
            let aws = aws_config::load_from_env().await;
            let store = S3Store::new(&aws, bucket);
            upload_partitions(&store, &s3_prefix, &partitions, &stats).await?;
        }
        _ => info!("S3 bucket not specified, skipping upload"),
    }

    Ok(())
}

fn log_summary(stats: &RunStats) -> Result<()> {
    info!(
        tracks = stats.tracks,
        insufficient_tracks = stats.insufficient_tracks,
        malformed_pct = stats.malformed_pct(),
        trimmed_pct = stats.trimmed_pct(),
        records_written = stats.records_written,
        "Run complete"
    );
    print_json(stats)
}

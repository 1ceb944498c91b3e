//! liftmetrics - Deduplication and duty-cycle analytics for lift controller logs.
//!
//! Usage:
//!   liftmetrics --config lifts.toml run        Run every stage
//!   liftmetrics --root /srv/lifts dedup        Remove duplicate downloads
//!   liftmetrics --root /srv/lifts clean        Remove adjacent duplicate rows
//!   liftmetrics --root /srv/lifts analyze      Write per-lift metrics
//!   liftmetrics --help                         Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use liftmetrics_core::PipelineConfig;
use liftmetrics_pipeline::{Pipeline, PipelineRunner, RunSummary, Stage};

/// Loaded when neither `--config` nor `--root` is given.
const DEFAULT_CONFIG: &str = "liftmetrics.toml";

#[derive(Parser)]
#[command(
    name = "liftmetrics",
    version,
    about = "Deduplication and duty-cycle analytics for lift controller logs",
    long_about = "liftmetrics removes duplicate downloads and repeated samples from lift \
                  controller logs, then writes per-lift brake, door, floor, mileage and \
                  mode metrics as JSON."
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory (overrides `root` from the configuration file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Analyze lifts in parallel
    #[arg(short, long, global = true)]
    parallel: bool,

    /// Output format for the run summary
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline (every stage unless --stage is given)
    Run {
        /// Stage to run; repeat to select several, in pipeline order
        #[arg(short, long = "stage")]
        stages: Vec<Stage>,
    },

    /// Remove duplicate files and directories from the raw tree
    Dedup,

    /// Write row-deduplicated copies of the raw logs
    Clean,

    /// Write per-lift metrics and floor modes from the clean logs
    Analyze,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref(), cli.root)?;
    if cli.parallel {
        config.parallel_lifts = true;
    }

    let pipeline = match cli.command {
        Command::Run { stages } if stages.is_empty() => Pipeline::standard(),
        Command::Run { stages } => Pipeline::new(stages).context("Invalid stage selection")?,
        Command::Dedup => Pipeline::new(vec![Stage::FileDedup])?,
        Command::Clean => Pipeline::new(vec![Stage::RowDedup])?,
        Command::Analyze => Pipeline::analytics(),
    };

    if pipeline.contains(Stage::FileDedup) && config.removal.is_destructive() {
        tracing::info!("duplicates will be deleted permanently");
    }

    let runner = PipelineRunner::new(config, pipeline).context("Invalid configuration")?;
    let summary = runner.run().context("Pipeline failed")?;

    match cli.format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

/// Install a stderr subscriber filtered by `RUST_LOG`, defaulting to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Resolve configuration from the file and command-line overrides.
fn load_config(path: Option<&Path>, root: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut config = match (path, &root) {
        (Some(path), _) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Cannot load {}", path.display()))?,
        (None, Some(root)) => PipelineConfig::new(root),
        (None, None) if Path::new(DEFAULT_CONFIG).exists() => {
            PipelineConfig::from_toml_file(DEFAULT_CONFIG)
                .with_context(|| format!("Cannot load {DEFAULT_CONFIG}"))?
        }
        (None, None) => bail!("No configuration: pass --config <FILE> or --root <DIR>"),
    };
    if let Some(root) = root {
        config.root = root;
    }
    Ok(config)
}

/// Print a human-readable run summary.
fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "─".repeat(70));
    println!(
        " liftmetrics - {} stage(s) in {:.2}s",
        summary.stages.len(),
        summary.duration.as_secs_f64()
    );
    println!("{}", "─".repeat(70));

    if let Some(dedup) = &summary.dedup {
        println!();
        println!(" File deduplication ({})", dedup.root.display());
        println!(
            "   {} files hashed, {} directories hashed",
            dedup.files_hashed, dedup.dirs_hashed
        );
        println!(
            "   {} duplicate files and {} duplicate directories removed",
            dedup.files_removed(),
            dedup.dirs_removed()
        );
        println!("   Reclaimed {}", format_size(dedup.bytes_reclaimed));
        for removal in &dedup.removed {
            match &removal.quarantined_to {
                Some(target) => println!(
                    "     {} -> {}",
                    removal.path.display(),
                    target.display()
                ),
                None => println!("     {}", removal.path.display()),
            }
        }
    }

    if let Some(rows) = &summary.rows {
        println!();
        println!(" Row deduplication");
        println!(
            "   {} files, {} of {} rows removed",
            rows.files_processed, rows.rows_removed, rows.rows_read
        );
    }

    if !summary.artifacts.is_empty() {
        println!();
        println!(
            " {} artifact(s) for {} lift(s)",
            summary.artifacts.len(),
            summary.lifts_analyzed
        );
        for artifact in &summary.artifacts {
            println!("   {:<12} {}", artifact.family, artifact.path.display());
        }
    }

    let warnings = summary
        .dedup
        .iter()
        .flat_map(|d| &d.warnings)
        .chain(summary.rows.iter().flat_map(|r| &r.warnings))
        .chain(&summary.warnings);
    if summary.has_warnings() {
        println!();
        println!(" Warnings:");
        for warning in warnings {
            println!("   {}: {}", warning.path.display(), warning.message);
        }
    }
    println!();
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

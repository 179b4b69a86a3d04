//! thermoscan CLI — command-line frontend for thermal anomaly analysis.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use thermoscan::{
    sensitivity_overrides, AnomalyClass, BoundingBox, CandidateRegion, DetectionConfig, Detector,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "thermoscan")]
#[command(about = "Classify thermal anomalies in electrical-equipment inspection images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a maintenance image, optionally against a baseline.
    Analyze(CliAnalyzeArgs),

    /// Print the anomaly class table (labels, severities, display colors).
    ClassInfo,

    /// Print the default detection parameter tree.
    ConfigDump,
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the maintenance thermal image.
    #[arg(long)]
    image: PathBuf,

    /// Optional baseline image the maintenance frame is registered against.
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// JSON file with externally-proposed candidate boxes
    /// ([{"x":..,"y":..,"width":..,"height":..,"confidence":..}, ...]).
    #[arg(long)]
    candidates: Option<PathBuf>,

    /// Path to write the analysis result (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Detection parameter tree (JSON file) replacing the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sensitivity percentage (0-100) mapped onto contrast thresholds.
    #[arg(long)]
    sensitivity: Option<u8>,

    /// Inline JSON override tree deep-merged into the configuration.
    #[arg(long)]
    overrides_json: Option<String>,
}

/// Candidate box as supplied by an external detector run.
#[derive(Debug, Deserialize)]
struct CandidateInput {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    confidence: f32,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::ClassInfo => run_class_info(),
        Commands::ConfigDump => run_config_dump(),
    }
}

// ── analyze ────────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let maintenance = image::open(&args.image)
        .map_err(|e| -> CliError {
            format!("Failed to open image {}: {}", args.image.display(), e).into()
        })?
        .to_rgb8();
    tracing::info!(
        "Image size: {}x{}",
        maintenance.width(),
        maintenance.height()
    );

    let baseline = match &args.baseline {
        Some(path) => {
            tracing::info!("Loading baseline: {}", path.display());
            Some(
                image::open(path)
                    .map_err(|e| -> CliError {
                        format!("Failed to open baseline {}: {}", path.display(), e).into()
                    })?
                    .to_rgb8(),
            )
        }
        None => None,
    };

    let candidates = match &args.candidates {
        Some(path) => load_candidates(path)?,
        None => Vec::new(),
    };
    tracing::info!("{} candidate box(es) supplied", candidates.len());

    let mut config = match &args.config {
        Some(path) => DetectionConfig::from_value(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => DetectionConfig::default(),
    };
    if let Some(percent) = args.sensitivity {
        config = config.with_overrides(&sensitivity_overrides(percent));
    }
    if let Some(raw) = &args.overrides_json {
        let overrides: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| -> CliError { format!("invalid --overrides-json: {}", e).into() })?;
        config = config.with_overrides(&overrides);
    }

    let detector = Detector::with_config(config);
    let result = match &baseline {
        Some(baseline) => detector.detect_with_baseline(baseline, &maintenance, &candidates)?,
        None => detector.detect(&maintenance, &candidates)?,
    };

    tracing::info!(
        "{} finding(s), assessment: {}, score: {:.3}",
        result.detection_count,
        result.overall_assessment.as_str(),
        result.anomaly_score
    );

    let json = serde_json::to_string_pretty(&result)?;
    fs::write(&args.out, json)?;
    tracing::info!("Results written to {}", args.out.display());

    Ok(())
}

fn load_candidates(path: &Path) -> CliResult<Vec<CandidateRegion>> {
    let raw = fs::read_to_string(path)?;
    let inputs: Vec<CandidateInput> = serde_json::from_str(&raw)
        .map_err(|e| -> CliError { format!("invalid candidate file {}: {}", path.display(), e).into() })?;
    Ok(inputs
        .into_iter()
        .map(|c| {
            CandidateRegion::external(
                BoundingBox::new(c.x, c.y, c.width, c.height),
                c.confidence,
            )
        })
        .collect())
}

// ── class-info ─────────────────────────────────────────────────────────

fn run_class_info() -> CliResult<()> {
    println!("thermoscan anomaly classes");
    for class in AnomalyClass::ALL {
        let [r, g, b] = class.display_color();
        println!(
            "  {:<22} severity: {:<8} color: #{:02X}{:02X}{:02X}",
            class.label(),
            class.severity().as_str(),
            r,
            g,
            b
        );
    }
    Ok(())
}

// ── config-dump ────────────────────────────────────────────────────────

fn run_config_dump() -> CliResult<()> {
    let config = DetectionConfig::default();
    println!("{}", serde_json::to_string_pretty(config.params())?);
    Ok(())
}

//! Enhancement CLI Tool
//!
//! Sends one image through both remote stages and reports the two results
//! side by side.

use super::config::CliConfigBuilder;
use crate::{
    aggregator::ResultAggregator,
    orchestrator::PipelineOrchestrator,
    services::{
        InputLoader, InputPreview, LoggingStageReporter, OutputWriter, SpinnerStageReporter,
        StageReporter,
    },
    tracing_config::{events, TracingFormat},
    types::{InputImage, PipelineResult, StageLabel},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

/// Exit code used with `--fail-on-stage-error` when any stage failed
pub const STAGE_FAILURE_EXIT_CODE: u8 = 2;

/// Image enhancement client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-enhance")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image file (PNG or JPEG)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Service base address; both endpoint paths are derived from it
    #[arg(long, env = "IMGLY_ENHANCE_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Full URL of the enhance endpoint (overrides the derived one)
    #[arg(long, value_name = "URL")]
    pub enhance_url: Option<String>,

    /// Full URL of the remove-and-enhance endpoint (overrides the derived one)
    #[arg(long, value_name = "URL")]
    pub remove_url: Option<String>,

    /// JSON service configuration file; flags override its values
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Per-stage timeout in seconds [default: 180]
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Run stage 2 only after stage 1 has finished
    #[arg(long)]
    pub sequential: bool,

    /// Directory for result images [default: next to the input]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Don't write result images
    #[arg(long)]
    pub no_save: bool,

    /// Print a JSON summary instead of the human-readable report
    #[arg(long)]
    pub json: bool,

    /// Exit with code 2 when any stage failed
    #[arg(long)]
    pub fail_on_stage_error: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
        }
    }
}

pub async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    crate::tracing_config::init_cli_tracing(cli.verbose, cli.log_format.into())
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!("Enhance endpoint: {}", config.enhance.url);
    info!("Remove & enhance endpoint: {}", config.remove_and_enhance.url);
    debug!(
        timeout_secs = config.timeout.as_secs_f64(),
        execution = ?config.execution,
        "Service configuration"
    );

    let input = InputLoader::load(&cli.input)
        .with_context(|| format!("Failed to load input image {}", cli.input.display()))?;
    let preview = InputLoader::preview(&input).context("Failed to decode input image")?;

    let reporter: Arc<dyn StageReporter> = if cli.json || !std::io::stderr().is_terminal() {
        Arc::new(LoggingStageReporter::new(cli.verbose > 0))
    } else {
        Arc::new(SpinnerStageReporter::new())
    };

    let orchestrator = PipelineOrchestrator::new(config)
        .context("Failed to create pipeline orchestrator")?
        .with_reporter(reporter);

    let result = orchestrator.process(&input).await;

    let written = if cli.no_save {
        Vec::new()
    } else {
        let writer = OutputWriter::new(output_dir(&cli));
        writer
            .write_result(input.filename(), &result)
            .map_err(|e| {
                events::error_with_context(&e, "saving stage results");
                e
            })
            .context("Failed to save result images")?
    };

    if cli.json {
        print_json(&result, &written)?;
    } else {
        print_report(&input, &preview, &result, &written);
    }

    if cli.fail_on_stage_error && result.any_failed() {
        return Ok(ExitCode::from(STAGE_FAILURE_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

/// Directory results go to: `--output-dir`, else the input's directory
fn output_dir(cli: &Cli) -> PathBuf {
    if let Some(dir) = &cli.output_dir {
        return dir.clone();
    }
    cli.input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn print_report(
    input: &InputImage,
    preview: &InputPreview,
    result: &PipelineResult,
    written: &[(StageLabel, PathBuf)],
) {
    println!(
        "📷 Original: {} ({:?}, {}x{}, {} bytes)",
        input.filename(),
        preview.format,
        preview.width,
        preview.height,
        input.len()
    );

    let aggregator = ResultAggregator::new(result);
    for view in aggregator.views() {
        println!();
        println!("── {} ──", view.title);
        match (view.image, view.caption) {
            (Some(image), Some(caption)) => {
                println!(
                    "  ✅ {}: {} {}x{}",
                    caption,
                    image.format_name(),
                    image.width,
                    image.height
                );
                if let Some((_, path)) = written.iter().find(|(label, _)| *label == view.label) {
                    println!("  💾 {}", path.display());
                }
            },
            _ => {
                for warning in &view.warnings {
                    println!("  ⚠️  {}", warning);
                }
            },
        }
    }

    if let Some(advisory) = aggregator.advisory() {
        println!();
        println!("ℹ️  {}", advisory);
    }

    println!();
    println!(
        "Completed in {:.2}s",
        result.timings.total_ms as f64 / 1000.0
    );
}

fn print_json(result: &PipelineResult, written: &[(StageLabel, PathBuf)]) -> Result<()> {
    let mut summary = serde_json::to_value(ResultAggregator::new(result).summary())
        .context("Failed to serialize summary")?;

    if let Some(stages) = summary.get_mut("stages").and_then(|s| s.as_array_mut()) {
        for stage in stages {
            let path = written
                .iter()
                .find(|(label, _)| stage["stage"] == label.as_str())
                .map(|(_, path)| path.display().to_string());
            if let (Some(path), Some(object)) = (path, stage.as_object_mut()) {
                object.insert("output".to_string(), serde_json::Value::String(path));
            }
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );
    Ok(())
}

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # IMG.LY Enhance Client
//!
//! Client-side orchestration for a remote image-processing service that
//! exposes two transformations: **enhance** and **remove background and
//! enhance**. One input image is sent to both stages and the two results are
//! returned side by side for comparison.
//!
//! The crate does not implement either transformation. It uploads the image,
//! classifies each response as a usable image or an error, and keeps the two
//! stages isolated so that one stage failing never hides the other's result.
//!
//! ## Features
//!
//! - **Independent stages**: both stages always run, concurrently by default
//! - **Response classification**: image bodies vs. JSON error payloads, with
//!   display-ready messages
//! - **Per-call timeouts**: each stage has its own budget (180s by default)
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgly_enhance::{InputLoader, PipelineOrchestrator, ServiceConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::from_base_url("http://localhost:8000")?;
//! let orchestrator = PipelineOrchestrator::new(config)?;
//!
//! let input = InputLoader::load("photo.jpg")?;
//! let result = orchestrator.process(&input).await;
//!
//! for (label, outcome) in result.stages() {
//!     match outcome.decoded() {
//!         Some(image) => println!("{}: {}x{}", label, image.width, image.height),
//!         None => println!("{}: {}", label, outcome.error().unwrap()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, spinners and subscriber setup
//! - `webp-support` (default): decode WebP results
//! - `tracing-json`: JSON log output for the CLI

pub mod aggregator;
pub mod classifier;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod tracing_config;
pub mod transfer;
pub mod types;

use std::path::Path;

// Public API exports
pub use aggregator::{PipelineSummary, ResultAggregator, StageSummary, StageView};
pub use classifier::ResponseClassifier;
pub use config::{Endpoint, ExecutionMode, ServiceConfig, ServiceConfigBuilder, DEFAULT_TIMEOUT};
pub use error::{EnhanceError, Result};
pub use orchestrator::PipelineOrchestrator;
pub use services::{
    InputLoader, InputPreview, LoggingStageReporter, NoOpStageReporter, OutputWriter,
    StageReporter, StageUpdate,
};
pub use transfer::{
    RawResponse, TransferClient, TransferError, TransferErrorKind, TransferResult, Transport,
};
pub use types::{
    DecodedImage, ErrorDetail, ErrorKind, InputImage, PipelineResult, PipelineTimings,
    StageLabel, StageOutcome, StageState,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Run image bytes through both stages
///
/// The mime type is sniffed from the bytes; `filename` is forwarded with the
/// upload.
///
/// # Examples
/// ```rust,no_run
/// use imgly_enhance::{enhance_bytes, ServiceConfig};
///
/// # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let config = ServiceConfig::from_base_url("http://localhost:8000")?;
/// let result = enhance_bytes(upload, "upload.png", &config).await?;
/// println!("both decoded: {}", result.all_decoded());
/// # Ok(())
/// # }
/// ```
pub async fn enhance_bytes<F: Into<String>>(
    image_bytes: Vec<u8>,
    filename: F,
    config: &ServiceConfig,
) -> Result<PipelineResult> {
    let input = InputLoader::from_bytes(image_bytes, filename)?;
    let orchestrator = PipelineOrchestrator::new(config.clone())?;
    Ok(orchestrator.process(&input).await)
}

/// Run an image file through both stages
///
/// Errors only for process-level problems (unreadable file, bad config);
/// stage failures are inside the returned [`PipelineResult`].
pub async fn enhance_file<P: AsRef<Path>>(
    path: P,
    config: &ServiceConfig,
) -> Result<PipelineResult> {
    let input = InputLoader::load(path)?;
    let orchestrator = PipelineOrchestrator::new(config.clone())?;
    Ok(orchestrator.process(&input).await)
}

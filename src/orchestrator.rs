//! Pipeline orchestrator
//!
//! Runs one input image through the two configured stages. Each stage is a
//! transfer followed by classification; the stages share only the read-only
//! input and never observe each other's outcome. A failed stage is a normal
//! result, never an error returned from [`PipelineOrchestrator::run`].

use crate::classifier::ResponseClassifier;
use crate::config::{Endpoint, ExecutionMode, ServiceConfig};
use crate::error::Result;
use crate::services::progress::{NoOpStageReporter, StageReporter, StageTracker};
use crate::tracing_config::{events, spans};
use crate::transfer::{TransferClient, Transport};
use crate::types::{InputImage, PipelineResult, PipelineTimings, StageOutcome};
use instant::Instant;
use std::sync::Arc;
use tracing::Instrument;

/// Drives an input through the enhance and remove-and-enhance stages
pub struct PipelineOrchestrator {
    config: ServiceConfig,
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn StageReporter>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator that talks HTTP to the configured endpoints
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to create HTTP client
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let transport = Arc::new(TransferClient::new()?);
        Self::with_transport(config, transport)
    }

    /// Create an orchestrator with a custom transport
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn with_transport(config: ServiceConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            reporter: Arc::new(NoOpStageReporter),
        })
    }

    /// Attach a reporter for stage transitions
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run `input` through the configured endpoints
    pub async fn process(&self, input: &InputImage) -> PipelineResult {
        let endpoints = self.config.endpoints();
        self.run(input, &endpoints).await
    }

    /// Run `input` through the given pair of endpoints
    ///
    /// Both stages always run. In parallel mode the calls are in flight at
    /// the same time and each keeps its own timeout budget; in sequential
    /// mode stage 2 starts once stage 1 has reached a terminal state,
    /// whatever that state is.
    pub async fn run(&self, input: &InputImage, endpoints: &[Endpoint; 2]) -> PipelineResult {
        let [first, second] = endpoints;
        let span = spans::pipeline_run(input, self.config.execution);

        async {
            let start = Instant::now();

            let ((stage1, stage1_ms), (stage2, stage2_ms)) = match self.config.execution {
                ExecutionMode::Parallel => {
                    tokio::join!(self.run_stage(first, input), self.run_stage(second, input))
                },
                ExecutionMode::Sequential => {
                    let stage1 = self.run_stage(first, input).await;
                    let stage2 = self.run_stage(second, input).await;
                    (stage1, stage2)
                },
            };

            if stage1.is_failed() {
                events::warning_with_recommendation(
                    "First stage produced no image; second stage ran independently",
                    "check the enhance endpoint",
                );
            }

            let result = PipelineResult {
                stage1,
                stage2,
                labels: [first.label, second.label],
                timings: PipelineTimings {
                    stage1_ms,
                    stage2_ms,
                    total_ms: start.elapsed().as_millis() as u64,
                },
                completed_at: chrono::Utc::now(),
            };

            events::performance_metric("pipeline_run", result.timings.total_ms);
            self.reporter.report_completion(&result);
            result
        }
        .instrument(span)
        .await
    }

    /// Transfer and classify a single stage
    ///
    /// Returns the outcome and the milliseconds the stage took.
    pub async fn run_stage(&self, endpoint: &Endpoint, input: &InputImage) -> (StageOutcome, u64) {
        let span = spans::stage(endpoint);

        async {
            let mut tracker = StageTracker::new(endpoint.label, self.reporter.as_ref());
            tracker.begin();

            let transferred = self
                .transport
                .send(endpoint, input, self.config.timeout)
                .await;
            let outcome = ResponseClassifier::classify_transfer(transferred);

            let elapsed_ms = tracker.finish(&outcome);
            match &outcome {
                StageOutcome::Decoded(image) => tracing::debug!(
                    elapsed_ms,
                    format = %image.format_name(),
                    width = image.width,
                    height = image.height,
                    "Stage decoded"
                ),
                StageOutcome::Failed(detail) => tracing::debug!(
                    elapsed_ms,
                    kind = %detail.kind(),
                    status = ?detail.http_status(),
                    reason = detail.message(),
                    "Stage failed"
                ),
            }

            (outcome, elapsed_ms)
        }
        .instrument(span)
        .await
    }
}

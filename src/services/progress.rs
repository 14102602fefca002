//! Stage progress reporting service
//!
//! This module separates progress reporting from the orchestration logic so
//! that frontends can render stage transitions their own way (log lines,
//! terminal spinners, or nothing at all).

use crate::types::{PipelineResult, StageLabel, StageOutcome, StageState};
use instant::Instant;

/// One observed stage state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub label: StageLabel,
    /// State the stage just entered
    pub state: StageState,
    /// Milliseconds since the stage left `NotStarted`
    pub elapsed_ms: u64,
    /// Failure message when `state` is `Failed`
    pub message: Option<String>,
}

/// Trait for observing stage transitions during a pipeline run
///
/// Both stages may report concurrently, so implementations must be `Sync`.
pub trait StageReporter: Send + Sync {
    /// Report a state transition for one stage
    fn report_transition(&self, update: &StageUpdate);

    /// Report that both outcomes have been collected
    fn report_completion(&self, _result: &PipelineResult) {}
}

/// Reporter that discards all updates
pub struct NoOpStageReporter;

impl StageReporter for NoOpStageReporter {
    fn report_transition(&self, _update: &StageUpdate) {}
}

/// Reporter that emits tracing events
pub struct LoggingStageReporter {
    verbose: bool,
}

impl LoggingStageReporter {
    /// Create a new logging reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to include timings in every event
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl StageReporter for LoggingStageReporter {
    fn report_transition(&self, update: &StageUpdate) {
        match update.state {
            StageState::NotStarted => {},
            StageState::InFlight => {
                tracing::info!(stage = %update.label, "{}", update.label.in_flight_message());
            },
            StageState::Decoded => {
                if self.verbose {
                    tracing::info!(
                        stage = %update.label,
                        elapsed_ms = update.elapsed_ms,
                        "✅ Stage produced an image"
                    );
                } else {
                    tracing::info!(stage = %update.label, "✅ Stage produced an image");
                }
            },
            StageState::Failed => {
                tracing::warn!(
                    stage = %update.label,
                    elapsed_ms = update.elapsed_ms,
                    reason = update.message.as_deref().unwrap_or(""),
                    "❌ Stage failed"
                );
            },
        }
    }

    fn report_completion(&self, result: &PipelineResult) {
        tracing::info!(
            total_ms = result.timings.total_ms,
            decoded = result.stages().iter().filter(|(_, o)| o.is_decoded()).count(),
            "Pipeline run completed"
        );
    }
}

/// Terminal spinners, one per in-flight stage
#[cfg(feature = "cli")]
pub struct SpinnerStageReporter {
    multi: indicatif::MultiProgress,
    bars: std::sync::Mutex<std::collections::HashMap<StageLabel, indicatif::ProgressBar>>,
}

#[cfg(feature = "cli")]
impl SpinnerStageReporter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: indicatif::MultiProgress::new(),
            bars: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn spinner_style() -> indicatif::ProgressStyle {
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
    }
}

#[cfg(feature = "cli")]
impl Default for SpinnerStageReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl StageReporter for SpinnerStageReporter {
    fn report_transition(&self, update: &StageUpdate) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };

        match update.state {
            StageState::NotStarted => {},
            StageState::InFlight => {
                let bar = self.multi.add(indicatif::ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_message(update.label.in_flight_message());
                bar.enable_steady_tick(std::time::Duration::from_millis(100));
                bars.insert(update.label, bar);
            },
            StageState::Decoded | StageState::Failed => {
                if let Some(bar) = bars.remove(&update.label) {
                    let message = match &update.message {
                        Some(message) => format!("❌ {}: {}", update.label.title(), message),
                        None => format!(
                            "✅ {} ({:.1}s)",
                            update.label.title(),
                            update.elapsed_ms as f64 / 1000.0
                        ),
                    };
                    bar.finish_with_message(message);
                }
            },
        }
    }
}

/// Drives one stage through its lifecycle and reports each transition
pub struct StageTracker<'a> {
    label: StageLabel,
    state: StageState,
    start: Option<Instant>,
    reporter: &'a dyn StageReporter,
}

impl<'a> StageTracker<'a> {
    #[must_use]
    pub fn new(label: StageLabel, reporter: &'a dyn StageReporter) -> Self {
        Self {
            label,
            state: StageState::NotStarted,
            start: None,
            reporter,
        }
    }

    #[must_use]
    pub fn state(&self) -> StageState {
        self.state
    }

    /// `NotStarted -> InFlight`
    pub fn begin(&mut self) {
        if self.state == StageState::NotStarted {
            self.start = Some(Instant::now());
        }
        self.transition(StageState::InFlight, None);
    }

    /// `InFlight -> Decoded | Failed`, returning the elapsed milliseconds
    pub fn finish(&mut self, outcome: &StageOutcome) -> u64 {
        let message = outcome.error().map(|detail| detail.message().to_string());
        self.transition(outcome.state(), message);
        self.elapsed_ms()
    }

    fn elapsed_ms(&self) -> u64 {
        self.start
            .map_or(0, |start| start.elapsed().as_millis() as u64)
    }

    fn transition(&mut self, next: StageState, message: Option<String>) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                stage = %self.label,
                from = ?self.state,
                to = ?next,
                "Ignoring illegal stage transition"
            );
            return;
        }

        self.state = next;
        self.reporter.report_transition(&StageUpdate {
            label: self.label,
            state: next,
            elapsed_ms: self.elapsed_ms(),
            message,
        });
    }
}

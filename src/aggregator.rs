//! Display model for a finished pipeline run
//!
//! Frontends render a [`PipelineResult`] as two columns, one per stage, each
//! showing either the decoded image with a caption or a warning message.

use crate::types::{DecodedImage, ErrorKind, PipelineResult, StageLabel, StageOutcome};
use serde::Serialize;

/// Advisory shown when the first stage produced no image
///
/// Informational only: the second stage always runs.
pub const FIRST_STAGE_ADVISORY: &str =
    "The 'Enhance Only' step failed or returned no image; 'Remove & Enhance' was still attempted.";

/// What a frontend needs to render one stage column
#[derive(Debug, Clone, PartialEq)]
pub struct StageView<'a> {
    pub label: StageLabel,
    pub title: &'static str,
    /// Decoded image, absent when the stage failed
    pub image: Option<&'a DecodedImage>,
    /// Caption for the image, present only with an image
    pub caption: Option<&'static str>,
    /// Warning lines for a failed stage: the extracted error, then the notice
    pub warnings: Vec<String>,
}

/// Builds display views from a pipeline result
pub struct ResultAggregator<'a> {
    result: &'a PipelineResult,
}

impl<'a> ResultAggregator<'a> {
    #[must_use]
    pub fn new(result: &'a PipelineResult) -> Self {
        Self { result }
    }

    /// One view per stage, in stage order
    #[must_use]
    pub fn views(&self) -> Vec<StageView<'a>> {
        self.result
            .stages()
            .into_iter()
            .map(|(label, outcome)| Self::view(label, outcome))
            .collect()
    }

    /// Advisory note about the first stage, if it failed
    #[must_use]
    pub fn advisory(&self) -> Option<&'static str> {
        self.result.stage1.is_failed().then_some(FIRST_STAGE_ADVISORY)
    }

    /// Serializable summary of the run
    #[must_use]
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            stages: self
                .result
                .stages()
                .into_iter()
                .map(|(label, outcome)| StageSummary::new(label, outcome))
                .collect(),
            advisory: self.advisory().map(str::to_string),
            total_ms: self.result.timings.total_ms,
            completed_at: self.result.completed_at,
        }
    }

    fn view(label: StageLabel, outcome: &'a StageOutcome) -> StageView<'a> {
        match outcome {
            StageOutcome::Decoded(image) => StageView {
                label,
                title: label.title(),
                image: Some(image),
                caption: Some(label.caption()),
                warnings: Vec::new(),
            },
            StageOutcome::Failed(detail) => StageView {
                label,
                title: label.title(),
                image: None,
                caption: None,
                warnings: vec![detail.to_string(), label.failure_notice().to_string()],
            },
        }
    }
}

/// Per-stage entry in a [`PipelineSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub stage: StageLabel,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl StageSummary {
    fn new(stage: StageLabel, outcome: &StageOutcome) -> Self {
        match outcome {
            StageOutcome::Decoded(image) => Self {
                stage,
                status: "decoded",
                format: Some(image.format_name()),
                width: Some(image.width),
                height: Some(image.height),
                bytes: Some(image.bytes.len()),
                error_kind: None,
                message: None,
                http_status: None,
            },
            StageOutcome::Failed(detail) => Self {
                stage,
                status: "failed",
                format: None,
                width: None,
                height: None,
                bytes: None,
                error_kind: Some(detail.kind()),
                message: Some(detail.message().to_string()),
                http_status: detail.http_status(),
            },
        }
    }
}

/// Machine-readable summary of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub stages: Vec<StageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
    pub total_ms: u64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

//! Core types for the enhancement pipeline

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The two remote transformations a pipeline run drives the input through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageLabel {
    /// Enhancement only
    Enhance,
    /// Background removal followed by enhancement
    RemoveAndEnhance,
}

impl StageLabel {
    /// Wire-level label used in logs, file names and summaries
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enhance => "enhance",
            Self::RemoveAndEnhance => "remove-and-enhance",
        }
    }

    /// Default endpoint path relative to the service base address
    #[must_use]
    pub fn default_path(self) -> &'static str {
        match self {
            Self::Enhance => "enhance/",
            Self::RemoveAndEnhance => "remove-and-enhance/",
        }
    }

    /// Column title shown next to the stage's result
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Enhance => "Enhanced Only",
            Self::RemoveAndEnhance => "Background Removed & Enhanced",
        }
    }

    /// Caption attached to a decoded result image
    #[must_use]
    pub fn caption(self) -> &'static str {
        match self {
            Self::Enhance => "Enhanced Image",
            Self::RemoveAndEnhance => "Background Removed & Enhanced Image",
        }
    }

    /// Message shown while the stage is in flight
    #[must_use]
    pub fn in_flight_message(self) -> &'static str {
        match self {
            Self::Enhance => "Enhancing image... (this may take a moment)",
            Self::RemoveAndEnhance => {
                "Removing background and enhancing... (this may take longer)"
            },
        }
    }

    /// Fallback notice shown when the stage produced no image
    #[must_use]
    pub fn failure_notice(self) -> &'static str {
        match self {
            Self::Enhance => "Could not generate enhanced image.",
            Self::RemoveAndEnhance => "Could not generate background removed & enhanced image.",
        }
    }
}

impl std::fmt::Display for StageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller-owned image submitted to both stages
///
/// The byte buffer is shared behind an `Arc`, so handing the same input to
/// two concurrently running stages never copies or mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    bytes: Arc<[u8]>,
    filename: String,
    mime_type: String,
}

impl InputImage {
    /// Create an input image from raw bytes, a filename and a declared mime type
    pub fn new<B, F, M>(bytes: B, filename: F, mime_type: M) -> Self
    where
        B: Into<Arc<[u8]>>,
        F: Into<String>,
        M: Into<String>,
    {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Raw image bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Original filename, forwarded with the upload
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Mime type declared by the caller
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An image returned by a stage that decoded successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Bytes exactly as received from the remote service
    pub bytes: Vec<u8>,
    /// Format inferred from the received bytes
    pub format: ImageFormat,
    /// Decoded width in pixels
    pub width: u32,
    /// Decoded height in pixels
    pub height: u32,
}

impl DecodedImage {
    /// Dimensions as (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Preferred file extension for the inferred format
    #[must_use]
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }

    /// Human-readable format name
    #[must_use]
    pub fn format_name(&self) -> String {
        format!("{:?}", self.format).to_uppercase()
    }

    /// Decode the stored bytes into pixels for rendering
    pub fn to_dynamic_image(&self) -> Result<DynamicImage, image::ImageError> {
        image::load_from_memory_with_format(&self.bytes, self.format)
    }
}

/// Failure categories a stage can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The call did not complete within its timeout budget
    Timeout,
    /// Connection-level failure before a complete response arrived
    NetworkFailure,
    /// The response claimed to be an image but could not be decoded
    ImageDecodeError,
    /// The service reported a structured error
    RemoteError,
    /// Neither a valid image nor a parseable error body
    UnrecognizedResponse,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::NetworkFailure => "network failure",
            Self::ImageDecodeError => "image decode error",
            Self::RemoteError => "remote error",
            Self::UnrecognizedResponse => "unrecognized response",
        };
        f.write_str(name)
    }
}

/// Why a stage failed, with a message suitable for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    kind: ErrorKind,
    message: String,
    http_status: Option<u16>,
}

impl ErrorDetail {
    pub(crate) fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        http_status: Option<u16>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response, absent for transport failures
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::Timeout | ErrorKind::NetworkFailure => {
                write!(f, "Network or API Error: {}", self.message)
            },
            _ => write!(f, "API Error: {}", self.message),
        }
    }
}

/// Result of one stage in one run; exactly one variant holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Decoded(DecodedImage),
    Failed(ErrorDetail),
}

impl StageOutcome {
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The decoded image, if the stage succeeded
    #[must_use]
    pub fn decoded(&self) -> Option<&DecodedImage> {
        match self {
            Self::Decoded(image) => Some(image),
            Self::Failed(_) => None,
        }
    }

    /// The failure detail, if the stage failed
    #[must_use]
    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Decoded(_) => None,
            Self::Failed(detail) => Some(detail),
        }
    }

    /// Terminal state this outcome corresponds to
    #[must_use]
    pub fn state(&self) -> StageState {
        match self {
            Self::Decoded(_) => StageState::Decoded,
            Self::Failed(_) => StageState::Failed,
        }
    }
}

/// Per-stage lifecycle: `NotStarted -> InFlight -> {Decoded, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    NotStarted,
    InFlight,
    Decoded,
    Failed,
}

impl StageState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Decoded | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: StageState) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::InFlight)
                | (Self::InFlight, Self::Decoded)
                | (Self::InFlight, Self::Failed)
        )
    }
}

/// Wall-clock timings for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTimings {
    /// Time spent in stage 1 (transfer + classification)
    pub stage1_ms: u64,
    /// Time spent in stage 2 (transfer + classification)
    pub stage2_ms: u64,
    /// Time from start of the run until both outcomes were collected
    pub total_ms: u64,
}

/// Both stage outcomes for one submitted image
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    /// Outcome of the first configured stage (enhance)
    pub stage1: StageOutcome,
    /// Outcome of the second configured stage (remove-and-enhance)
    pub stage2: StageOutcome,
    /// Labels of the stages, in the same order as the outcomes
    pub labels: [StageLabel; 2],
    pub timings: PipelineTimings,
    /// When both outcomes had been collected
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl PipelineResult {
    /// Outcomes paired with their labels, in stage order
    #[must_use]
    pub fn stages(&self) -> [(StageLabel, &StageOutcome); 2] {
        [(self.labels[0], &self.stage1), (self.labels[1], &self.stage2)]
    }

    /// Outcome for a given stage label
    #[must_use]
    pub fn outcome(&self, label: StageLabel) -> Option<&StageOutcome> {
        self.stages()
            .into_iter()
            .find(|(stage, _)| *stage == label)
            .map(|(_, outcome)| outcome)
    }

    #[must_use]
    pub fn all_decoded(&self) -> bool {
        self.stage1.is_decoded() && self.stage2.is_decoded()
    }

    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.stage1.is_failed() || self.stage2.is_failed()
    }
}

//! Classification of raw stage responses into outcomes
//!
//! The remote service has no shared response envelope: success is a raw
//! image body, failure is (usually) a JSON object. The decision is made in a
//! fixed order:
//!
//! 1. A transport failure is already a failed outcome. A non-2xx status skips
//!    the image check and goes straight to error extraction.
//! 2. A `Content-Type` containing `image` (case-insensitive) means the body is
//!    decoded as an image.
//! 3. Otherwise the body is parsed as JSON and the message is taken from
//!    `detail`, then `error`, then `"Unknown error"`.
//! 4. A body that is not JSON either is an unrecognized response.
//!
//! The content type, not the status code, selects between steps 2 and 3 for
//! successful statuses.

use crate::transfer::{RawResponse, TransferError, TransferErrorKind, TransferResult};
use crate::types::{DecodedImage, ErrorDetail, ErrorKind, StageOutcome};
use serde_json::Value;

/// Message used when a structured error body names no message
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Turns raw responses and transfer failures into [`StageOutcome`]s
pub struct ResponseClassifier;

impl ResponseClassifier {
    /// Classify the result of a transfer, successful or not
    #[must_use]
    pub fn classify_transfer(result: TransferResult<RawResponse>) -> StageOutcome {
        match result {
            Ok(response) => Self::classify(&response),
            Err(error) => Self::from_transfer_error(&error),
        }
    }

    /// Classify a completed HTTP exchange
    #[must_use]
    pub fn classify(response: &RawResponse) -> StageOutcome {
        if response.is_success() && Self::is_image_content_type(response.content_type.as_deref()) {
            return Self::decode_image(response);
        }

        if !response.is_success() {
            tracing::debug!(
                status = response.status,
                "Non-success status, treating body as error payload"
            );
        }

        Self::extract_error(response)
    }

    /// Map a failed transfer to its outcome
    #[must_use]
    pub fn from_transfer_error(error: &TransferError) -> StageOutcome {
        let kind = match error.kind {
            TransferErrorKind::Timeout => ErrorKind::Timeout,
            TransferErrorKind::NetworkFailure => ErrorKind::NetworkFailure,
        };
        StageOutcome::Failed(ErrorDetail::new(kind, error.message.clone(), None))
    }

    /// Whether a `Content-Type` value announces an image body
    #[must_use]
    pub fn is_image_content_type(content_type: Option<&str>) -> bool {
        content_type.is_some_and(|value| value.to_ascii_lowercase().contains("image"))
    }

    fn decode_image(response: &RawResponse) -> StageOutcome {
        let status = Some(response.status);
        let decode_failed = |e: image::ImageError| {
            StageOutcome::Failed(ErrorDetail::new(
                ErrorKind::ImageDecodeError,
                e.to_string(),
                status,
            ))
        };

        let format = match image::guess_format(&response.body) {
            Ok(format) => format,
            Err(e) => return decode_failed(e),
        };

        match image::load_from_memory_with_format(&response.body, format) {
            Ok(image) => {
                tracing::debug!(
                    format = ?format,
                    width = image.width(),
                    height = image.height(),
                    "Decoded stage image"
                );
                StageOutcome::Decoded(DecodedImage {
                    bytes: response.body.clone(),
                    format,
                    width: image.width(),
                    height: image.height(),
                })
            },
            Err(e) => decode_failed(e),
        }
    }

    fn extract_error(response: &RawResponse) -> StageOutcome {
        let status = Some(response.status);

        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => StageOutcome::Failed(ErrorDetail::new(
                ErrorKind::RemoteError,
                Self::extract_message(&value),
                status,
            )),
            Err(_) => StageOutcome::Failed(ErrorDetail::new(
                ErrorKind::UnrecognizedResponse,
                format!("non-image response, status {}", response.status),
                status,
            )),
        }
    }

    /// Pull a display message out of a structured error body
    ///
    /// `detail` wins when it carries a value (empty strings, nulls, `false`,
    /// zero and empty collections do not). Otherwise `error` is used as-is
    /// whenever the key exists, even if empty. With neither, the message is
    /// [`UNKNOWN_ERROR_MESSAGE`]. Non-string values (validation error lists,
    /// nested objects) are rendered as compact JSON.
    #[must_use]
    pub fn extract_message(value: &Value) -> String {
        value
            .get("detail")
            .filter(|detail| Self::has_content(detail))
            .or_else(|| value.get("error"))
            .map_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string(), Self::render)
    }

    fn render(field: &Value) -> String {
        match field {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    fn has_content(value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

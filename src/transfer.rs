//! Outbound transfer of an input image to one remote stage endpoint
//!
//! A transfer is a single multipart POST with no retry. The whole exchange
//! (connect, upload, response headers and body) is bounded by the timeout
//! passed to [`Transport::send`].

use crate::config::{Endpoint, UPLOAD_CONTENT_TYPE, UPLOAD_FIELD_NAME};
use crate::error::{EnhanceError, Result};
use crate::tracing_config::spans;
use crate::types::InputImage;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

/// A completed HTTP exchange, before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Value of the `Content-Type` header, if present and valid UTF-8
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new<C: Into<String>>(status: u16, content_type: Option<C>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.map(Into::into),
            body,
        }
    }

    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why a transfer produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    Timeout,
    NetworkFailure,
}

/// A transfer that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferError {
    pub kind: TransferErrorKind,
    pub message: String,
}

impl TransferError {
    pub fn timeout(url: &str, timeout: Duration) -> Self {
        Self {
            kind: TransferErrorKind::Timeout,
            message: format!(
                "request to {} timed out after {:.1}s",
                url,
                timeout.as_secs_f64()
            ),
        }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self {
            kind: TransferErrorKind::NetworkFailure,
            message: message.into(),
        }
    }

    fn from_reqwest(error: &reqwest::Error, url: &str, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::timeout(url, timeout)
        } else {
            Self::network(error.to_string())
        }
    }
}

/// Outcome of one transfer attempt
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Sends one input image to one endpoint
///
/// The orchestrator only talks to the remote service through this trait, so
/// tests and alternative transports can stand in for HTTP.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload `payload` to `endpoint`, waiting at most `timeout`
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &InputImage,
        timeout: Duration,
    ) -> TransferResult<RawResponse>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct TransferClient {
    client: Client,
}

impl TransferClient {
    /// Create a new transfer client
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("imgly-enhance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EnhanceError::client(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...)
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_form(payload: &InputImage) -> TransferResult<Form> {
        let part = Part::bytes(payload.bytes().to_vec())
            .file_name(payload.filename().to_string())
            .mime_str(UPLOAD_CONTENT_TYPE)
            .map_err(|e| TransferError::network(format!("Failed to build upload body: {}", e)))?;
        Ok(Form::new().part(UPLOAD_FIELD_NAME, part))
    }

    async fn exchange(
        &self,
        url: &str,
        form: Form,
        timeout: Duration,
    ) -> TransferResult<RawResponse> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransferError::from_reqwest(&e, url, timeout))?;

        let status = response.status().as_u16();
        let content_type = response.headers().get(CONTENT_TYPE).map(header_text);

        let body = response
            .bytes()
            .await
            .map_err(|e| TransferError::from_reqwest(&e, url, timeout))?;

        Ok(RawResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Header value as text, replacing bytes that are not valid UTF-8
fn header_text(value: &HeaderValue) -> String {
    value.to_str().map_or_else(
        |_| String::from_utf8_lossy(value.as_bytes()).into_owned(),
        str::to_owned,
    )
}

#[async_trait]
impl Transport for TransferClient {
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &InputImage,
        timeout: Duration,
    ) -> TransferResult<RawResponse> {
        let span = spans::transfer(endpoint, payload.len());

        async {
            let form = Self::build_form(payload)?;

            // Bound the whole exchange, body read included.
            let exchange = self.exchange(&endpoint.url, form, timeout);
            let response = match tokio::time::timeout(timeout, exchange).await {
                Ok(result) => result?,
                Err(_elapsed) => return Err(TransferError::timeout(&endpoint.url, timeout)),
            };

            tracing::debug!(
                status = response.status,
                content_type = response.content_type.as_deref().unwrap_or(""),
                body_bytes = response.body.len(),
                "Response received"
            );
            Ok::<RawResponse, TransferError>(response)
        }
        .instrument(span)
        .await
    }
}

//! Configuration types for the remote enhancement service

use crate::error::{EnhanceError, Result};
use crate::types::StageLabel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default bound on a single stage call, covering connect, upload and download
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Largest accepted per-call timeout
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Multipart field name the service reads the upload from
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Content type declared for the uploaded part, whatever the source format
pub const UPLOAD_CONTENT_TYPE: &str = "image/png";

/// A configured remote stage: where to send the image and what the stage is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub label: StageLabel,
    pub url: String,
}

impl Endpoint {
    pub fn new<S: Into<String>>(label: StageLabel, url: S) -> Self {
        Self {
            label,
            url: url.into(),
        }
    }

    /// Derive the endpoint for `label` from a service base address
    pub fn from_base_url(label: StageLabel, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::new(label, format!("{}/{}", base, label.default_path()))
    }

    /// Check that the URL parses and uses an HTTP scheme
    pub fn validate(&self) -> Result<()> {
        let parsed = reqwest::Url::parse(&self.url).map_err(|e| {
            EnhanceError::invalid_config(format!(
                "Invalid {} endpoint URL '{}': {}",
                self.label, self.url, e
            ))
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(EnhanceError::invalid_config(format!(
                "Unsupported scheme '{}' for {} endpoint (expected http or https)",
                other, self.label
            ))),
        }
    }
}

/// How the two stages are scheduled within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Issue both calls concurrently and wait for both
    #[default]
    Parallel,
    /// Issue stage 1, then stage 2
    Sequential,
}

/// Service configuration handed to the orchestrator at construction
///
/// Has no `Default`. The service address always comes from the caller
/// (CLI flag, environment, config file or test stub).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Enhance-only stage (stage 1)
    pub enhance: Endpoint,

    /// Remove-background-and-enhance stage (stage 2)
    pub remove_and_enhance: Endpoint,

    /// Per-call timeout, applied to each stage independently
    #[serde(rename = "timeout_secs", with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,

    /// Stage scheduling
    #[serde(default)]
    pub execution: ExecutionMode,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl ServiceConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use imgly_enhance::{ExecutionMode, ServiceConfig};
    /// use std::time::Duration;
    ///
    /// let config = ServiceConfig::builder()
    ///     .base_url("http://localhost:8000")
    ///     .timeout(Duration::from_secs(60))
    ///     .execution(ExecutionMode::Sequential)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.enhance.url, "http://localhost:8000/enhance/");
    /// ```
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Configuration with both endpoints derived from one base address and
    /// default timeout and scheduling
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Load configuration from a JSON file
    ///
    /// ```json
    /// {
    ///   "enhance": { "label": "enhance", "url": "http://svc/enhance/" },
    ///   "remove_and_enhance": {
    ///     "label": "remove-and-enhance",
    ///     "url": "http://svc/remove-and-enhance/"
    ///   },
    ///   "timeout_secs": 180,
    ///   "execution": "parallel"
    /// }
    /// ```
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EnhanceError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Both endpoints in stage order
    #[must_use]
    pub fn endpoints(&self) -> [Endpoint; 2] {
        [self.enhance.clone(), self.remove_and_enhance.clone()]
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Both endpoint URLs parse and use http or https
    /// - Endpoint labels match their slot (enhance first, remove-and-enhance second)
    /// - Timeout: above 0 and at most 3600 seconds (fractions allowed)
    pub fn validate(&self) -> Result<()> {
        self.enhance.validate()?;
        self.remove_and_enhance.validate()?;

        if self.enhance.label != StageLabel::Enhance {
            return Err(EnhanceError::invalid_config(format!(
                "First endpoint must be labelled 'enhance', got '{}'",
                self.enhance.label
            )));
        }
        if self.remove_and_enhance.label != StageLabel::RemoveAndEnhance {
            return Err(EnhanceError::invalid_config(format!(
                "Second endpoint must be labelled 'remove-and-enhance', got '{}'",
                self.remove_and_enhance.label
            )));
        }

        if self.timeout.is_zero() || self.timeout > Duration::from_secs(MAX_TIMEOUT_SECS) {
            return Err(EnhanceError::config_value_error(
                "timeout_secs",
                self.timeout.as_secs_f64(),
                "0 < timeout_secs <= 3600",
                Some(DEFAULT_TIMEOUT.as_secs_f64()),
            ));
        }

        Ok(())
    }
}

/// Builder for `ServiceConfig`
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    base_url: Option<String>,
    enhance_url: Option<String>,
    remove_and_enhance_url: Option<String>,
    timeout: Option<Duration>,
    execution: ExecutionMode,
}

impl ServiceConfigBuilder {
    /// Base address both endpoint paths are derived from
    #[must_use]
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Explicit enhance endpoint, overriding the derived one
    #[must_use]
    pub fn enhance_url<S: Into<String>>(mut self, url: S) -> Self {
        self.enhance_url = Some(url.into());
        self
    }

    /// Explicit remove-and-enhance endpoint, overriding the derived one
    #[must_use]
    pub fn remove_and_enhance_url<S: Into<String>>(mut self, url: S) -> Self {
        self.remove_and_enhance_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn execution(mut self, mode: ExecutionMode) -> Self {
        self.execution = mode;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServiceConfig> {
        let enhance = self.resolve(StageLabel::Enhance, self.enhance_url.as_deref())?;
        let remove_and_enhance = self.resolve(
            StageLabel::RemoveAndEnhance,
            self.remove_and_enhance_url.as_deref(),
        )?;

        let config = ServiceConfig {
            enhance,
            remove_and_enhance,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            execution: self.execution,
        };
        config.validate()?;
        Ok(config)
    }

    fn resolve(&self, label: StageLabel, explicit: Option<&str>) -> Result<Endpoint> {
        match (explicit, self.base_url.as_deref()) {
            (Some(url), _) => Ok(Endpoint::new(label, url)),
            (None, Some(base)) => Ok(Endpoint::from_base_url(label, base)),
            (None, None) => Err(EnhanceError::invalid_config(format!(
                "No URL for the {} endpoint: set a base URL or an explicit endpoint URL",
                label
            ))),
        }
    }
}

/// Durations as (possibly fractional) seconds, e.g. `180` or `0.5`
mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid timeout_secs {}: {}", secs, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_base_url_derives_paths() {
        let config = ServiceConfig::from_base_url("https://svc.example.com/").unwrap();
        assert_eq!(config.enhance.url, "https://svc.example.com/enhance/");
        assert_eq!(
            config.remove_and_enhance.url,
            "https://svc.example.com/remove-and-enhance/"
        );
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.execution, ExecutionMode::Parallel);
    }

    #[test]
    fn test_explicit_endpoint_overrides_base() {
        let config = ServiceConfig::builder()
            .base_url("http://localhost:8000")
            .remove_and_enhance_url("http://other:9000/rm")
            .build()
            .unwrap();
        assert_eq!(config.enhance.url, "http://localhost:8000/enhance/");
        assert_eq!(config.remove_and_enhance.url, "http://other:9000/rm");
    }

    #[test]
    fn test_missing_address_rejected() {
        let err = ServiceConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("No URL"));
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(ServiceConfig::from_base_url("not a url").is_err());

        let err = ServiceConfig::from_base_url("ftp://svc").unwrap_err();
        assert!(err.to_string().contains("Unsupported scheme"));
    }

    #[test]
    fn test_timeout_bounds() {
        let zero = ServiceConfig::builder()
            .base_url("http://localhost")
            .timeout(Duration::ZERO)
            .build();
        assert!(zero.is_err());

        let too_long = ServiceConfig::builder()
            .base_url("http://localhost")
            .timeout(Duration::from_secs(MAX_TIMEOUT_SECS + 1))
            .build();
        assert!(too_long.unwrap_err().to_string().contains("timeout_secs <= 3600"));
    }

    #[test]
    fn test_sub_second_timeout_survives_round_trip() {
        let config = ServiceConfig::builder()
            .base_url("http://localhost:8000")
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout_secs"], 0.5);

        let reloaded: ServiceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(reloaded.timeout, Duration::from_millis(500));
        assert!(reloaded.validate().is_ok());
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_negative_timeout_rejected_on_load() {
        let json = r#"{
            "enhance": { "label": "enhance", "url": "http://svc/enhance/" },
            "remove_and_enhance": { "label": "remove-and-enhance", "url": "http://svc/rm/" },
            "timeout_secs": -1
        }"#;
        assert!(serde_json::from_str::<ServiceConfig>(json).is_err());
    }

    #[test]
    fn test_swapped_labels_rejected() {
        let mut config = ServiceConfig::from_base_url("http://localhost").unwrap();
        std::mem::swap(&mut config.enhance, &mut config.remove_and_enhance);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "enhance": {{ "label": "enhance", "url": "http://svc/enhance/" }},
                "remove_and_enhance": {{ "label": "remove-and-enhance", "url": "http://svc/rm/" }},
                "timeout_secs": 30,
                "execution": "sequential"
            }}"#
        )
        .unwrap();

        let config = ServiceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.execution, ExecutionMode::Sequential);
        assert_eq!(config.endpoints()[1].label, StageLabel::RemoveAndEnhance);
    }

    #[test]
    fn test_json_defaults_applied() {
        let json = r#"{
            "enhance": { "label": "enhance", "url": "http://svc/enhance/" },
            "remove_and_enhance": { "label": "remove-and-enhance", "url": "http://svc/rm/" }
        }"#;
        let config: ServiceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.execution, ExecutionMode::Parallel);
    }
}

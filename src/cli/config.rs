//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{Endpoint, ExecutionMode, ServiceConfig, MAX_TIMEOUT_SECS};
use crate::types::StageLabel;
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a `ServiceConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `ServiceConfig` from CLI arguments
    ///
    /// With `--config` the file supplies the starting values and any flag
    /// given on the command line replaces the matching file value.
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServiceConfig> {
        let Some(path) = &cli.config else {
            return Self::from_flags(cli);
        };

        let mut config = ServiceConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        if let Some(base) = &cli.base_url {
            config.enhance = Endpoint::from_base_url(StageLabel::Enhance, base);
            config.remove_and_enhance = Endpoint::from_base_url(StageLabel::RemoveAndEnhance, base);
        }
        if let Some(url) = &cli.enhance_url {
            config.enhance = Endpoint::new(StageLabel::Enhance, url.as_str());
        }
        if let Some(url) = &cli.remove_url {
            config.remove_and_enhance = Endpoint::new(StageLabel::RemoveAndEnhance, url.as_str());
        }
        if let Some(secs) = cli.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if cli.sequential {
            config.execution = ExecutionMode::Sequential;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn from_flags(cli: &Cli) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder();

        if let Some(base) = &cli.base_url {
            builder = builder.base_url(base.as_str());
        }
        if let Some(url) = &cli.enhance_url {
            builder = builder.enhance_url(url.as_str());
        }
        if let Some(url) = &cli.remove_url {
            builder = builder.remove_and_enhance_url(url.as_str());
        }
        if let Some(secs) = cli.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if cli.sequential {
            builder = builder.execution(ExecutionMode::Sequential);
        }

        builder.build().context("Invalid configuration")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        let has_both_urls = cli.enhance_url.is_some() && cli.remove_url.is_some();
        if cli.config.is_none() && cli.base_url.is_none() && !has_both_urls {
            anyhow::bail!(
                "No service address: pass --base-url (or set IMGLY_ENHANCE_BASE_URL), \
                 --config, or both --enhance-url and --remove-url"
            );
        }

        if let Some(secs) = cli.timeout {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                anyhow::bail!(
                    "Timeout must be between 1 and {} seconds, got {}",
                    MAX_TIMEOUT_SECS,
                    secs
                );
            }
        }

        Ok(())
    }
}

use std::str::FromStr;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Corresponds to [`tracing_subscriber::fmt::format::Compact`]
    Compact,

    /// Corresponds to [`tracing_subscriber::fmt::format::Full`]
    Full,

    /// Corresponds to [`tracing_subscriber::fmt::format::Pretty`]
    Pretty,

    /// Corresponds to [`tracing_subscriber::fmt::format::Json`]
    Json,
}

/// Error type for the [`FromStr`] implementation for [`LogFormat`]
#[derive(Debug, Error)]
#[error("Invalid log format '{0}', expected one of 'compact', 'full', 'pretty', or 'json'")]
pub struct InvalidLogFormat(String);

impl FromStr for LogFormat {
    type Err = InvalidLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(InvalidLogFormat(s.to_owned())),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct Options {
    /// Format to use when emitting log events.
    #[arg(long, env = "LOG_FORMAT", default_value = "full")]
    pub log_format: LogFormat,

    /// [`EnvFilter`] directives selecting which events are logged.
    ///
    /// Session setup and registry construction log at DEBUG, and every resolved function call and
    /// captured statement time logs at TRACE. To see which signature each call resolved to:
    /// ```bash
    /// LOG_LEVEL=info,udf_expression::signature=trace
    /// ```
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Full,
            log_level: "info".to_owned(),
        }
    }
}

impl Options {
    /// Build the [`EnvFilter`] described by `log_level`.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        Ok(EnvFilter::try_new(&self.log_level)?)
    }

    /// Install the global tracing subscriber. Fails if one has already been installed.
    pub fn init(&self) -> anyhow::Result<()> {
        let s = tracing_subscriber::fmt().with_env_filter(self.env_filter()?);

        let res = match self.log_format {
            LogFormat::Compact => s.compact().try_init(),
            LogFormat::Full => s.try_init(),
            LogFormat::Pretty => s.pretty().try_init(),
            LogFormat::Json => s.json().with_current_span(true).try_init(),
        };
        res.map_err(|e| anyhow::anyhow!(e))?;

        debug!(log_format = ?self.log_format, log_level = %self.log_level, "Installed subscriber");
        if cfg!(debug_assertions) {
            warn!("Function evaluation is unoptimized in debug builds")
        }
        Ok(())
    }
}

/// Configure the global tracing subscriber for logging inside of tests
pub fn init_test_logging() {
    // This errors out if it's already been called within the scope of a process, which we don't
    // care about, so we just discard the result
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("LOG_LEVEL"))
        .with_test_writer()
        .try_init();
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_REGION, FILE_SCHEME, MAX_BATCH_ENTRIES, MAX_BATCH_SIZE_BYTES, MAX_RECORD_SIZE_BYTES,
    RECORD_OVERHEAD_BYTES,
};
use crate::error::LoggerError;
use crate::level::Level;
use crate::remote::http::HttpLogsApi;
use crate::remote::RetryStrategy;

const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 5;

/// Where records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Append to a local file.
    File { path: PathBuf },
    /// Batch to a remote log group and stream.
    Remote { group: String, stream: String },
}

impl Destination {
    /// Parses a destination selector: `file://<path>` selects a file, anything
    /// else names a remote log group written through `stream`.
    pub fn parse(selector: &str, stream: Option<&str>) -> Result<Self, LoggerError> {
        let selector = selector.trim();
        if let Some(path) = selector.strip_prefix(FILE_SCHEME) {
            if path.trim().is_empty() {
                return Err(LoggerError::InvalidConfig(
                    "file destination requires a path after file://".to_string(),
                ));
            }
            return Ok(Destination::File {
                path: PathBuf::from(path),
            });
        }

        if selector.is_empty() {
            return Err(LoggerError::InvalidConfig(
                "log destination cannot be empty".to_string(),
            ));
        }
        let stream = stream.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            LoggerError::InvalidConfig(format!(
                "log stream is required for remote log group '{selector}'"
            ))
        })?;

        Ok(Destination::Remote {
            group: selector.to_string(),
            stream: stream.to_string(),
        })
    }
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Destination selector: `file://<path>` or a remote log group name
    pub destination: Option<String>,
    /// Remote log stream name, required for remote destinations
    pub stream: Option<String>,
    /// Records below this level are dropped
    pub min_level: Level,
    /// Region of the remote service
    pub region: String,
    /// Overrides the regional endpoint (signing proxy, emulator)
    pub endpoint: Option<String>,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Records per batch
    pub batch_size: usize,
    /// Byte budget per batch
    pub max_batch_bytes: usize,
    /// Byte budget per record before truncation
    pub max_record_bytes: usize,
    /// Timeout for each remote call
    pub flush_timeout: Duration,
    pub retry_strategy: RetryStrategy,
    /// Directory of the emergency fallback file
    pub emergency_dir: PathBuf,
    /// Instance identity override
    pub instance: Option<String>,
    /// Prefix removed from caller file paths
    pub strip_prefix: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            destination: None,
            stream: None,
            min_level: Level::Info,
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            https_proxy: None,
            batch_size: MAX_BATCH_ENTRIES,
            max_batch_bytes: MAX_BATCH_SIZE_BYTES,
            max_record_bytes: MAX_RECORD_SIZE_BYTES,
            flush_timeout: Duration::from_secs(DEFAULT_FLUSH_TIMEOUT_SECS),
            retry_strategy: RetryStrategy::default(),
            emergency_dir: env::temp_dir(),
            instance: None,
            strip_prefix: None,
        }
    }
}

impl LoggerConfig {
    /// Configuration for a remote log group and stream, other settings default.
    pub fn remote(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            destination: Some(group.into()),
            stream: Some(stream.into()),
            ..Default::default()
        }
    }

    /// Configuration for a local log file, other settings default.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Some(format!("{FILE_SCHEME}{}", path.into().display())),
            ..Default::default()
        }
    }

    /// Create configuration from `CWL_*` environment variables
    pub fn from_env() -> Result<Self, LoggerError> {
        let defaults = Self::default();

        let destination = non_empty_var("CWL_DESTINATION");
        let stream = non_empty_var("CWL_STREAM");
        let min_level = match non_empty_var("CWL_LOG_LEVEL") {
            Some(level) => Level::from_str(&level).map_err(LoggerError::InvalidConfig)?,
            None => defaults.min_level,
        };
        let region = non_empty_var("CWL_REGION").unwrap_or(defaults.region);
        let endpoint = non_empty_var("CWL_ENDPOINT");
        let https_proxy = non_empty_var("CWL_PROXY_HTTPS").or_else(|| non_empty_var("HTTPS_PROXY"));
        let batch_size = parsed_var("CWL_BATCH_SIZE").unwrap_or(defaults.batch_size);
        let max_batch_bytes = parsed_var("CWL_BATCH_BYTES").unwrap_or(defaults.max_batch_bytes);
        let max_record_bytes = parsed_var("CWL_RECORD_BYTES").unwrap_or(defaults.max_record_bytes);
        let flush_timeout = parsed_var("CWL_FLUSH_TIMEOUT")
            .map(Duration::from_secs)
            .unwrap_or(defaults.flush_timeout);
        let retry_strategy = match (
            parsed_var::<usize>("CWL_RETRY_ATTEMPTS"),
            parsed_var::<u64>("CWL_RETRY_BACKOFF_MS"),
        ) {
            (None, None) => defaults.retry_strategy,
            (attempts, Some(0)) => RetryStrategy::Immediate(attempts.unwrap_or(3)),
            (attempts, backoff) => {
                RetryStrategy::LinearBackoff(attempts.unwrap_or(3), backoff.unwrap_or(100))
            }
        };
        let emergency_dir = non_empty_var("CWL_EMERGENCY_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.emergency_dir);
        let instance = non_empty_var("CWL_INSTANCE");
        let strip_prefix = non_empty_var("CWL_STRIP_PREFIX");

        let config = Self {
            destination,
            stream,
            min_level,
            region,
            endpoint,
            https_proxy,
            batch_size,
            max_batch_bytes,
            max_record_bytes,
            flush_timeout,
            retry_strategy,
            emergency_dir,
            instance,
            strip_prefix,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parsed destination.
    pub fn destination(&self) -> Result<Destination, LoggerError> {
        let selector = self.destination.as_deref().ok_or_else(|| {
            LoggerError::InvalidConfig("log destination is not set (CWL_DESTINATION)".to_string())
        })?;
        Destination::parse(selector, self.stream.as_deref())
    }

    /// Endpoint remote calls are sent to.
    #[must_use]
    pub fn remote_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| HttpLogsApi::regional_endpoint(&self.region))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LoggerError> {
        let destination = self.destination()?;

        if self.batch_size == 0 {
            return Err(LoggerError::InvalidConfig(
                "batch size must be greater than 0".to_string(),
            ));
        }

        for (name, limit) in [
            ("batch", self.max_batch_bytes),
            ("record", self.max_record_bytes),
        ] {
            if limit <= RECORD_OVERHEAD_BYTES {
                return Err(LoggerError::InvalidConfig(format!(
                    "{name} byte limit must be greater than {RECORD_OVERHEAD_BYTES}"
                )));
            }
        }

        if self.flush_timeout.is_zero() {
            return Err(LoggerError::InvalidConfig(
                "flush timeout must be greater than 0".to_string(),
            ));
        }

        if matches!(destination, Destination::Remote { .. }) && self.region.trim().is_empty() {
            return Err(LoggerError::InvalidConfig(
                "region cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|v| v.trim().parse::<T>().ok())
}

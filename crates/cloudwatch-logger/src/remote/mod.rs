// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of batches to the remote log service.
//!
//! [`RemoteSink`] wraps a [`LogsApi`] implementation (the HTTP client in
//! [`http`], or a fake in tests) and owns the failure policy:
//!
//! - **Sequence conflict**: the service names the token it expected at the end
//!   of its error message. The request is retried exactly once with that
//!   token; a second failure is fatal for the batch.
//! - **Throttled**: returned immediately, never retried. The dispatcher reacts
//!   by degrading to file.
//! - **Anything else** (including a timed out attempt): retried according to
//!   the [`RetryStrategy`], then reported.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::record::WireRecord;

const SEQUENCE_CONFLICT_CODE: &str = "InvalidSequenceTokenException";
const THROTTLED_CODE: &str = "ThrottlingException";
const TRANSPORT_CODE: &str = "Transport";

/// Error reported by the remote service, or by the transport reaching it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    SequenceConflict,
    Throttled,
    Other,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error raised before any response from the service was read.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_CODE, message)
    }

    #[must_use]
    pub fn kind(&self) -> ApiErrorKind {
        match self.code.as_str() {
            SEQUENCE_CONFLICT_CODE => ApiErrorKind::SequenceConflict,
            THROTTLED_CODE => ApiErrorKind::Throttled,
            _ => ApiErrorKind::Other,
        }
    }
}

/// Next expected write position of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SequenceToken {
    /// The stream has no token yet; the request is sent without one.
    #[default]
    NoneYet,
    Next(String),
}

impl SequenceToken {
    #[must_use]
    pub fn as_option(&self) -> Option<&str> {
        match self {
            SequenceToken::NoneYet => None,
            SequenceToken::Next(token) => Some(token),
        }
    }
}

/// Extracts the expected token from a sequence conflict message: the last
/// `:`-separated segment, trimmed. An empty segment or `null` means the
/// stream expects no token.
///
/// ```
/// use cloudwatch_logger::remote::{parse_expected_token, SequenceToken};
///
/// let msg = "The given sequenceToken is invalid. The next expected sequenceToken is: 4960";
/// assert_eq!(parse_expected_token(msg), SequenceToken::Next("4960".to_string()));
/// assert_eq!(parse_expected_token("expected sequenceToken is: null"), SequenceToken::NoneYet);
/// ```
#[must_use]
pub fn parse_expected_token(message: &str) -> SequenceToken {
    let token = message.rsplit(':').next().unwrap_or_default().trim();
    if token.is_empty() || token == "null" {
        SequenceToken::NoneYet
    } else {
        SequenceToken::Next(token.to_string())
    }
}

/// Stream metadata returned by the stream listing call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStream {
    pub log_stream_name: String,
    #[serde(default)]
    pub upload_sequence_token: Option<String>,
}

/// Body of a batch write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsRequest<'a> {
    pub log_group_name: &'a str,
    pub log_stream_name: &'a str,
    pub log_events: &'a [WireRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_token: Option<String>,
}

/// The two remote calls the logger consumes.
#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Streams of `group` whose name starts with `stream_prefix`.
    async fn describe_log_streams(
        &self,
        group: &str,
        stream_prefix: &str,
    ) -> Result<Vec<LogStream>, ApiError>;

    async fn put_log_events(&self, request: &PutLogEventsRequest<'_>) -> Result<(), ApiError>;
}

/// How unclassified delivery failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Up to `n` attempts back to back.
    Immediate(usize),
    /// Up to `n` attempts, waiting `attempt * ms` milliseconds between them.
    LinearBackoff(usize, u64),
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::LinearBackoff(3, 100)
    }
}

impl RetryStrategy {
    #[must_use]
    pub fn max_attempts(&self) -> usize {
        match self {
            RetryStrategy::Immediate(n) | RetryStrategy::LinearBackoff(n, _) => (*n).max(1),
        }
    }

    fn delay_after(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::Immediate(_) => None,
            RetryStrategy::LinearBackoff(_, ms) => {
                Some(Duration::from_millis(ms.saturating_mul(attempt as u64)))
            }
        }
    }
}

enum Attempt {
    Failed(ApiError),
    TimedOut,
}

#[derive(Clone)]
pub struct RemoteSink {
    api: Arc<dyn LogsApi>,
    timeout: Duration,
    retry_strategy: RetryStrategy,
}

impl RemoteSink {
    pub fn new(api: Arc<dyn LogsApi>, timeout: Duration, retry_strategy: RetryStrategy) -> Self {
        Self {
            api,
            timeout,
            retry_strategy,
        }
    }

    /// Current upload token of `stream` in `group`. Never fails: a missing
    /// stream, a missing token or a failed lookup all mean "start fresh".
    pub async fn current_token(&self, group: &str, stream: &str) -> SequenceToken {
        let lookup = tokio::time::timeout(self.timeout, self.api.describe_log_streams(group, stream));
        match lookup.await {
            Ok(Ok(streams)) => streams
                .into_iter()
                .find(|s| s.log_stream_name == stream)
                .and_then(|s| s.upload_sequence_token)
                .map_or(SequenceToken::NoneYet, SequenceToken::Next),
            Ok(Err(e)) => {
                debug!("CWL | Sequence token lookup failed, starting fresh: {}", e);
                SequenceToken::NoneYet
            }
            Err(_) => {
                debug!("CWL | Sequence token lookup timed out, starting fresh");
                SequenceToken::NoneYet
            }
        }
    }

    /// Sends `records`, in order, tagged with `token`.
    pub async fn deliver(
        &self,
        group: &str,
        stream: &str,
        records: &[WireRecord],
        token: SequenceToken,
    ) -> Result<(), DeliveryError> {
        let mut request = PutLogEventsRequest {
            log_group_name: group,
            log_stream_name: stream,
            log_events: records,
            sequence_token: token.as_option().map(str::to_string),
        };

        let max_attempts = self.retry_strategy.max_attempts();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let failure = match self.attempt(&request).await {
                Ok(()) => return Ok(()),
                Err(failure) => failure,
            };

            match failure {
                Attempt::Failed(e) if e.kind() == ApiErrorKind::SequenceConflict => {
                    let corrected = parse_expected_token(&e.message);
                    debug!(
                        "CWL | Sequence token conflict, retrying with {:?}",
                        corrected.as_option()
                    );
                    request.sequence_token = corrected.as_option().map(str::to_string);
                    return match self.attempt(&request).await {
                        Ok(()) => Ok(()),
                        Err(Attempt::Failed(retry_error)) => {
                            Err(DeliveryError::SequenceConflict(retry_error))
                        }
                        Err(Attempt::TimedOut) => Err(DeliveryError::Timeout(self.timeout)),
                    };
                }
                Attempt::Failed(e) if e.kind() == ApiErrorKind::Throttled => {
                    return Err(DeliveryError::Throttled(e));
                }
                Attempt::Failed(e) => {
                    warn!(
                        "CWL | Delivery attempt {}/{} failed: {}",
                        attempts, max_attempts, e
                    );
                    if attempts >= max_attempts {
                        return Err(DeliveryError::Other { attempts, error: e });
                    }
                }
                Attempt::TimedOut => {
                    warn!(
                        "CWL | Delivery attempt {}/{} timed out after {} ms",
                        attempts,
                        max_attempts,
                        self.timeout.as_millis()
                    );
                    if attempts >= max_attempts {
                        return Err(DeliveryError::Timeout(self.timeout));
                    }
                }
            }

            if let Some(delay) = self.retry_strategy.delay_after(attempts) {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn attempt(&self, request: &PutLogEventsRequest<'_>) -> Result<(), Attempt> {
        match tokio::time::timeout(self.timeout, self.api.put_log_events(request)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Attempt::Failed(e)),
            Err(_) => Err(Attempt::TimedOut),
        }
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Scripted in-memory [`LogsApi`] used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::remote::{ApiError, LogStream, LogsApi, PutLogEventsRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedPut {
    pub group: String,
    pub stream: String,
    pub messages: Vec<String>,
    pub sequence_token: Option<String>,
}

/// Answers `put_log_events` from a queue of scripted results (success once the
/// queue is empty) and records every request it sees.
pub(crate) struct FakeLogsApi {
    put_results: Mutex<VecDeque<Result<(), ApiError>>>,
    streams: Mutex<Result<Vec<LogStream>, ApiError>>,
    puts: Mutex<Vec<RecordedPut>>,
    describe_calls: AtomicUsize,
    put_delay: Option<Duration>,
}

impl FakeLogsApi {
    pub fn new() -> Self {
        Self {
            put_results: Mutex::new(VecDeque::new()),
            streams: Mutex::new(Ok(Vec::new())),
            puts: Mutex::new(Vec::new()),
            describe_calls: AtomicUsize::new(0),
            put_delay: None,
        }
    }

    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    pub fn push_put_result(&self, result: Result<(), ApiError>) {
        self.put_results.lock().unwrap().push_back(result);
    }

    pub fn set_streams(&self, streams: Result<Vec<LogStream>, ApiError>) {
        *self.streams.lock().unwrap() = streams;
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogsApi for FakeLogsApi {
    async fn describe_log_streams(
        &self,
        _group: &str,
        _stream_prefix: &str,
    ) -> Result<Vec<LogStream>, ApiError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.streams.lock().unwrap().clone()
    }

    async fn put_log_events(&self, request: &PutLogEventsRequest<'_>) -> Result<(), ApiError> {
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        self.puts.lock().unwrap().push(RecordedPut {
            group: request.log_group_name.to_string(),
            stream: request.log_stream_name.to_string(),
            messages: request
                .log_events
                .iter()
                .map(|event| event.message.clone())
                .collect(),
            sequence_token: request.sequence_token.clone(),
        });
        self.put_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

pub(crate) fn conflict(expected: &str) -> ApiError {
    ApiError::new(
        "InvalidSequenceTokenException",
        format!("The given sequenceToken is invalid. The next expected sequenceToken is: {expected}"),
    )
}

pub(crate) fn throttled() -> ApiError {
    ApiError::new("ThrottlingException", "Rate exceeded")
}

pub(crate) fn other_error() -> ApiError {
    ApiError::new("ServiceUnavailableException", "The service is unavailable")
}

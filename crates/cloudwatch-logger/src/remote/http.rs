// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`LogsApi`] over the CloudWatch Logs JSON 1.1 HTTP protocol.
//!
//! Requests are not signed here. The endpoint is expected to authenticate on
//! the logger's behalf (a signing sidecar or a local emulator).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::remote::{ApiError, LogStream, LogsApi, PutLogEventsRequest};

const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStream>,
}

#[derive(Debug, Clone)]
pub struct HttpLogsApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLogsApi {
    #[must_use]
    pub fn new(endpoint: String, https_proxy: Option<&str>, timeout: Duration) -> Self {
        let client = match build_client(https_proxy, timeout) {
            Ok(client) => client,
            Err(e) => {
                error!(
                    "CWL | Unable to parse proxy configuration: {}, no proxy will be used",
                    e
                );
                build_client(None, timeout).unwrap_or_else(|_| reqwest::Client::new())
            }
        };
        Self { client, endpoint }
    }

    /// Regional endpoint of the public service.
    #[must_use]
    pub fn regional_endpoint(region: &str) -> String {
        format!("https://logs.{region}.amazonaws.com")
    }

    async fn call<B: Serialize + Sync>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| ApiError::new("SerializationException", e.to_string()))?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header("Content-Type", CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let headers = resp.headers().clone();
        let body = resp.text().await.unwrap_or_default();
        let error = parse_error(status.as_u16(), &headers, &body);
        debug!("CWL | {} failed with status {}: {}", operation, status, error);
        Err(error)
    }
}

fn build_client(https_proxy: Option<&str>, timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    builder.build()
}

/// Builds an [`ApiError`] from an error response. The code comes from the
/// body's `__type` (after any `#` namespace), else from the
/// `x-amzn-ErrorType` header (before any `:`), else from the status.
fn parse_error(status: u16, headers: &HeaderMap, body: &str) -> ApiError {
    let json: Option<Value> = serde_json::from_str(body).ok();

    let code = json
        .as_ref()
        .and_then(|v| v.get("__type"))
        .and_then(Value::as_str)
        .and_then(|t| t.rsplit('#').next())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(ERROR_TYPE_HEADER)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.split(':').next())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Http{status}"));

    let message = json
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .map_or_else(|| body.to_string(), str::to_string);

    ApiError::new(code, message)
}

#[async_trait]
impl LogsApi for HttpLogsApi {
    async fn describe_log_streams(
        &self,
        group: &str,
        stream_prefix: &str,
    ) -> Result<Vec<LogStream>, ApiError> {
        let request = DescribeLogStreamsRequest {
            log_group_name: group,
            log_stream_name_prefix: stream_prefix,
        };
        let resp = self.call("DescribeLogStreams", &request).await?;
        let parsed: DescribeLogStreamsResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::new("DeserializationException", e.to_string()))?;
        Ok(parsed.log_streams)
    }

    async fn put_log_events(&self, request: &PutLogEventsRequest<'_>) -> Result<(), ApiError> {
        self.call("PutLogEvents", request).await?;
        Ok(())
    }
}

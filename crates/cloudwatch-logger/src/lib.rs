// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # CloudWatch Logger
//!
//! A process-local log shipping client. Application code emits leveled log
//! records; the client batches them and forwards each batch to CloudWatch Logs,
//! falling back to a local file when the remote service throttles the client.
//!
//! ## Pipeline
//!
//! ```text
//!   caller ──> LoggerHandle ──> LoggerService ──> Dispatcher
//!                                                   │
//!                          ┌────────────────────────┴──────────────┐
//!                          v                                       v
//!                   Batch ──> RemoteSink                        FileSink
//!                   (count / byte limits)  (sequence tokens)   (file:// or fallback)
//! ```
//!
//! - [`level`]: severity levels and their wire values
//! - [`record`]: log records, caller context and caller location
//! - [`formatter`]: size-bounded wire records
//! - [`batch`]: ordered in-memory buffer with count and byte thresholds
//! - [`remote`]: delivery with sequence-token conflict and throttle handling
//! - [`file_sink`]: durable line appends
//! - [`dispatcher`]: the remote/file state machine
//! - [`service`]: actor owning the dispatcher plus the cloneable handle
//! - [`config`]: `CWL_*` environment configuration and validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloudwatch_logger::{config::LoggerConfig, service::LoggerService};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), cloudwatch_logger::error::LoggerError> {
//! let config = LoggerConfig::from_env()?;
//! let (service, handle) = LoggerService::new(config)?;
//! let service_task = tokio::spawn(service.run());
//!
//! handle.warning("disk low", json!({"node": "a1"}));
//! handle.shutdown().await?;
//! let _ = service_task.await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod file_sink;
pub mod formatter;
pub mod instance;
pub mod level;
pub mod record;
pub mod remote;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use level::Level;
pub use record::Context;
pub use service::{LoggerHandle, LoggerService};

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Actor that owns the [`Dispatcher`].
//!
//! Every log call, flush and shutdown becomes a [`LoggerCommand`] on one
//! unbounded channel. [`LoggerService::run`] handles them one at a time, so
//! buffer appends, drains and the throttle fallback never interleave, and
//! callers never wait on network I/O to log.
//!
//! The service flushes one last time when it receives
//! [`LoggerHandle::shutdown`] or when every handle has been dropped.
//!
//! Log calls are fire-and-forget. When handling one fails (an unwritable log
//! file, a threshold flush that could not be delivered), the first such error
//! is kept and returned by the next [`LoggerHandle::flush`] or
//! [`LoggerHandle::shutdown`], after that flush has run.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::config::{Destination, LoggerConfig};
use crate::dispatcher::{Dispatcher, DispatcherStats, FlushOutcome, FlushReason};
use crate::error::LoggerError;
use crate::level::Level;
use crate::record::{into_context, CallerLocation, LogRecord};
use crate::remote::http::HttpLogsApi;
use crate::remote::LogsApi;

#[derive(Debug)]
pub enum LoggerCommand {
    Submit(LogRecord),
    Flush(oneshot::Sender<Result<FlushOutcome, LoggerError>>),
    Stats(oneshot::Sender<DispatcherStats>),
    Shutdown(oneshot::Sender<Result<FlushOutcome, LoggerError>>),
}

/// Cloneable entry point used by application code.
#[derive(Clone, Debug)]
pub struct LoggerHandle {
    min_level: Level,
    tx: mpsc::UnboundedSender<LoggerCommand>,
}

impl LoggerHandle {
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Debug, message, context);
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Info, message, context);
    }

    #[track_caller]
    pub fn notice(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Notice, message, context);
    }

    #[track_caller]
    pub fn warning(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Warning, message, context);
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Error, message, context);
    }

    #[track_caller]
    pub fn critical(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Critical, message, context);
    }

    #[track_caller]
    pub fn alert(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Alert, message, context);
    }

    #[track_caller]
    pub fn emergency(&self, message: impl Into<String>, context: Value) {
        self.log(Level::Emergency, message, context);
    }

    /// Queues a record at `level`, tagged with the caller's source location.
    /// Records below the minimum level are dropped here.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>, context: Value) {
        if level < self.min_level {
            return;
        }
        self.submit(LogRecord::new(
            level,
            message,
            into_context(context),
            Some(CallerLocation::caller()),
        ));
    }

    /// Queues a record built by the caller, keeping its own location.
    pub fn submit(&self, record: LogRecord) {
        if record.level < self.min_level {
            return;
        }
        if self.tx.send(LoggerCommand::Submit(record)).is_err() {
            error!("CWL | Logger service is not running, record dropped");
        }
    }

    /// Flushes the buffered records now.
    pub async fn flush(&self) -> Result<FlushOutcome, LoggerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoggerCommand::Flush(response_tx), "flush")?;
        response_rx.await.map_err(|e| {
            LoggerError::ServiceUnavailable(format!("Failed to receive flush response: {e}"))
        })?
    }

    pub async fn stats(&self) -> Result<DispatcherStats, LoggerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoggerCommand::Stats(response_tx), "stats")?;
        response_rx.await.map_err(|e| {
            LoggerError::ServiceUnavailable(format!("Failed to receive stats response: {e}"))
        })
    }

    /// Flushes everything queued before this call and stops the service.
    pub async fn shutdown(&self) -> Result<FlushOutcome, LoggerError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoggerCommand::Shutdown(response_tx), "shutdown")?;
        response_rx.await.map_err(|e| {
            LoggerError::ServiceUnavailable(format!("Failed to receive shutdown response: {e}"))
        })?
    }

    /// Logs `message` at EMERGENCY, shuts the service down and exits the
    /// process with status 1.
    #[track_caller]
    pub fn abort(&self, message: impl Into<String>, context: Value) -> impl Future<Output = ()> + '_ {
        self.log(Level::Emergency, message, context);
        async move {
            if let Err(e) = self.shutdown().await {
                error!("CWL | Final flush before abort failed: {}", e);
            }
            std::process::exit(1);
        }
    }

    #[must_use]
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    fn send(&self, command: LoggerCommand, name: &str) -> Result<(), LoggerError> {
        self.tx.send(command).map_err(|e| {
            LoggerError::ServiceUnavailable(format!("Failed to send {name} command: {e}"))
        })
    }
}

pub struct LoggerService {
    dispatcher: Dispatcher,
    rx: mpsc::UnboundedReceiver<LoggerCommand>,
    /// First submit failure since the last flush reply.
    pending_error: Option<LoggerError>,
}

impl LoggerService {
    /// Builds the service for `config`, talking HTTP to the configured
    /// endpoint when the destination is remote.
    pub fn new(config: LoggerConfig) -> Result<(Self, LoggerHandle), LoggerError> {
        let api: Option<Arc<dyn LogsApi>> = match config.destination()? {
            Destination::Remote { .. } => Some(Arc::new(HttpLogsApi::new(
                config.remote_endpoint(),
                config.https_proxy.as_deref(),
                config.flush_timeout,
            ))),
            Destination::File { .. } => None,
        };
        Self::build(&config, api)
    }

    /// Builds the service on top of a caller supplied [`LogsApi`].
    pub fn with_api(
        config: LoggerConfig,
        api: Arc<dyn LogsApi>,
    ) -> Result<(Self, LoggerHandle), LoggerError> {
        Self::build(&config, Some(api))
    }

    fn build(
        config: &LoggerConfig,
        api: Option<Arc<dyn LogsApi>>,
    ) -> Result<(Self, LoggerHandle), LoggerError> {
        let dispatcher = Dispatcher::new(config, api)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = LoggerHandle {
            min_level: dispatcher.min_level(),
            tx,
        };
        let service = Self {
            dispatcher,
            rx,
            pending_error: None,
        };

        Ok((service, handle))
    }

    pub async fn run(mut self) {
        debug!(
            "CWL | Logger service started, destination {:?}",
            self.dispatcher.destination()
        );

        while let Some(command) = self.rx.recv().await {
            match command {
                LoggerCommand::Submit(record) => {
                    if let Err(e) = self.dispatcher.submit(record).await {
                        error!("CWL | Failed to process log record: {}", e);
                        self.pending_error.get_or_insert(e);
                    }
                }
                LoggerCommand::Flush(response_tx) => {
                    let result = self.flush(FlushReason::Manual).await;
                    if response_tx.send(result).is_err() {
                        error!("CWL | Failed to send flush response - receiver dropped");
                    }
                }
                LoggerCommand::Stats(response_tx) => {
                    if response_tx.send(self.dispatcher.stats()).is_err() {
                        error!("CWL | Failed to send stats response - receiver dropped");
                    }
                }
                LoggerCommand::Shutdown(response_tx) => {
                    debug!("CWL | Logger service shutting down");
                    let result = self.flush(FlushReason::Shutdown).await;
                    if response_tx.send(result).is_err() {
                        error!("CWL | Failed to send shutdown response - receiver dropped");
                    }
                    return;
                }
            }
        }

        debug!("CWL | All logger handles dropped, flushing before exit");
        if let Err(e) = self.flush(FlushReason::Shutdown).await {
            error!("CWL | Final flush failed: {}", e);
        }
    }

    /// Flushes, then reports the pending submit failure if there is one.
    async fn flush(&mut self, reason: FlushReason) -> Result<FlushOutcome, LoggerError> {
        let result = self.dispatcher.flush(reason).await;
        match self.pending_error.take() {
            Some(e) => {
                if let Err(flush_error) = result {
                    error!("CWL | Flush failed: {}", flush_error);
                }
                Err(e)
            }
            None => result,
        }
    }
}

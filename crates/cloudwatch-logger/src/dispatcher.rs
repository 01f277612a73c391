// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Routing of records between the batch and the file sink.
//!
//! # Modes
//!
//! The dispatcher is in one of two modes, derived from its live
//! [`Destination`]:
//!
//! - [`Mode::Remote`]: records are formatted and buffered in a [`Batch`],
//!   which is flushed to the [`RemoteSink`] when a threshold is reached, on
//!   request, or at shutdown.
//! - [`Mode::File`]: records are formatted and appended straight to a file.
//!
//! The initial mode comes from the configured destination. The only
//! transition is `Remote -> File`, taken when the remote service throttles a
//! flush. The destination is then replaced by the emergency file
//! `<emergency_dir>/<group>-<stream>.log`, the throttled batch is written
//! there line by line and every later record follows it. There is no way
//! back to `Remote` for the life of the dispatcher.
//!
//! # Flush Before Append
//!
//! A record that would push the batch to its byte limit, or arrive when the
//! batch already holds `batch_size` records, first flushes the batch. The
//! flushed batch never contains the triggering record.
//!
//! # Failed Deliveries
//!
//! A batch that fails for any reason other than throttling (retries
//! exhausted, timeout, a sequence conflict that survived its retry) is
//! spilled to the emergency file and the flush returns
//! [`LoggerError::Delivery`]. The mode does not change and the records are
//! not re-buffered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::batch::Batch;
use crate::config::{Destination, LoggerConfig};
use crate::constants::{INSTANCE_KEY, LOG_LEVEL_KEY};
use crate::error::{DeliveryError, LoggerError};
use crate::file_sink::{emergency_path, FileSink};
use crate::formatter::{compose_message, format_record};
use crate::instance;
use crate::level::Level;
use crate::record::{LogRecord, WireRecord};
use crate::remote::{LogsApi, RemoteSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Remote,
    File,
}

/// Why a flush was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    Shutdown,
    ByteLimit,
    CountLimit,
    Manual,
}

/// What a flush did with the buffered records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Empty,
    /// The records were accepted by the remote service.
    Delivered(usize),
    /// The remote service throttled the batch; the records went to the
    /// emergency file and the dispatcher is now in file mode.
    DegradedToFile(usize),
}

/// Point-in-time counters of a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherStats {
    pub mode: Mode,
    pub destination: Destination,
    pub buffered_records: usize,
    pub buffered_bytes: usize,
    /// Flushes that reached the remote service.
    pub flushes: u64,
    pub delivered_records: u64,
    /// Records written to the emergency file after a failed delivery.
    pub spilled_records: u64,
    /// Records written to a file in file mode, including degraded batches.
    pub file_records: u64,
}

#[derive(Debug, Default)]
struct Counters {
    flushes: u64,
    delivered_records: u64,
    spilled_records: u64,
    file_records: u64,
}

pub struct Dispatcher {
    destination: Destination,
    remote: Option<RemoteSink>,
    file_sink: FileSink,
    batch: Batch,
    min_level: Level,
    instance: String,
    strip_prefix: Option<String>,
    batch_size: usize,
    max_batch_bytes: usize,
    max_record_bytes: usize,
    emergency_dir: PathBuf,
    counters: Counters,
}

impl Dispatcher {
    /// Builds a dispatcher for `config`. `api` is required when the
    /// destination is remote and ignored otherwise.
    pub fn new(config: &LoggerConfig, api: Option<Arc<dyn LogsApi>>) -> Result<Self, LoggerError> {
        config.validate()?;
        let destination = config.destination()?;

        let remote = match (&destination, api) {
            (Destination::Remote { .. }, Some(api)) => Some(RemoteSink::new(
                api,
                config.flush_timeout,
                config.retry_strategy,
            )),
            (Destination::Remote { group, .. }, None) => {
                return Err(LoggerError::InvalidConfig(format!(
                    "no remote client available for log group '{group}'"
                )));
            }
            (Destination::File { .. }, _) => None,
        };

        Ok(Self {
            destination,
            remote,
            file_sink: FileSink,
            batch: Batch::new(),
            min_level: config.min_level,
            instance: instance::resolve(config.instance.as_deref()),
            strip_prefix: config.strip_prefix.clone(),
            batch_size: config.batch_size,
            max_batch_bytes: config.max_batch_bytes,
            max_record_bytes: config.max_record_bytes,
            emergency_dir: config.emergency_dir.clone(),
            counters: Counters::default(),
        })
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        match self.destination {
            Destination::Remote { .. } => Mode::Remote,
            Destination::File { .. } => Mode::File,
        }
    }

    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    #[must_use]
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    /// Accepts one record.
    ///
    /// Records below the minimum level are dropped without formatting. An
    /// error from a threshold flush is returned after the record itself has
    /// been buffered or written, so the record is never lost to it.
    pub async fn submit(&mut self, record: LogRecord) -> Result<(), LoggerError> {
        if record.level < self.min_level {
            return Ok(());
        }

        let wire = self.format(record);

        if self.mode() == Mode::File {
            return self.write_to_file(&wire);
        }

        let mut flush_result = Ok(());
        if self.batch.would_overflow_bytes(&wire, self.max_batch_bytes) {
            if let Err(e) = self.flush(FlushReason::ByteLimit).await {
                flush_result = Err(e);
            }
        }
        if self.mode() == Mode::Remote && self.batch.would_overflow_count(self.batch_size) {
            if let Err(e) = self.flush(FlushReason::CountLimit).await {
                flush_result = Err(e);
            }
        }

        match self.mode() {
            Mode::Remote => self.batch.append(wire),
            // the flush above degraded to file
            Mode::File => self.write_to_file(&wire)?,
        }
        flush_result
    }

    /// Delivers the buffered records.
    pub async fn flush(&mut self, reason: FlushReason) -> Result<FlushOutcome, LoggerError> {
        let (group, stream) = match &self.destination {
            Destination::Remote { group, stream } => (group.clone(), stream.clone()),
            Destination::File { .. } => return Ok(FlushOutcome::Empty),
        };
        if self.batch.is_empty() {
            return Ok(FlushOutcome::Empty);
        }
        let Some(remote) = self.remote.clone() else {
            return Err(LoggerError::ServiceUnavailable(
                "remote destination has no remote sink".to_string(),
            ));
        };

        let records = self.batch.drain();
        let count = records.len();
        debug!("CWL | Flushing {} records ({:?})", count, reason);

        let token = remote.current_token(&group, &stream).await;
        let delivery = remote.deliver(&group, &stream, &records, token).await;
        self.counters.flushes += 1;

        match delivery {
            Ok(()) => {
                self.counters.delivered_records += count as u64;
                debug!("CWL | Delivered {} records to {}/{}", count, group, stream);
                Ok(FlushOutcome::Delivered(count))
            }
            Err(DeliveryError::Throttled(e)) => {
                let path = emergency_path(&self.emergency_dir, &group, &stream);
                warn!(
                    "CWL | Throttled by remote service ({}), degrading to file {}",
                    e,
                    path.display()
                );
                self.destination = Destination::File { path: path.clone() };
                self.remote = None;
                self.append_records(&path, &records)?;
                self.counters.file_records += count as u64;
                Ok(FlushOutcome::DegradedToFile(count))
            }
            Err(e) => {
                let path = emergency_path(&self.emergency_dir, &group, &stream);
                error!(
                    "CWL | Failed to deliver {} records, writing them to {}: {}",
                    count,
                    path.display(),
                    e
                );
                self.append_records(&path, &records)?;
                self.counters.spilled_records += count as u64;
                Err(LoggerError::Delivery(e))
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            mode: self.mode(),
            destination: self.destination.clone(),
            buffered_records: self.batch.len(),
            buffered_bytes: self.batch.current_bytes(),
            flushes: self.counters.flushes,
            delivered_records: self.counters.delivered_records,
            spilled_records: self.counters.spilled_records,
            file_records: self.counters.file_records,
        }
    }

    fn format(&self, record: LogRecord) -> WireRecord {
        let location = record.location_label(self.strip_prefix.as_deref());
        let LogRecord {
            level,
            message,
            mut context,
            timestamp_ms,
            ..
        } = record;

        context.insert(
            LOG_LEVEL_KEY.to_string(),
            Value::String(level.name().to_string()),
        );
        context.insert(INSTANCE_KEY.to_string(), Value::String(self.instance.clone()));

        let message = compose_message(level, &location, &message);
        format_record(&message, &context, self.max_record_bytes, timestamp_ms)
    }

    fn write_to_file(&mut self, wire: &WireRecord) -> Result<(), LoggerError> {
        let Destination::File { path } = &self.destination else {
            return Ok(());
        };
        if let Err(e) = self.file_sink.append(path, wire.timestamp, &wire.message) {
            error!("CWL | {}", e);
            return Err(e);
        }
        self.counters.file_records += 1;
        Ok(())
    }

    fn append_records(&self, path: &Path, records: &[WireRecord]) -> Result<(), LoggerError> {
        self.file_sink.append_records(path, records).map_err(|e| {
            error!("CWL | {}", e);
            e
        })
    }
}

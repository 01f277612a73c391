// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits of the CloudWatch Logs `PutLogEvents` API as used by the logger.
//!
//! The remote service accounts every event as its UTF-8 message length plus a
//! fixed overhead, and rejects batches that exceed a count or size budget.
//! The defaults below are the budgets the logger batches against; they can be
//! lowered through [`crate::config::LoggerConfig`].

/// Bytes the remote service adds to each event on top of its message length.
pub const RECORD_OVERHEAD_BYTES: usize = 26;

/// Default upper bound, in bytes, for a single formatted record.
///
/// Records whose wire size exceeds this limit are truncated by
/// [`crate::formatter::format_record`].
pub const MAX_RECORD_SIZE_BYTES: usize = 262_144;

/// Default upper bound, in bytes, for the sum of wire sizes in one batch.
pub const MAX_BATCH_SIZE_BYTES: usize = 262_144;

/// Default maximum number of records per batch.
pub const MAX_BATCH_ENTRIES: usize = 100;

/// Number of leading characters kept when a record is truncated.
pub const TRUNCATED_MESSAGE_CHARS: usize = 100;

/// Marker appended to a truncated message.
pub const TRUNCATION_MARKER: &str = "[TRUNCATED]";

/// Value that replaces every redacted context field of a truncated record.
pub const REDACTED_VALUE: &str = "REMOVED";

/// Context key carrying the human readable level name.
pub const LOG_LEVEL_KEY: &str = "log_level";

/// Context key carrying the resolved instance identity.
pub const INSTANCE_KEY: &str = "instance";

/// Destination prefix selecting the local file sink.
pub const FILE_SCHEME: &str = "file://";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu-west-1";

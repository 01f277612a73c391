// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::panic::Location;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::RECORD_OVERHEAD_BYTES;
use crate::level::Level;

/// Structured context attached to a record. Key order is preserved.
pub type Context = Map<String, Value>;

/// Normalizes whatever the caller passed as context into a [`Context`].
///
/// Objects are used as is, `null` becomes an empty context, arrays are keyed
/// by their index and any other scalar is stored under the key `"0"`.
#[must_use]
pub fn into_context(value: Value) -> Context {
    match value {
        Value::Object(map) => map,
        Value::Null => Context::new(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        scalar => {
            let mut context = Context::new();
            context.insert("0".to_string(), scalar);
            context
        }
    }
}

/// Source position of the logging call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallerLocation {
    file: &'static str,
    line: u32,
}

impl CallerLocation {
    #[must_use]
    pub fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller of the function this is called from. Works
    /// through any chain of `#[track_caller]` functions.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }

    /// `"<file>(<line>)"`, with `strip_prefix` removed from the front of the
    /// file path when it matches.
    #[must_use]
    pub fn label(&self, strip_prefix: Option<&str>) -> String {
        let file = strip_prefix
            .filter(|prefix| !prefix.is_empty())
            .and_then(|prefix| self.file.strip_prefix(prefix))
            .unwrap_or(self.file);
        format!("{}({})", file, self.line)
    }
}

/// Label used when no caller location is known.
pub const UNKNOWN_LOCATION: &str = "Bootstrap(0)";

/// A log call as emitted by application code, before formatting.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub context: Context,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub location: Option<CallerLocation>,
}

impl LogRecord {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn new(
        level: Level,
        message: impl Into<String>,
        context: Context,
        location: Option<CallerLocation>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            context,
            timestamp_ms: now_millis(),
            location,
        }
    }

    #[must_use]
    pub fn location_label(&self, strip_prefix: Option<&str>) -> String {
        self.location.map_or_else(
            || UNKNOWN_LOCATION.to_string(),
            |location| location.label(strip_prefix),
        )
    }
}

/// One event as sent to the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WireRecord {
    pub message: String,
    pub timestamp: i64,
}

impl WireRecord {
    /// Size the remote service charges for this event.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        self.message.len() + RECORD_OVERHEAD_BYTES
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

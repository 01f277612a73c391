// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Local file sink.
//!
//! Used as the permanent target for `file://` destinations and as the
//! emergency target once the remote service has throttled the client. Every
//! call opens the file in append mode (creating it and its directories),
//! writes, flushes and closes, so nothing is buffered between calls.
//!
//! Line format:
//!
//! ```text
//! [2025-01-15 10:30:45] WARNING src/main.rs(12) disk low {"node":"a1","log_level":"WARNING","instance":"web-1"}
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::LoggerError;
use crate::record::WireRecord;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `<dir>/<group>-<stream>.log`
///
/// Group and stream names may contain path separators (`/aws/lambda/app`).
/// Leading separators are dropped and the rest become `_`, so the file always
/// lands directly inside `dir`.
#[must_use]
pub fn emergency_path(dir: &Path, group: &str, stream: &str) -> PathBuf {
    dir.join(format!(
        "{}-{}.log",
        file_name_component(group),
        file_name_component(stream)
    ))
}

fn file_name_component(name: &str) -> String {
    name.trim_start_matches(['/', '\\']).replace(['/', '\\'], "_")
}

/// `"[YYYY-MM-DD HH:MM:SS] <text>\n"`, timestamp rendered in UTC.
#[must_use]
pub fn format_line(timestamp_ms: i64, text: &str) -> String {
    let time = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or_else(Utc::now);
    format!("[{}] {}\n", time.format(TIMESTAMP_FORMAT), text)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl FileSink {
    /// Appends one line to `path`.
    pub fn append(&self, path: &Path, timestamp_ms: i64, text: &str) -> Result<(), LoggerError> {
        self.write_lines(path, &format_line(timestamp_ms, text))
    }

    /// Appends one line per record, each stamped with its own timestamp.
    pub fn append_records(&self, path: &Path, records: &[WireRecord]) -> Result<(), LoggerError> {
        if records.is_empty() {
            return Ok(());
        }
        let lines: String = records
            .iter()
            .map(|record| format_line(record.timestamp, &record.message))
            .collect();
        self.write_lines(path, &lines)
    }

    fn write_lines(&self, path: &Path, lines: &str) -> Result<(), LoggerError> {
        let io_error = |source| LoggerError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        file.write_all(lines.as_bytes()).map_err(io_error)?;
        file.flush().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_line() {
        // 2023-11-14 22:13:20 UTC
        let line = format_line(1_700_000_000_000, "INFO src/lib.rs(1) hello {}");
        assert_eq!(line, "[2023-11-14 22:13:20] INFO src/lib.rs(1) hello {}\n");
    }

    #[test]
    fn test_emergency_path() {
        let path = emergency_path(Path::new("/tmp"), "billing", "web-1");
        assert_eq!(path, PathBuf::from("/tmp/billing-web-1.log"));
    }

    #[test]
    fn test_emergency_path_stays_inside_dir() {
        let dir = Path::new("/var/tmp/cwl");

        let path = emergency_path(dir, "/aws/lambda/app", "2024/01/01/[$LATEST]abc");
        assert_eq!(
            path,
            PathBuf::from("/var/tmp/cwl/aws_lambda_app-2024_01_01_[$LATEST]abc.log")
        );
        assert_eq!(path.parent(), Some(dir));

        let path = emergency_path(dir, "../../etc", "..\\passwd");
        assert_eq!(path.parent(), Some(dir));
        assert_eq!(path, PathBuf::from("/var/tmp/cwl/.._.._etc-.._passwd.log"));
    }

    #[test]
    fn test_append_creates_directories_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("app.log");
        let sink = FileSink;

        sink.append(&path, 1_700_000_000_000, "first").unwrap();
        sink.append(&path, 1_700_000_001_000, "second").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "[2023-11-14 22:13:20] first\n[2023-11-14 22:13:21] second\n"
        );
    }

    #[test]
    fn test_append_records_writes_one_line_each_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.log");
        let records = vec![
            WireRecord {
                message: "one {}".to_string(),
                timestamp: 1_700_000_000_000,
            },
            WireRecord {
                message: "two {}".to_string(),
                timestamp: 1_700_000_002_000,
            },
        ];

        FileSink.append_records(&path, &records).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec!["[2023-11-14 22:13:20] one {}", "[2023-11-14 22:13:22] two {}"]
        );
    }

    #[test]
    fn test_append_records_empty_does_not_create_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never.log");
        FileSink.append_records(&path, &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_append_failure_is_reported() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened for append
        let result = FileSink.append(dir.path(), 0, "nope");
        match result {
            Err(LoggerError::Io { path, .. }) => assert_eq!(path, dir.path()),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}

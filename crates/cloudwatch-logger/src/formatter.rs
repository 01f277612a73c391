// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Renders records into size-bounded [`WireRecord`]s.
//!
//! A wire message is `"<message> <json context>"`. When the result would be
//! larger than the size limit, the message is cut to its first
//! [`TRUNCATED_MESSAGE_CHARS`] characters followed by [`TRUNCATION_MARKER`],
//! and the context is reduced: `log_level` and `instance` keep their values,
//! every other key stays but its value becomes [`REDACTED_VALUE`].

use serde_json::Value;

use crate::constants::{
    INSTANCE_KEY, LOG_LEVEL_KEY, RECORD_OVERHEAD_BYTES, REDACTED_VALUE, TRUNCATED_MESSAGE_CHARS,
    TRUNCATION_MARKER,
};
use crate::level::Level;
use crate::record::{Context, WireRecord};

/// `"<LEVEL> <location> <text>"`
#[must_use]
pub fn compose_message(level: Level, location: &str, text: &str) -> String {
    format!("{} {} {}", level.name(), location, text)
}

/// JSON encoding of a context, keys in insertion order.
#[must_use]
pub fn encode_context(context: &Context) -> String {
    serde_json::to_string(context).unwrap_or_else(|_| "{}".to_string())
}

/// Formats `message` and `context` into a wire record no larger than
/// `size_limit` (as measured by [`WireRecord::wire_size`]) unless even the
/// reduced form is larger. Deterministic for a given `timestamp`.
#[must_use]
pub fn format_record(
    message: &str,
    context: &Context,
    size_limit: usize,
    timestamp: i64,
) -> WireRecord {
    let full = format!("{} {}", message, encode_context(context));
    if full.len() + RECORD_OVERHEAD_BYTES <= size_limit {
        return WireRecord {
            message: full,
            timestamp,
        };
    }

    let truncated = truncate_message(message);
    let reduced = reduce_context(context);
    WireRecord {
        message: format!("{} {}", truncated, encode_context(&reduced)),
        timestamp,
    }
}

fn truncate_message(message: &str) -> String {
    let mut truncated: String = message.chars().take(TRUNCATED_MESSAGE_CHARS).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

fn reduce_context(context: &Context) -> Context {
    let mut reduced = Context::new();
    for key in [LOG_LEVEL_KEY, INSTANCE_KEY] {
        if let Some(value) = context.get(key) {
            reduced.insert(key.to_string(), value.clone());
        }
    }
    for key in context.keys() {
        if key != LOG_LEVEL_KEY && key != INSTANCE_KEY {
            reduced.insert(key.clone(), Value::String(REDACTED_VALUE.to_string()));
        }
    }
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::into_context;
    use serde_json::json;

    fn sample_context() -> Context {
        into_context(json!({
            "node": "a1",
            "payload": "x".repeat(500),
            "log_level": "WARNING",
            "instance": "i-0abc",
        }))
    }

    #[test]
    fn test_compose_message() {
        assert_eq!(
            compose_message(Level::Warning, "src/main.rs(7)", "disk low"),
            "WARNING src/main.rs(7) disk low"
        );
    }

    #[test]
    fn test_format_within_limit() {
        let context = into_context(json!({"node": "a1"}));
        let record = format_record("disk low", &context, 1024, 1_700_000_000_000);
        assert_eq!(record.message, r#"disk low {"node":"a1"}"#);
        assert_eq!(record.timestamp, 1_700_000_000_000);
        assert_eq!(record.wire_size(), record.message.len() + 26);
    }

    #[test]
    fn test_format_empty_context() {
        let record = format_record("hello", &Context::new(), 1024, 1);
        assert_eq!(record.message, "hello {}");
    }

    #[test]
    fn test_format_exactly_at_limit_is_not_truncated() {
        let context = Context::new();
        let message = "a".repeat(10);
        // "aaaaaaaaaa {}" is 13 bytes, plus 26 overhead
        let record = format_record(&message, &context, 39, 1);
        assert_eq!(record.message, "aaaaaaaaaa {}");
        let record = format_record(&message, &context, 38, 1);
        assert!(record.message.starts_with("aaaaaaaaaa[TRUNCATED]"));
    }

    #[test]
    fn test_oversized_record_is_truncated_and_redacted() {
        let message = "m".repeat(300);
        let record = format_record(&message, &sample_context(), 256, 5);

        let (text, json_part) = record.message.split_once(' ').unwrap();
        assert!(text.ends_with("[TRUNCATED]"));
        assert_eq!(text.chars().count(), 100 + "[TRUNCATED]".len());

        let reduced: Context = serde_json::from_str(json_part).unwrap();
        assert_eq!(reduced["log_level"], json!("WARNING"));
        assert_eq!(reduced["instance"], json!("i-0abc"));
        assert_eq!(reduced["node"], json!("REMOVED"));
        assert_eq!(reduced["payload"], json!("REMOVED"));
        assert_eq!(reduced.len(), 4);

        let keys: Vec<&String> = reduced.keys().collect();
        assert_eq!(keys, vec!["log_level", "instance", "node", "payload"]);
        assert_eq!(record.timestamp, 5);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let message = "é".repeat(150);
        let record = format_record(&message, &Context::new(), 64, 1);
        let (text, _) = record.message.split_once(' ').unwrap();
        assert_eq!(text, format!("{}[TRUNCATED]", "é".repeat(100)));
    }

    #[test]
    fn test_reduced_context_without_routing_fields() {
        let context = into_context(json!({"blob": "y".repeat(400)}));
        let record = format_record("short", &context, 128, 1);
        assert_eq!(record.message, r#"short[TRUNCATED] {"blob":"REMOVED"}"#);
    }

    #[test]
    fn test_format_is_deterministic() {
        let context = sample_context();
        let a = format_record("same input", &context, 256, 99);
        let b = format_record("same input", &context, 256, 99);
        assert_eq!(a, b);
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use cloudwatch_logger::record::{into_context, CallerLocation, LogRecord};
use cloudwatch_logger::Level;
use serde_json::Value;

/// Source label of records read from standard input.
pub const STDIN_LABEL: &str = "stdin";

/// Turns one input line into a record.
///
/// A JSON object with a string `message` is read as
/// `{"level": .., "message": .., "context": {..}}`, where `level` is a name
/// or a numeric value and defaults to `default_level`. Any other non-empty
/// line is shipped verbatim at `default_level`. Blank lines yield `None`.
pub fn parse_line(line: &str, line_number: u32, default_level: Level) -> Option<LogRecord> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return None;
    }

    let location = Some(CallerLocation::new(STDIN_LABEL, line_number));

    if let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(Value::String(message)) = object.remove("message") {
            let level = object
                .remove("level")
                .and_then(|level| serde_json::from_value::<Level>(level).ok())
                .unwrap_or(default_level);
            let context = object.remove("context").map(into_context).unwrap_or_default();
            return Some(LogRecord::new(level, message, context, location));
        }
    }

    Some(LogRecord::new(
        default_level,
        trimmed,
        Default::default(),
        location,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_line() {
        let record = parse_line("service started\n", 3, Level::Info).unwrap();
        assert_eq!(record.level, Level::Info);
        assert_eq!(record.message, "service started");
        assert!(record.context.is_empty());
        assert_eq!(record.location_label(None), "stdin(3)");
    }

    #[test]
    fn test_blank_line_is_skipped() {
        assert!(parse_line("", 1, Level::Info).is_none());
        assert!(parse_line("   \r\n", 1, Level::Info).is_none());
    }

    #[test]
    fn test_structured_line() {
        let line = r#"{"level":"warning","message":"disk low","context":{"node":"a1"}}"#;
        let record = parse_line(line, 1, Level::Info).unwrap();
        assert_eq!(record.level, Level::Warning);
        assert_eq!(record.message, "disk low");
        assert_eq!(record.context["node"], json!("a1"));
    }

    #[test]
    fn test_structured_line_numeric_and_missing_level() {
        let record = parse_line(r#"{"level":550,"message":"m"}"#, 1, Level::Info).unwrap();
        assert_eq!(record.level, Level::Alert);

        let record = parse_line(r#"{"message":"m"}"#, 1, Level::Notice).unwrap();
        assert_eq!(record.level, Level::Notice);

        let record = parse_line(r#"{"level":"loud","message":"m"}"#, 1, Level::Debug).unwrap();
        assert_eq!(record.level, Level::Debug);
    }

    #[test]
    fn test_structured_line_level_parses_like_configuration() {
        let record = parse_line(r#"{"level":" Critical ","message":"m"}"#, 1, Level::Info).unwrap();
        assert_eq!(record.level, Level::Critical);

        let record = parse_line(r#"{"level":"600","message":"m"}"#, 1, Level::Info).unwrap();
        assert_eq!(record.level, Level::Emergency);

        for level in [json!(201), json!(-1), json!(true), json!(null)] {
            let line = json!({"level": level, "message": "m"}).to_string();
            let record = parse_line(&line, 1, Level::Warning).unwrap();
            assert_eq!(record.level, Level::Warning);
        }
    }

    #[test]
    fn test_json_without_message_is_verbatim() {
        let line = r#"{"event":"login"}"#;
        let record = parse_line(line, 1, Level::Info).unwrap();
        assert_eq!(record.message, line);
        assert!(record.context.is_empty());
    }
}

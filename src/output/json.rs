use super::{Formatter, TickSummary, iso8601_timestamp};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, s: &TickSummary) -> String {
        let value = serde_json::json!({
            "ts": iso8601_timestamp(),
            "tick": s,
        });
        value.to_string()
    }
}

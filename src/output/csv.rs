use super::{Formatter, TickSummary, iso8601_timestamp};

pub struct CsvFormatter;

fn cell(v: Option<f64>) -> String {
    v.map_or(String::new(), |v| format!("{:.3}", v))
}

impl Formatter for CsvFormatter {
    fn format(&self, s: &TickSummary) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            iso8601_timestamp(),
            s.samples,
            s.last_sequence.map_or(String::new(), |q| q.to_string()),
            cell(s.red),
            cell(s.red_filtered),
            cell(s.infrared),
            cell(s.infrared_filtered),
            s.frame
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,samples,sequence,red,red_filtered,infrared,infrared_filtered,frame")
    }
}

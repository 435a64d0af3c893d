mod csv;
mod json;
mod text;

use chrono::Utc;

use crate::render::DisplayState;

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Per-tick summary printed by the terminal front end
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TickSummary {
    pub frame: u64,
    pub samples: usize,
    pub last_sequence: Option<i64>,
    pub red: Option<f64>,
    pub red_filtered: Option<f64>,
    pub infrared: Option<f64>,
    pub infrared_filtered: Option<f64>,
    pub red_range: Option<(f64, f64)>,
    pub infrared_range: Option<(f64, f64)>,
}

impl TickSummary {
    pub fn from_display(display: &DisplayState) -> Self {
        Self {
            frame: display.frame,
            samples: display.samples,
            last_sequence: display.last_sequence,
            red: display.raw_red.latest(),
            red_filtered: display.filtered_red.latest(),
            infrared: display.raw_infrared.latest(),
            infrared_filtered: display.filtered_infrared.latest(),
            red_range: display.filtered_red.y_range,
            infrared_range: display.filtered_infrared.y_range,
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, summary: &TickSummary) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

use super::{Formatter, TickSummary};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn value(v: Option<f64>) -> String {
    v.map_or("-".to_string(), |v| format!("{:.1}", v))
}

fn range(r: Option<(f64, f64)>) -> String {
    r.map_or("-".to_string(), |(lo, hi)| format!("{:.1}..{:.1}", lo, hi))
}

impl Formatter for TextFormatter {
    fn format(&self, s: &TickSummary) -> String {
        let seq = s
            .last_sequence
            .map_or("-".to_string(), |q| q.to_string());
        if self.verbose {
            format!(
                "#{:<6} n={:<3} seq={:<8} red: {:>8} -> {:>8} [{}]  ir: {:>8} -> {:>8} [{}]",
                s.frame,
                s.samples,
                seq,
                value(s.red),
                value(s.red_filtered),
                range(s.red_range),
                value(s.infrared),
                value(s.infrared_filtered),
                range(s.infrared_range)
            )
        } else {
            format!(
                "seq={:<8} red: {:>8}  ir: {:>8}",
                seq,
                value(s.red_filtered),
                value(s.infrared_filtered)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> TickSummary {
        TickSummary {
            frame: 3,
            samples: 2,
            last_sequence: Some(42),
            red: Some(1000.0),
            red_filtered: Some(998.24),
            infrared: Some(2000.0),
            infrared_filtered: None,
            red_range: Some((990.0, 1010.0)),
            infrared_range: None,
        }
    }

    #[test]
    fn test_compact_line() {
        let line = TextFormatter::new(false).format(&summary());
        assert!(line.starts_with("seq=42"));
        assert!(line.contains("998.2"));
        assert!(line.ends_with('-'));
    }

    #[test]
    fn test_verbose_line_has_ranges() {
        let line = TextFormatter::new(true).format(&summary());
        assert!(line.contains("990.0..1010.0"));
        assert!(line.starts_with("#3"));
    }
}

use crate::error::ParseError;

/// Tag that identifies a PPG record on the device's text stream
pub const PPG_MARKER: &str = "PPG_RAW";

const MIN_FIELDS: usize = 4;

/// One acquired PPG reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Device-assigned counter; advisory only
    pub sequence: i64,
    /// Red LED intensity
    pub red: i64,
    /// Infrared LED intensity
    pub infrared: i64,
}

/// Parse one device line
///
/// Expected layout: `PPG_RAW,<sequence>,<red>,<infrared>[,...]`.
///
/// Returns `Ok(None)` for lines that do not carry the marker (firmware chatter,
/// boot banners); those are not errors. A marked line that cannot be decoded
/// yields a [`ParseError`].
pub fn parse_line(line: &str) -> Result<Option<Sample>, ParseError> {
    let line = line.trim();
    if !line.contains(PPG_MARKER) {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields {
            expected: MIN_FIELDS,
            found: fields.len(),
        });
    }

    let sequence = parse_field(&fields, 1)?;
    let red = parse_field(&fields, 2)?;
    let infrared = parse_field(&fields, 3)?;

    Ok(Some(Sample {
        sequence,
        red,
        infrared,
    }))
}

fn parse_field(fields: &[&str], index: usize) -> Result<i64, ParseError> {
    let raw = fields[index].trim();
    raw.parse().map_err(|_| ParseError::InvalidField {
        index,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_record() {
        let sample = parse_line("PPG_RAW,42,1000,2000").unwrap();
        assert_eq!(
            sample,
            Some(Sample {
                sequence: 42,
                red: 1000,
                infrared: 2000
            })
        );
    }

    #[test]
    fn test_ignores_unmarked_lines() {
        assert_eq!(parse_line("GARBAGE"), Ok(None));
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("HR,72,98"), Ok(None));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let sample = parse_line("PPG_RAW,7,11,13,99,extra").unwrap().unwrap();
        assert_eq!(sample.sequence, 7);
        assert_eq!(sample.red, 11);
        assert_eq!(sample.infrared, 13);
    }

    #[test]
    fn test_trims_line_endings_and_padding() {
        let sample = parse_line("PPG_RAW, 1 ,2, 3\r\n").unwrap().unwrap();
        assert_eq!(
            sample,
            Sample {
                sequence: 1,
                red: 2,
                infrared: 3
            }
        );
    }

    #[test]
    fn test_negative_values() {
        let sample = parse_line("PPG_RAW,-1,-200,300").unwrap().unwrap();
        assert_eq!(sample.sequence, -1);
        assert_eq!(sample.red, -200);
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            parse_line("PPG_RAW,1,2"),
            Err(ParseError::TooFewFields {
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn test_non_integer_field() {
        assert_eq!(
            parse_line("PPG_RAW,1,abc,3"),
            Err(ParseError::InvalidField {
                index: 2,
                value: "abc".to_string()
            })
        );
        assert!(parse_line("PPG_RAW,1,2,3.5").is_err());
    }

    #[test]
    fn test_marker_anywhere_in_line() {
        // Field 1..3 positions are fixed relative to the split, not the marker
        let sample = parse_line("xPPG_RAW,5,6,7").unwrap().unwrap();
        assert_eq!(sample.sequence, 5);
    }

    #[test]
    fn test_parse_is_pure() {
        for line in ["PPG_RAW,42,1000,2000", "GARBAGE", "PPG_RAW,x,1,2"] {
            assert_eq!(parse_line(line), parse_line(line));
        }
    }
}

use anyhow::Result;
use regex::Regex;

/// Pattern for a temperature token: optional leading minus, digits,
/// optional fractional part. Matches "23", "-4", "12.5", "100.".
const NUMBER_PATTERN: &str = r"-?\d+\.?\d*";

/// A single extraction result: the parsed value (if any) and the raw OCR
/// text it came from. Recomputed every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: Option<f64>,
    pub raw_text: String,
}

impl Reading {
    /// An empty reading carrying only the raw text.
    pub fn empty(raw_text: &str) -> Self {
        Self {
            value: None,
            raw_text: raw_text.to_string(),
        }
    }
}

/// Extracts the first numeric token from OCR output.
///
/// Returns a reading with `value: None` when the text contains no numeric
/// token or the token fails to parse. Unit characters ("C", "°F") around
/// the number are ignored by the pattern.
pub fn parse_reading(text: &str) -> Result<Reading> {
    let number_regex = Regex::new(NUMBER_PATTERN)?;
    let trimmed = text.trim();

    let Some(token) = number_regex.find(trimmed) else {
        return Ok(Reading::empty(trimmed));
    };

    Ok(Reading {
        value: token.as_str().parse::<f64>().ok(),
        raw_text: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_with_unit_suffix() {
        let reading = parse_reading("12.5C").unwrap();
        assert_eq!(reading.value, Some(12.5));
        assert_eq!(reading.raw_text, "12.5C");
    }

    #[test]
    fn test_integer_value() {
        assert_eq!(parse_reading("48").unwrap().value, Some(48.0));
    }

    #[test]
    fn test_negative_value() {
        assert_eq!(parse_reading("-4.5°C").unwrap().value, Some(-4.5));
    }

    #[test]
    fn test_trailing_decimal_point() {
        assert_eq!(parse_reading("50.").unwrap().value, Some(50.0));
    }

    #[test]
    fn test_first_token_wins() {
        assert_eq!(parse_reading("23.1 57.9").unwrap().value, Some(23.1));
    }

    #[test]
    fn test_no_digits_yields_none() {
        let reading = parse_reading("°C --").unwrap();
        assert_eq!(reading.value, None);
        assert_eq!(reading.raw_text, "°C --");
    }

    #[test]
    fn test_empty_text() {
        let reading = parse_reading("   \n").unwrap();
        assert_eq!(reading.value, None);
        assert_eq!(reading.raw_text, "");
    }

    #[test]
    fn test_bare_minus_is_not_a_value() {
        assert_eq!(parse_reading("-").unwrap().value, None);
    }

    #[test]
    fn test_raw_text_is_trimmed() {
        let reading = parse_reading("  36.6C \n").unwrap();
        assert_eq!(reading.raw_text, "36.6C");
        assert_eq!(reading.value, Some(36.6));
    }
}

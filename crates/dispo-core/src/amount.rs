//! Promised-amount verification.

use serde_json::Value;

/// Parse a model-written amount: every character other than digits and
/// `.` is dropped ("Rs. 4,000/-" reads as 4000). Zero, negative or
/// unparsable values are absent.
pub fn parse_amount(raw: &str) -> Option<f64> {
    if raw.trim_start().starts_with('-') {
        return None;
    }
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let digits = digits.trim_matches('.');
    let value: f64 = digits.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Read an amount from a raw JSON value. Numbers are taken as numbers, so
/// `1e20` is not flattened to the digits "120"; strings go through
/// [`parse_amount`].
pub fn from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite() && *v > 0.0),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// The integer part as the transcript would spell it.
pub fn integer_numeral(amount: f64) -> String {
    format!("{}", amount.trunc() as u64)
}

/// Whether the amount's integer numeral occurs verbatim in the text.
pub fn is_grounded(amount: f64, transcript: &str) -> bool {
    transcript.contains(&integer_numeral(amount))
}

/// Whether free text echoes the amount's numeral.
pub fn echoes_amount(text: &str, amount: f64) -> bool {
    let numeral = integer_numeral(amount);
    let compact: String = text.chars().filter(|c| *c != ',').collect();
    compact.contains(&numeral)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formatted_amounts() {
        assert_eq!(parse_amount("4000"), Some(4000.0));
        assert_eq!(parse_amount("Rs. 4,000/-"), Some(4000.0));
        assert_eq!(parse_amount("₹2500.50"), Some(2500.5));
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-500"), None);
        assert_eq!(parse_amount("none"), None);
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn json_numbers_read_as_numbers() {
        use serde_json::json;
        assert_eq!(from_value(&json!(4000)), Some(4000.0));
        assert_eq!(from_value(&json!(1e20)), Some(1e20));
        assert_eq!(from_value(&json!(-5)), None);
        assert_eq!(from_value(&json!("Rs. 4,000/-")), Some(4000.0));
        assert_eq!(from_value(&json!(true)), None);
        assert!(!is_grounded(1e20, "120 rupaye"));
    }

    #[test]
    fn grounding_checks_integer_digits() {
        assert!(is_grounded(4000.0, "main 5 Feb ko 4000 de dunga"));
        assert!(is_grounded(4000.75, "4000 rupaye"));
        assert!(!is_grounded(10000.0, "I don't have the money"));
        assert!(!is_grounded(4000.0, "4,000 de dunga"));
    }

    #[test]
    fn echo_ignores_thousands_separators() {
        assert!(echoes_amount("Customer promised 10,000", 10000.0));
        assert!(!echoes_amount("Customer promised full amount", 10000.0));
    }
}

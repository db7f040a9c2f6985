//! Record types exchanged between the model, the normalizer, and exports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;
use crate::calendar;
use crate::schema::{Disposition, PaymentDisposition, ReasonForNotPaying};

/// A normalized extraction.
///
/// Serialises with every field present (absent values as `null`), dates as
/// `YYYY-MM-DD`, and `review_flags` only when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub disposition: Option<Disposition>,
    pub payment_disposition: Option<PaymentDisposition>,
    pub reason_for_not_paying: Option<ReasonForNotPaying>,
    pub ptp_amount: Option<f64>,
    pub ptp_date: Option<NaiveDate>,
    pub followup_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_flags: Vec<ReviewFlag>,
}

impl ExtractionRecord {
    /// The record as an untrusted mapping, e.g. to normalize it again.
    pub fn to_raw(&self) -> RawExtraction {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => RawExtraction(map),
            _ => RawExtraction::default(),
        }
    }
}

/// Which date field a decision applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    PtpDate,
    FollowupDate,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PtpDate => "ptp_date",
            Self::FollowupDate => "followup_date",
        }
    }
}

/// A correction the normalizer made on weak evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewFlag {
    /// A past date was kept because the transcript names a later month.
    PastDateKept { field: DateField },
    /// A past date was rolled forward into a month other than the one the
    /// transcript names.
    NamedMonthConflict { field: DateField },
}

impl ReviewFlag {
    pub fn label(&self) -> String {
        match self {
            Self::PastDateKept { field } => format!("past_date_kept:{}", field.as_str()),
            Self::NamedMonthConflict { field } => {
                format!("named_month_conflict:{}", field.as_str())
            }
        }
    }
}

/// Untrusted key/value output of the model. Any key may be missing or hold
/// a value of the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawExtraction(pub Map<String, Value>);

impl RawExtraction {
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(CoreError::NotAnObject),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(CoreError::NotAnObject),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// The value as text: strings verbatim, numbers and booleans rendered,
    /// everything else absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The value as a number, accepting numeric strings.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// The evidence a raw extraction is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    pub transcript: String,
    pub reference_date: NaiveDate,
}

impl SourceContext {
    /// Without a reference date, today's local date is used.
    pub fn new(transcript: impl Into<String>, reference_date: Option<NaiveDate>) -> Self {
        Self {
            transcript: transcript.into(),
            reference_date: reference_date.unwrap_or_else(calendar::today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialises_all_fields_and_iso_dates() {
        let record = ExtractionRecord {
            payment_disposition: Some(PaymentDisposition::Ptp),
            ptp_amount: Some(4000.0),
            ptp_date: NaiveDate::from_ymd_opt(2026, 2, 5),
            confidence_score: 0.9,
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ptp_date"], "2026-02-05");
        assert_eq!(json["payment_disposition"], "PTP");
        assert!(json["followup_date"].is_null());
        assert!(json["disposition"].is_null());
        assert!(json.get("review_flags").is_none());
    }

    #[test]
    fn review_flags_serialise_tagged() {
        let record = ExtractionRecord {
            review_flags: vec![ReviewFlag::PastDateKept {
                field: DateField::PtpDate,
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["review_flags"][0]["kind"], "past_date_kept");
        assert_eq!(json["review_flags"][0]["field"], "ptp_date");
        assert_eq!(record.review_flags[0].label(), "past_date_kept:ptp_date");
    }

    #[test]
    fn raw_extraction_rejects_non_objects() {
        assert!(RawExtraction::from_json_str(r#"{"ptp_amount": 10}"#).is_ok());
        assert!(matches!(
            RawExtraction::from_json_str("[1, 2]"),
            Err(CoreError::NotAnObject)
        ));
        assert!(matches!(
            RawExtraction::from_json_str("{oops"),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn raw_accessors_tolerate_mistyped_values() {
        let raw = RawExtraction::from_json_str(
            r#"{"a": "5000", "b": 12.5, "c": null, "d": [1], "e": " 3 "}"#,
        )
        .unwrap();
        assert_eq!(raw.text("a").as_deref(), Some("5000"));
        assert_eq!(raw.text("b").as_deref(), Some("12.5"));
        assert_eq!(raw.text("c"), None);
        assert_eq!(raw.text("d"), None);
        assert_eq!(raw.number("b"), Some(12.5));
        assert_eq!(raw.number("e"), Some(3.0));
        assert_eq!(raw.number("missing"), None);
    }

    #[test]
    fn record_round_trips_through_raw() {
        let record = ExtractionRecord {
            ptp_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            remarks: Some("will pay".into()),
            ..Default::default()
        };
        let raw = record.to_raw();
        assert_eq!(raw.text("ptp_date").as_deref(), Some("2026-03-01"));
        assert_eq!(raw.text("remarks").as_deref(), Some("will pay"));
    }
}

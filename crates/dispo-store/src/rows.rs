use chrono::NaiveDate;
use dispo_core::{ExtractionRecord, RawExtraction};
use serde::{Deserialize, Serialize};

/// One line of a batch input file.
///
/// `raw` is required for normalization and ignored for prediction, where
/// the model produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawExtraction>,
}

/// A normalized record tagged with the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub record: ExtractionRecord,
}

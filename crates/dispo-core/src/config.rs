use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Replacement remarks when the model echoed an amount the transcript
/// never mentions.
pub const DEFAULT_SCRUBBED_REMARKS: &str = "Customer mentioned full amount (exact figure not in text)";

/// Tunable behaviour of the [`Normalizer`](crate::Normalizer).
///
/// Every field is defaulted, so a config file only names what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Scan the model's own remarks for a promise date before the transcript.
    pub rescue_from_remarks: bool,

    /// Replace remarks that echo a rejected amount.
    pub scrub_remarks: bool,

    pub scrubbed_remarks_text: String,

    /// Copy `ptp_date` into an empty `followup_date`.
    pub followup_defaults_to_ptp: bool,

    /// Upper bound on `confidence_score` for records carrying review flags.
    pub flagged_confidence_cap: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            rescue_from_remarks: true,
            scrub_remarks: true,
            scrubbed_remarks_text: DEFAULT_SCRUBBED_REMARKS.to_string(),
            followup_defaults_to_ptp: true,
            flagged_confidence_cap: 0.5,
        }
    }
}

impl NormalizerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = NormalizerConfig::from_json_str(r#"{"flagged_confidence_cap": 0.3}"#).unwrap();
        assert_eq!(config.flagged_confidence_cap, 0.3);
        assert!(config.rescue_from_remarks);
        assert_eq!(config.scrubbed_remarks_text, DEFAULT_SCRUBBED_REMARKS);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(NormalizerConfig::from_json_str("{}").unwrap(), NormalizerConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            NormalizerConfig::from_json_str(r#"{"scrub_remarks": "yes"}"#),
            Err(CoreError::Json(_))
        ));
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("transcript is empty")]
    EmptyTranscript,

    #[error("generation failed: {0}")]
    Backend(String),

    #[error("no JSON object in generation ({reason})")]
    InvalidJson { reason: String, raw: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "http")]
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
}

impl InferenceError {
    /// The generation text, when the failure was a parse of model output.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::InvalidJson { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

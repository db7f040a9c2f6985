use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind} label: {value:?}")]
    UnknownLabel { kind: &'static str, value: String },

    #[error("invalid reference date {value:?}: expected YYYY-MM-DD")]
    InvalidReferenceDate { value: String },

    #[error("raw extraction is not a JSON object")]
    NotAnObject,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

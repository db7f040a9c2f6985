//! LLM extraction layer: a pluggable text-generation backend, confidence
//! scoring, the extraction service, and evaluation of its output.

mod error;
pub use error::InferenceError;

pub mod confidence;
pub mod eval;
pub mod extract;
pub mod generator;
pub mod prompt;

mod service;
pub use generator::{GenerateRequest, Generation, TextGenerator};
pub use service::ExtractionService;

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::HttpGenerator;

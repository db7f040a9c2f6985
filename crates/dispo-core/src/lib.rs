//! Label schema, record types, and the transcript-grounded normalizer for
//! loan-collection call extractions.

pub mod amount;
pub mod calendar;
mod config;
mod error;
mod normalize;
pub mod record;
pub mod resolve;
pub mod schema;

pub use config::{DEFAULT_SCRUBBED_REMARKS, NormalizerConfig};
pub use error::CoreError;
pub use normalize::{Normalizer, clean_remarks};
pub use record::{DateField, ExtractionRecord, RawExtraction, ReviewFlag, SourceContext};
pub use schema::{Disposition, Label, PaymentDisposition, ReasonForNotPaying, SCHEMA_VERSION};

//! Record IO: JSONL batches in and out, Arrow/Parquet export of normalized records.

mod error;
pub use error::StoreError;

mod export;
pub use export::{batch_to_records, read_parquet, records_to_batch, write_parquet};

mod jsonl;
pub use jsonl::{read_jsonl, read_jsonl_from, write_jsonl, write_jsonl_to};

mod rows;
pub use rows::{CallInput, IdentifiedRecord};

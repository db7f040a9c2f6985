use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::StoreError;

/// Read one JSON value per line. Blank lines are skipped; errors carry the
/// 1-based line number.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let items = read_jsonl_from(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), rows = items.len(), "read jsonl");
    Ok(items)
}

pub fn read_jsonl_from<T: DeserializeOwned, R: BufRead>(reader: R) -> Result<Vec<T>, StoreError> {
    let mut items = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| StoreError::Json {
            line: i + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_jsonl_to(&mut out, items)?;
    out.flush()?;
    info!(path = %path.display(), rows = items.len(), "wrote jsonl");
    Ok(())
}

pub fn write_jsonl_to<T: Serialize, W: Write>(out: &mut W, items: &[T]) -> Result<(), StoreError> {
    for item in items {
        serde_json::to_writer(&mut *out, item)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

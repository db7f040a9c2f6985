//! Batch pipelines: read JSONL calls → normalize or predict → write JSONL
//! (and optionally Parquet).

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use dispo_ai::{ExtractionService, TextGenerator};
use dispo_core::{Normalizer, SourceContext};
use dispo_store::{CallInput, IdentifiedRecord};
use serde_json::{Value, json};
use tracing::warn;

/// Generations per progress update in prediction batches.
const PREDICT_CHUNK: usize = 64;

pub struct BatchStats {
    pub total_rows: usize,
    pub failed_rows: usize,
    pub elapsed_secs: f64,
}

fn progress(done: usize, total: usize, verb: &str) {
    eprint!(
        "\r  {verb} {done}/{total} ({:.1}%)",
        done as f64 / total.max(1) as f64 * 100.0
    );
}

fn export_parquet(records: &[IdentifiedRecord], parquet: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = parquet {
        let batch = dispo_store::records_to_batch(records).context("building record batch")?;
        dispo_store::write_parquet(path, &batch)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("  Wrote {} rows to {}", records.len(), path.display());
    }
    Ok(())
}

/// Normalize every line of `input` that carries a `raw` extraction.
/// Lines without one are counted as failed and skipped.
pub fn run_normalize_batch(
    normalizer: &Normalizer,
    input: &Path,
    output: &Path,
    parquet: Option<&Path>,
    default_reference: Option<NaiveDate>,
) -> anyhow::Result<BatchStats> {
    let start = Instant::now();

    let calls: Vec<CallInput> =
        dispo_store::read_jsonl(input).with_context(|| format!("reading {}", input.display()))?;
    let total_rows = calls.len();
    eprintln!("  Read {total_rows} calls from {}", input.display());

    let mut records = Vec::with_capacity(total_rows);
    let mut failed_rows = 0usize;
    for (i, call) in calls.into_iter().enumerate() {
        let Some(raw) = call.raw else {
            warn!(id = ?call.id, line = i + 1, "no raw extraction, skipped");
            failed_rows += 1;
            continue;
        };
        let ctx = SourceContext::new(call.transcript, call.reference_date.or(default_reference));
        records.push(IdentifiedRecord {
            id: call.id,
            record: normalizer.normalize(&raw, &ctx),
        });
        progress(i + 1, total_rows, "Normalized");
    }
    eprintln!();

    dispo_store::write_jsonl(output, &records)
        .with_context(|| format!("writing {}", output.display()))?;
    export_parquet(&records, parquet)?;

    Ok(BatchStats {
        total_rows,
        failed_rows,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

/// Predict every line of `input`. Failed predictions are written as
/// `{id, error, raw_output}` lines so evaluation can count them.
pub async fn run_predict_batch<G: TextGenerator>(
    service: &ExtractionService<G>,
    input: &Path,
    output: &Path,
    parquet: Option<&Path>,
    default_reference: Option<NaiveDate>,
    concurrency: usize,
) -> anyhow::Result<BatchStats> {
    let start = Instant::now();

    let calls: Vec<CallInput> =
        dispo_store::read_jsonl(input).with_context(|| format!("reading {}", input.display()))?;
    let total_rows = calls.len();
    eprintln!("  Read {total_rows} calls from {}", input.display());

    let mut lines: Vec<Value> = Vec::with_capacity(total_rows);
    let mut records = Vec::new();
    let mut failed_rows = 0usize;

    for chunk in calls.chunks(PREDICT_CHUNK) {
        let items = chunk
            .iter()
            .map(|c| (c.transcript.clone(), c.reference_date.or(default_reference)))
            .collect();
        let results = service.predict_batch(items, concurrency).await;

        for (call, result) in chunk.iter().zip(results) {
            match result {
                Ok(record) => {
                    let row = IdentifiedRecord {
                        id: call.id.clone(),
                        record,
                    };
                    lines.push(serde_json::to_value(&row)?);
                    records.push(row);
                }
                Err(e) => {
                    failed_rows += 1;
                    lines.push(json!({
                        "id": call.id,
                        "error": e.to_string(),
                        "raw_output": e.raw_output(),
                    }));
                }
            }
        }
        progress(lines.len(), total_rows, "Predicted");
    }
    eprintln!();

    dispo_store::write_jsonl(output, &lines)
        .with_context(|| format!("writing {}", output.display()))?;
    export_parquet(&records, parquet)?;

    Ok(BatchStats {
        total_rows,
        failed_rows,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

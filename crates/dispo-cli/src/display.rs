//! Terminal rendering: record cards from exported batches, and evaluation
//! reports.
//!
//! Cards render one row of a record batch grouped by section, skipping
//! sections with nothing to show.

use arrow::array::*;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use dispo_ai::eval::EvalReport;

// ── Schema section groupings ──

const OUTCOME: &[&str] = &["disposition", "payment_disposition", "reason_for_not_paying"];

const PROMISE: &[&str] = &["ptp_amount", "ptp_date", "followup_date"];

const NOTES: &[&str] = &["remarks", "confidence_score", "review_flags"];

// ── Record cards ──

/// Print row `row` of an exported record batch as a vertical card.
pub fn print_record_card(batch: &RecordBatch, row: usize) -> anyhow::Result<()> {
    anyhow::ensure!(
        row < batch.num_rows(),
        "row {row} out of range ({} rows)",
        batch.num_rows()
    );
    let id = get_utf8(batch, "id", row).unwrap_or_else(|| format!("row {row}"));

    println!("=== {id} ===");
    println!();
    print_section(batch, row, "Outcome", OUTCOME);
    print_section(batch, row, "Promise", PROMISE);
    print_section(batch, row, "Notes", NOTES);
    Ok(())
}

/// Index of the row whose `id` column equals `id`.
pub fn find_row(batch: &RecordBatch, id: &str) -> Option<usize> {
    (0..batch.num_rows()).find(|&i| get_utf8(batch, "id", i).as_deref() == Some(id))
}

fn print_section(batch: &RecordBatch, row: usize, header: &str, cols: &[&str]) {
    let has_data = cols.iter().any(|&col| {
        batch
            .schema()
            .index_of(col)
            .ok()
            .is_some_and(|i| !batch.column(i).is_null(row))
    });
    if !has_data {
        return;
    }

    println!("{header}");
    for &col_name in cols {
        let Ok(idx) = batch.schema().index_of(col_name) else {
            continue;
        };
        let col = batch.column(idx);
        if col.is_null(row) {
            continue;
        }

        match col.data_type() {
            DataType::Utf8 => {
                if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
                    println!("  {:<26} {}", col_name, arr.value(row));
                }
            }
            DataType::Float64 => {
                if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
                    println!("  {:<26} {}", col_name, arr.value(row));
                }
            }
            DataType::Date32 => {
                let formatted = arrow::util::display::ArrayFormatter::try_new(
                    col.as_ref(),
                    &Default::default(),
                );
                match formatted {
                    Ok(fmt) => println!("  {:<26} {}", col_name, fmt.value(row)),
                    Err(_) => println!("  {:<26} (date)", col_name),
                }
            }
            DataType::List(_) => print_list_utf8(col.as_ref(), row, col_name),
            _ => println!("  {:<26} {:?}", col_name, col),
        }
    }
    println!();
}

fn print_list_utf8(col: &dyn Array, row: usize, col_name: &str) {
    let Some(list) = col.as_any().downcast_ref::<ListArray>() else {
        return;
    };
    let values = list.value(row);
    let Some(strings) = values.as_any().downcast_ref::<StringArray>() else {
        return;
    };
    let items: Vec<&str> = strings.iter().flatten().collect();
    if items.is_empty() {
        return;
    }
    println!("  {:<26} {}", col_name, items.join(", "));
}

fn get_utf8(batch: &RecordBatch, col_name: &str, row: usize) -> Option<String> {
    let col = batch.column_by_name(col_name)?;
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
}

// ── Evaluation report ──

pub fn print_eval_report(report: &EvalReport) {
    let total = report.total;
    println!("[GLOBAL METRICS]");
    println!("{:<26} {}", "Total samples", total);
    println!(
        "{:<26} {:>6.1}% ({}/{})",
        "Valid JSON",
        report.valid_json_rate() * 100.0,
        report.valid_json,
        total
    );
    println!(
        "{:<26} {:>6.1}% ({}/{})",
        "Exact match (all)",
        report.exact_match_rate() * 100.0,
        report.exact_match,
        total
    );
    println!(
        "{:<26} {:>6.1}% ({}/{})",
        "Exact match (no remarks)",
        report.exact_match_no_remarks_rate() * 100.0,
        report.exact_match_no_remarks,
        total
    );

    println!();
    println!("[FIELD ACCURACY]");
    println!("{:<26} | {:>9} | {:>13}", "Field", "Accuracy", "Hallucination");
    println!("{}", "-".repeat(56));
    for f in &report.fields {
        println!(
            "{:<26} | {:>8.1}% | {:>12.1}%",
            f.field,
            f.accuracy() * 100.0,
            f.hallucination_rate() * 100.0
        );
    }

    for labels in &report.labels {
        println!();
        println!("[PER-LABEL: {}]", labels.field.to_uppercase());
        println!(
            "{:<40} | {:>7} | {:>7} | {:>7} | Support",
            "Label", "Prec", "Rec", "F1"
        );
        println!("{}", "-".repeat(85));
        for (label, stats) in &labels.labels {
            println!(
                "{:<40} | {:>6.1}% | {:>6.1}% | {:>6.1}% | {}",
                label,
                stats.precision() * 100.0,
                stats.recall() * 100.0,
                stats.f1() * 100.0,
                stats.support()
            );
        }
        if !labels.labels.is_empty() {
            println!("{}", "-".repeat(85));
            println!(
                "{:<40} | {:>7} | {:>7} | {:>6.1}% | {}",
                "MACRO AVERAGE",
                "-",
                "-",
                labels.macro_f1() * 100.0,
                labels.total_support()
            );
            println!(
                "{:<40} | {:>7} | {:>7} | {:>6.1}% | {}",
                "WEIGHTED AVERAGE",
                "-",
                "-",
                labels.weighted_f1() * 100.0,
                labels.total_support()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dispo_core::ExtractionRecord;
    use dispo_store::IdentifiedRecord;

    fn batch() -> RecordBatch {
        let rows = vec![
            IdentifiedRecord {
                id: Some("call-1".into()),
                record: ExtractionRecord::default(),
            },
            IdentifiedRecord {
                id: Some("call-2".into()),
                record: ExtractionRecord {
                    ptp_date: NaiveDate::from_ymd_opt(2026, 2, 5),
                    ..Default::default()
                },
            },
        ];
        dispo_store::records_to_batch(&rows).unwrap()
    }

    #[test]
    fn finds_rows_by_id() {
        let batch = batch();
        assert_eq!(find_row(&batch, "call-2"), Some(1));
        assert_eq!(find_row(&batch, "call-9"), None);
    }

    #[test]
    fn card_rejects_out_of_range_rows() {
        let batch = batch();
        assert!(print_record_card(&batch, 1).is_ok());
        assert!(print_record_card(&batch, 2).is_err());
    }
}

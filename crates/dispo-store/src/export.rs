//! Arrow/Parquet export of normalized records, using the core record schema.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::*;
use arrow::record_batch::RecordBatch;
use arrow::datatypes::Date32Type;
use chrono::NaiveDate;
use dispo_core::schema::arrow_schema::record_schema;
use dispo_core::{ExtractionRecord, ReviewFlag};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::{IdentifiedRecord, StoreError};

fn to_date32(date: NaiveDate) -> i32 {
    Date32Type::from_naive_date(date)
}

/// One row per record, columns in [`record_schema`] order.
pub fn records_to_batch(rows: &[IdentifiedRecord]) -> Result<RecordBatch, StoreError> {
    let records: Vec<&ExtractionRecord> = rows.iter().map(|r| &r.record).collect();

    let ids = StringArray::from(rows.iter().map(|r| r.id.as_deref()).collect::<Vec<_>>());
    let disposition = StringArray::from(
        records
            .iter()
            .map(|r| r.disposition.map(|l| l.to_string()))
            .collect::<Vec<_>>(),
    );
    let payment = StringArray::from(
        records
            .iter()
            .map(|r| r.payment_disposition.map(|l| l.to_string()))
            .collect::<Vec<_>>(),
    );
    let reason = StringArray::from(
        records
            .iter()
            .map(|r| r.reason_for_not_paying.map(|l| l.to_string()))
            .collect::<Vec<_>>(),
    );
    let amount = Float64Array::from(records.iter().map(|r| r.ptp_amount).collect::<Vec<_>>());
    let ptp_date = Date32Array::from(
        records
            .iter()
            .map(|r| r.ptp_date.map(to_date32))
            .collect::<Vec<_>>(),
    );
    let followup_date = Date32Array::from(
        records
            .iter()
            .map(|r| r.followup_date.map(to_date32))
            .collect::<Vec<_>>(),
    );
    let remarks = StringArray::from(
        records
            .iter()
            .map(|r| r.remarks.as_deref())
            .collect::<Vec<_>>(),
    );
    let confidence = Float64Array::from(
        records
            .iter()
            .map(|r| r.confidence_score)
            .collect::<Vec<_>>(),
    );

    let mut flags = ListBuilder::new(StringBuilder::new());
    for record in &records {
        for flag in &record.review_flags {
            flags.values().append_value(flag.label());
        }
        flags.append(true);
    }

    let batch = RecordBatch::try_new(
        Arc::new(record_schema()),
        vec![
            Arc::new(ids),
            Arc::new(disposition),
            Arc::new(payment),
            Arc::new(reason),
            Arc::new(amount),
            Arc::new(ptp_date),
            Arc::new(followup_date),
            Arc::new(remarks),
            Arc::new(confidence),
            Arc::new(flags.finish()),
        ],
    )?;
    Ok(batch)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| StoreError::Other(format!("column {name:?} missing or mistyped")))
}

fn string_at(array: &StringArray, i: usize) -> Option<&str> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn flag_from_label(label: &str) -> Option<ReviewFlag> {
    use dispo_core::DateField;
    let (kind, field) = label.split_once(':')?;
    let field = match field {
        "ptp_date" => DateField::PtpDate,
        "followup_date" => DateField::FollowupDate,
        _ => return None,
    };
    match kind {
        "past_date_kept" => Some(ReviewFlag::PastDateKept { field }),
        "named_month_conflict" => Some(ReviewFlag::NamedMonthConflict { field }),
        _ => None,
    }
}

/// Inverse of [`records_to_batch`]. Labels are parsed strictly.
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<IdentifiedRecord>, StoreError> {
    let ids = column::<StringArray>(batch, "id")?;
    let disposition = column::<StringArray>(batch, "disposition")?;
    let payment = column::<StringArray>(batch, "payment_disposition")?;
    let reason = column::<StringArray>(batch, "reason_for_not_paying")?;
    let amount = column::<Float64Array>(batch, "ptp_amount")?;
    let ptp_date = column::<Date32Array>(batch, "ptp_date")?;
    let followup_date = column::<Date32Array>(batch, "followup_date")?;
    let remarks = column::<StringArray>(batch, "remarks")?;
    let confidence = column::<Float64Array>(batch, "confidence_score")?;
    let flags = column::<ListArray>(batch, "review_flags")?;

    let date_at =
        |array: &Date32Array, i: usize| (!array.is_null(i)).then(|| Date32Type::to_naive_date(array.value(i)));

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let review_flags = if flags.is_null(i) {
            Vec::new()
        } else {
            let values = flags.value(i);
            let strings = values
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| StoreError::Other("review_flags items are not strings".into()))?;
            strings.iter().flatten().filter_map(flag_from_label).collect()
        };

        out.push(IdentifiedRecord {
            id: string_at(ids, i).map(str::to_string),
            record: ExtractionRecord {
                disposition: string_at(disposition, i).map(str::parse).transpose()?,
                payment_disposition: string_at(payment, i).map(str::parse).transpose()?,
                reason_for_not_paying: string_at(reason, i).map(str::parse).transpose()?,
                ptp_amount: (!amount.is_null(i)).then(|| amount.value(i)),
                ptp_date: date_at(ptp_date, i),
                followup_date: date_at(followup_date, i),
                remarks: string_at(remarks, i).map(str::to_string),
                confidence_score: confidence.value(i),
                review_flags,
            },
        });
    }
    Ok(out)
}

pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    info!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispo_core::{DateField, Disposition, PaymentDisposition};
    use tempfile::TempDir;

    fn sample() -> Vec<IdentifiedRecord> {
        vec![
            IdentifiedRecord {
                id: Some("call-1".into()),
                record: ExtractionRecord {
                    disposition: Some(Disposition::Answered),
                    payment_disposition: Some(PaymentDisposition::Ptp),
                    ptp_amount: Some(4000.0),
                    ptp_date: NaiveDate::from_ymd_opt(2026, 2, 5),
                    followup_date: NaiveDate::from_ymd_opt(2026, 2, 5),
                    remarks: Some("Will pay on 5 Feb".into()),
                    confidence_score: 0.5,
                    review_flags: vec![ReviewFlag::NamedMonthConflict {
                        field: DateField::PtpDate,
                    }],
                    ..Default::default()
                },
            },
            IdentifiedRecord {
                id: None,
                record: ExtractionRecord::default(),
            },
        ]
    }

    #[test]
    fn batch_matches_schema() {
        let batch = records_to_batch(&sample()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().as_ref(), &record_schema());

        let dates = column::<Date32Array>(&batch, "ptp_date").unwrap();
        assert_eq!(dates.value(0), to_date32(NaiveDate::from_ymd_opt(2026, 2, 5).unwrap()));
        assert!(dates.is_null(1));
    }

    #[test]
    fn dates_are_days_since_epoch() {
        assert_eq!(to_date32(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(to_date32(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()), -1);
    }

    #[test]
    fn parquet_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.parquet");
        let rows = sample();

        write_parquet(&path, &records_to_batch(&rows).unwrap()).unwrap();
        let batches = read_parquet(&path).unwrap();
        let back: Vec<IdentifiedRecord> = batches
            .iter()
            .map(batch_to_records)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(back, rows);
    }

    #[test]
    fn missing_parquet_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_parquet(&dir.path().join("none.parquet")),
            Err(StoreError::NotFound(_))
        ));
    }
}

//! Transcript-grounded repair of a model's raw extraction.
//!
//! [`Normalizer::normalize`] never fails: a field that cannot be validated
//! against the transcript becomes null. The pass, field by field:
//!
//! 1. Labels, remarks and confidence are cleaned.
//! 2. `ptp_amount` survives only if its integer digits occur in the
//!    transcript.
//! 3. `ptp_date` is rescued by strategy (absolute date, then weekday, then
//!    relative token), each tried on the remarks and the transcript before
//!    the next. Then comes a day-of-month phrase in the transcript, and
//!    only then the model's own value. `followup_date` comes from the
//!    model's value alone; when it equals the promise date it is kept as is.
//! 4. Model-written dates must have their day number in the transcript.
//! 5. A month the transcript names overrides the month of a date the text
//!    did not pin.
//! 6. Past dates roll forward one month.
//! 7. An empty followup takes the promise date.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::amount;
use crate::calendar;
use crate::config::NormalizerConfig;
use crate::record::{DateField, ExtractionRecord, RawExtraction, ReviewFlag, SourceContext};
use crate::resolve::{DateResolver, DayOfMonth, ModelValue, Origin, Resolution, ResolverChain};
use crate::schema::{
    Disposition, Label, PaymentDisposition, ReasonForNotPaying, is_null_like, parse_label,
};
use crate::CoreError;

static DAY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?\b").expect("day token regex")
});

/// Remarks that carry no information.
pub fn clean_remarks(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < 3 || is_null_like(trimmed) || trimmed == "-" {
        return None;
    }
    Some(trimmed.to_string())
}

/// Whether `day` occurs as a whole token ("5", "05", "5th") in the text.
fn day_in_text(day: u32, text: &str) -> bool {
    let lower = text.to_lowercase();
    DAY_TOKEN
        .captures_iter(&lower)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .any(|d| d == day)
}

pub struct Normalizer {
    config: NormalizerConfig,
    rescue: ResolverChain,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("config", &self.config)
            .field("rescue", &self.rescue)
            .finish()
    }
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            rescue: ResolverChain::rescue(),
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Parse `raw_json` as an object and normalize it.
    pub fn normalize_json(
        &self,
        raw_json: &str,
        ctx: &SourceContext,
    ) -> Result<ExtractionRecord, CoreError> {
        let raw = RawExtraction::from_json_str(raw_json)?;
        Ok(self.normalize(&raw, ctx))
    }

    pub fn normalize(&self, raw: &RawExtraction, ctx: &SourceContext) -> ExtractionRecord {
        let transcript = ctx.transcript.as_str();
        let reference = ctx.reference_date;

        let mut record = ExtractionRecord {
            disposition: label::<Disposition>(raw, "disposition"),
            payment_disposition: label::<PaymentDisposition>(raw, "payment_disposition"),
            reason_for_not_paying: label::<ReasonForNotPaying>(raw, "reason_for_not_paying"),
            remarks: raw.text("remarks").as_deref().and_then(clean_remarks),
            confidence_score: raw
                .number("confidence_score")
                .filter(|c| c.is_finite())
                .map_or(0.0, |c| c.clamp(0.0, 1.0)),
            ..Default::default()
        };

        // ── Amount ──
        if let Some(value) = raw.get("ptp_amount").and_then(amount::from_value) {
            if amount::is_grounded(value, transcript) {
                record.ptp_amount = Some(value);
            } else {
                debug!(amount = value, "ptp_amount not in transcript, dropped");
                if self.config.scrub_remarks
                    && record
                        .remarks
                        .as_deref()
                        .is_some_and(|r| amount::echoes_amount(r, value))
                {
                    debug!("remarks echo the dropped amount, replaced");
                    record.remarks = Some(self.config.scrubbed_remarks_text.clone());
                }
            }
        }

        // ── Dates ──
        let named_month = calendar::mentioned_month(transcript);
        let mut flags = Vec::new();

        record.ptp_date = self
            .resolve_ptp(raw, record.remarks.as_deref(), ctx)
            .and_then(|hit| self.settle(DateField::PtpDate, hit, ctx, named_month, &mut flags));

        // A followup equal to the promise date rests on the same evidence.
        let ptp_date = record.ptp_date;
        record.followup_date = model_value(raw, DateField::FollowupDate, reference).and_then(|hit| {
            if Some(hit.date) == ptp_date {
                return ptp_date;
            }
            self.settle(DateField::FollowupDate, hit, ctx, named_month, &mut flags)
        });

        if self.config.followup_defaults_to_ptp && record.followup_date.is_none() {
            record.followup_date = record.ptp_date;
        }

        if !flags.is_empty() {
            record.confidence_score = record
                .confidence_score
                .min(self.config.flagged_confidence_cap);
        }
        record.review_flags = flags;
        record
    }

    fn resolve_ptp(
        &self,
        raw: &RawExtraction,
        remarks: Option<&str>,
        ctx: &SourceContext,
    ) -> Option<Resolution> {
        let reference = ctx.reference_date;
        let mut sources = Vec::with_capacity(2);
        if let Some(remarks) = remarks.filter(|_| self.config.rescue_from_remarks) {
            sources.push(("remarks", remarks));
        }
        sources.push(("transcript", ctx.transcript.as_str()));

        let texts: Vec<&str> = sources.iter().map(|(_, text)| *text).collect();
        if let Some((hit, i)) = self.rescue.resolve_across(&texts, reference) {
            let source = sources[i].0;
            debug!(field = "ptp_date", source, strategy = %hit.origin, date = %hit.date, "date rescued");
            return Some(hit);
        }

        if let Some(date) = DayOfMonth.try_resolve(&ctx.transcript, reference) {
            debug!(field = "ptp_date", source = "transcript", strategy = %Origin::DayOfMonth, %date, "date rescued");
            return Some(Resolution {
                date,
                origin: Origin::DayOfMonth,
            });
        }

        model_value(raw, DateField::PtpDate, reference)
    }

    /// Grounding, month correction and rollover for one resolved date.
    fn settle(
        &self,
        field: DateField,
        hit: Resolution,
        ctx: &SourceContext,
        named_month: Option<u32>,
        flags: &mut Vec<ReviewFlag>,
    ) -> Option<NaiveDate> {
        let reference = ctx.reference_date;
        let mut date = hit.date;

        if hit.origin.is_model() {
            if date.year() < reference.year() {
                date = date.with_year(reference.year())?;
            }
            if date != reference && !day_in_text(date.day(), &ctx.transcript) {
                debug!(field = field.as_str(), %date, "day not in transcript, dropped");
                return None;
            }
        }

        if !hit.origin.pins_month()
            && let Some(month) = named_month
            && month != date.month()
            && date.year() >= reference.year()
            && let Some(corrected) = date.with_month(month)
        {
            debug!(field = field.as_str(), from = %date, to = %corrected, "month taken from transcript");
            date = corrected;
        }

        if date >= reference {
            return Some(date);
        }
        if named_month.is_some_and(|m| m > reference.month()) {
            debug!(field = field.as_str(), %date, "past date kept for later named month");
            flags.push(ReviewFlag::PastDateKept { field });
            return Some(date);
        }
        let rolled = calendar::add_one_month(date)?;
        if named_month.is_some_and(|m| m != rolled.month()) {
            flags.push(ReviewFlag::NamedMonthConflict { field });
        }
        debug!(field = field.as_str(), from = %date, to = %rolled, "past date rolled forward");
        Some(rolled)
    }
}

fn label<L: Label>(raw: &RawExtraction, key: &str) -> Option<L> {
    raw.text(key).as_deref().and_then(parse_label)
}

fn model_value(raw: &RawExtraction, field: DateField, reference: NaiveDate) -> Option<Resolution> {
    let value = raw.text(field.as_str()).filter(|v| !is_null_like(v))?;
    ModelValue.try_resolve(&value, reference).map(|date| Resolution {
        date,
        origin: Origin::Model,
    })
}

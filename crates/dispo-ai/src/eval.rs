//! Field-level evaluation of predictions against gold extractions.
//!
//! Each row pairs a gold record (an object, or a string holding one) with a
//! prediction. A prediction carrying an `error` key counts as invalid JSON
//! and scores `error` in every field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Compared fields, in report order.
pub const FIELDS: [&str; 7] = [
    "disposition",
    "payment_disposition",
    "reason_for_not_paying",
    "ptp_amount",
    "ptp_date",
    "followup_date",
    "remarks",
];

/// Fields with per-label precision/recall.
pub const CLASS_FIELDS: [&str; 2] = ["disposition", "payment_disposition"];

const NULL: &str = "null";
const ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRow {
    pub gold: Value,
    pub prediction: Value,
}

/// The gold side as an object. Strings are searched for their outermost
/// `{...}`; anything unparsable is empty.
pub fn gold_object(gold: &Value) -> Map<String, Value> {
    match gold {
        Value::Object(map) => map.clone(),
        Value::String(s) => {
            let slice = match (s.find('{'), s.rfind('}')) {
                (Some(start), Some(end)) if start < end => &s[start..=end],
                _ => s.as_str(),
            };
            match serde_json::from_str(slice) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            }
        }
        _ => Map::new(),
    }
}

/// Comparable form of a field value: null-likes are `null`, label fields
/// upper-case, everything else lower-case. Integral numbers drop `.0`.
fn comparable(field: &str, value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => return NULL.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };
    if matches!(text.to_lowercase().as_str(), "" | "null" | "none" | "nan") {
        return NULL.to_string();
    }
    if let Ok(n) = text.parse::<f64>()
        && n.is_finite()
        && n.fract() == 0.0
        && n.abs() < 1e15
    {
        return format!("{}", n as i64);
    }
    if CLASS_FIELDS.contains(&field) {
        text.to_uppercase()
    } else {
        text.to_lowercase()
    }
}

fn normalized_row(map: Option<&Map<String, Value>>) -> BTreeMap<&'static str, String> {
    FIELDS
        .iter()
        .map(|&f| {
            let v = match map {
                Some(m) => comparable(f, m.get(f)),
                None => ERROR.to_string(),
            };
            (f, v)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelStats {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl LabelStats {
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
    }

    pub fn support(&self) -> usize {
        self.tp + self.fn_
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldScore {
    pub field: &'static str,
    pub correct: usize,
    pub hallucinated: usize,
    pub total: usize,
}

impl FieldScore {
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    /// Share of rows where gold is null but the prediction has a value.
    pub fn hallucination_rate(&self) -> f64 {
        ratio(self.hallucinated, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelReport {
    pub field: &'static str,
    pub labels: BTreeMap<String, LabelStats>,
}

impl LabelReport {
    pub fn total_support(&self) -> usize {
        self.labels.values().map(LabelStats::support).sum()
    }

    pub fn macro_f1(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.values().map(LabelStats::f1).sum::<f64>() / self.labels.len() as f64
    }

    pub fn weighted_f1(&self) -> f64 {
        let support = self.total_support();
        if support == 0 {
            return 0.0;
        }
        self.labels
            .values()
            .map(|s| s.f1() * s.support() as f64)
            .sum::<f64>()
            / support as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub total: usize,
    pub valid_json: usize,
    pub exact_match: usize,
    pub exact_match_no_remarks: usize,
    pub fields: Vec<FieldScore>,
    pub labels: Vec<LabelReport>,
}

impl EvalReport {
    pub fn valid_json_rate(&self) -> f64 {
        ratio(self.valid_json, self.total)
    }

    pub fn exact_match_rate(&self) -> f64 {
        ratio(self.exact_match, self.total)
    }

    pub fn exact_match_no_remarks_rate(&self) -> f64 {
        ratio(self.exact_match_no_remarks, self.total)
    }
}

pub fn evaluate(rows: &[EvalRow]) -> EvalReport {
    let mut fields: Vec<FieldScore> = FIELDS
        .iter()
        .map(|&field| FieldScore {
            field,
            correct: 0,
            hallucinated: 0,
            total: 0,
        })
        .collect();
    let mut labels: Vec<LabelReport> = CLASS_FIELDS
        .iter()
        .map(|&field| LabelReport {
            field,
            labels: BTreeMap::new(),
        })
        .collect();
    let (mut valid_json, mut exact_match, mut exact_match_no_remarks) = (0, 0, 0);

    for row in rows {
        let gold = normalized_row(Some(&gold_object(&row.gold)));
        let prediction = match &row.prediction {
            Value::Object(m) if !m.contains_key(ERROR) => Some(m),
            _ => None,
        };
        let valid = prediction.is_some();
        let pred = normalized_row(prediction);
        if valid {
            valid_json += 1;
        }

        for report in &mut labels {
            let (g, p) = (&gold[report.field], &pred[report.field]);
            if g == p {
                if g != NULL {
                    report.labels.entry(g.clone()).or_default().tp += 1;
                }
            } else {
                if g != NULL {
                    report.labels.entry(g.clone()).or_default().fn_ += 1;
                }
                if p != NULL && p != ERROR {
                    report.labels.entry(p.clone()).or_default().fp += 1;
                }
            }
        }

        for score in &mut fields {
            let (g, p) = (&gold[score.field], &pred[score.field]);
            score.total += 1;
            if g == p {
                score.correct += 1;
            }
            if g == NULL && p != NULL && p != ERROR {
                score.hallucinated += 1;
            }
        }

        if valid {
            if FIELDS.iter().all(|f| gold[f] == pred[f]) {
                exact_match += 1;
            }
            if FIELDS
                .iter()
                .filter(|f| **f != "remarks")
                .all(|f| gold[f] == pred[f])
            {
                exact_match_no_remarks += 1;
            }
        }
    }

    EvalReport {
        total: rows.len(),
        valid_json,
        exact_match,
        exact_match_no_remarks,
        fields,
        labels,
    }
}

//! The label schema shared by the normalizer, the evaluator, and exports.
//!
//! Every enum-valued field of an extraction record is a closed set. Model
//! output is matched leniently (case, separators, known synonyms) through
//! [`Label::from_raw`]; callers that need exact matching use `FromStr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Bumped whenever a label is added, removed, or remapped.
pub const SCHEMA_VERSION: &str = "v11";

/// Behaviour common to the three label sets.
pub trait Label: Copy + Sized + 'static {
    /// Field name, used in errors and reports.
    const KIND: &'static str;
    /// Every canonical label, in schema order.
    const ALL: &'static [Self];
    /// Non-canonical spellings seen in model output and older datasets.
    const SYNONYMS: &'static [(&'static str, Self)];
    /// Label used when the value is present but unrecognised.
    const FALLBACK: Option<Self>;

    fn as_str(&self) -> &'static str;

    /// Exact or synonym match on an already-canonicalised key.
    fn lookup(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == key)
            .or_else(|| {
                Self::SYNONYMS
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, l)| *l)
            })
    }

    /// Lenient parse of untrusted model output.
    ///
    /// Null-like strings yield `None`; unrecognised strings yield
    /// [`FALLBACK`](Self::FALLBACK).
    fn from_raw(value: &str) -> Option<Self> {
        let key = canonical_key(value);
        if is_null_like(&key) {
            return None;
        }
        Self::lookup(&key).or(Self::FALLBACK)
    }
}

/// Upper-case, trim, and map spaces/hyphens to underscores.
pub fn canonical_key(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Placeholder strings that models and datasets use for "no value".
pub fn is_null_like(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "null" | "none" | "nan" | "n/a" | "na" | "nil"
    )
}

/// Lenient parse of a label from untrusted text. See [`Label::from_raw`].
pub fn parse_label<L: Label>(value: &str) -> Option<L> {
    L::from_raw(value)
}

fn parse_strict<L: Label>(value: &str) -> Result<L, CoreError> {
    L::lookup(&canonical_key(value)).ok_or_else(|| CoreError::UnknownLabel {
        kind: L::KIND,
        value: value.to_string(),
    })
}

// ── Call disposition ──

/// Outcome of the call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Answered,
    AnsweredByFamilyMember,
    CustomerPicked,
    AgentBusyOnAnotherCall,
    SilenceIssue,
    LanguageBarrier,
    AnsweredVoiceIssue,
    CustomerAbusive,
    AutomatedVoice,
    ForwardedCall,
    Ringing,
    RingingDisconnected,
    Busy,
    SwitchedOff,
    WrongNumber,
    DoNotKnowThePerson,
    NotInContactAnymore,
    OutOfNetwork,
    OutOfServices,
    CallBackLater,
    WillAskToPay,
    GaveAlternateNumber,
    AnsweredDisconnected,
    CallDisconnectedByCustomer,
    NotAvailable,
    WrongPerson,
    NoIncomingCallRecorded,
    Others,
}

impl Label for Disposition {
    const KIND: &'static str = "disposition";
    const ALL: &'static [Self] = &[
        Self::Answered,
        Self::AnsweredByFamilyMember,
        Self::CustomerPicked,
        Self::AgentBusyOnAnotherCall,
        Self::SilenceIssue,
        Self::LanguageBarrier,
        Self::AnsweredVoiceIssue,
        Self::CustomerAbusive,
        Self::AutomatedVoice,
        Self::ForwardedCall,
        Self::Ringing,
        Self::RingingDisconnected,
        Self::Busy,
        Self::SwitchedOff,
        Self::WrongNumber,
        Self::DoNotKnowThePerson,
        Self::NotInContactAnymore,
        Self::OutOfNetwork,
        Self::OutOfServices,
        Self::CallBackLater,
        Self::WillAskToPay,
        Self::GaveAlternateNumber,
        Self::AnsweredDisconnected,
        Self::CallDisconnectedByCustomer,
        Self::NotAvailable,
        Self::WrongPerson,
        Self::NoIncomingCallRecorded,
        Self::Others,
    ];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("RNG", Self::Ringing),
        ("CALL_DISCONNECTED", Self::AnsweredDisconnected),
        ("DISCONNECTED", Self::AnsweredDisconnected),
        ("WRONG_NO", Self::WrongNumber),
        ("OTHER", Self::Others),
    ];
    const FALLBACK: Option<Self> = Some(Self::Others);

    fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "ANSWERED",
            Self::AnsweredByFamilyMember => "ANSWERED_BY_FAMILY_MEMBER",
            Self::CustomerPicked => "CUSTOMER_PICKED",
            Self::AgentBusyOnAnotherCall => "AGENT_BUSY_ON_ANOTHER_CALL",
            Self::SilenceIssue => "SILENCE_ISSUE",
            Self::LanguageBarrier => "LANGUAGE_BARRIER",
            Self::AnsweredVoiceIssue => "ANSWERED_VOICE_ISSUE",
            Self::CustomerAbusive => "CUSTOMER_ABUSIVE",
            Self::AutomatedVoice => "AUTOMATED_VOICE",
            Self::ForwardedCall => "FORWARDED_CALL",
            Self::Ringing => "RINGING",
            Self::RingingDisconnected => "RINGING_DISCONNECTED",
            Self::Busy => "BUSY",
            Self::SwitchedOff => "SWITCHED_OFF",
            Self::WrongNumber => "WRONG_NUMBER",
            Self::DoNotKnowThePerson => "DO_NOT_KNOW_THE_PERSON",
            Self::NotInContactAnymore => "NOT_IN_CONTACT_ANYMORE",
            Self::OutOfNetwork => "OUT_OF_NETWORK",
            Self::OutOfServices => "OUT_OF_SERVICES",
            Self::CallBackLater => "CALL_BACK_LATER",
            Self::WillAskToPay => "WILL_ASK_TO_PAY",
            Self::GaveAlternateNumber => "GAVE_ALTERNATE_NUMBER",
            Self::AnsweredDisconnected => "ANSWERED_DISCONNECTED",
            Self::CallDisconnectedByCustomer => "CALL_DISCONNECTED_BY_CUSTOMER",
            Self::NotAvailable => "NOT_AVAILABLE",
            Self::WrongPerson => "WRONG_PERSON",
            Self::NoIncomingCallRecorded => "NO_INCOMING_CALL_RECORDED",
            Self::Others => "OTHERS",
        }
    }
}

// ── Payment disposition ──

/// Payment outcome within an answered call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentDisposition {
    Paid,
    Ptp,
    PartialPayment,
    Settlement,
    WillPayAfterVisit,
    DeniedToPay,
    NoPaymentCommitment,
    NoProofGiven,
    WantForeclosure,
    WantsToRenegotiateLoanTerms,
    Dispute,
}

impl Label for PaymentDisposition {
    const KIND: &'static str = "payment_disposition";
    const ALL: &'static [Self] = &[
        Self::Paid,
        Self::Ptp,
        Self::PartialPayment,
        Self::Settlement,
        Self::WillPayAfterVisit,
        Self::DeniedToPay,
        Self::NoPaymentCommitment,
        Self::NoProofGiven,
        Self::WantForeclosure,
        Self::WantsToRenegotiateLoanTerms,
        Self::Dispute,
    ];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("ALREADY_PAID", Self::Paid),
        ("CLAIMING_PAYMENT_IS_COMPLETED", Self::Paid),
        ("PROMISE_TO_PAY", Self::Ptp),
        ("DENIED", Self::DeniedToPay),
        ("VISIT", Self::WillPayAfterVisit),
        ("FORECLOSURE", Self::WantForeclosure),
    ];
    // An unknown payment outcome is dropped rather than guessed.
    const FALLBACK: Option<Self> = None;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "PAID",
            Self::Ptp => "PTP",
            Self::PartialPayment => "PARTIAL_PAYMENT",
            Self::Settlement => "SETTLEMENT",
            Self::WillPayAfterVisit => "WILL_PAY_AFTER_VISIT",
            Self::DeniedToPay => "DENIED_TO_PAY",
            Self::NoPaymentCommitment => "NO_PAYMENT_COMMITMENT",
            Self::NoProofGiven => "NO_PROOF_GIVEN",
            Self::WantForeclosure => "WANT_FORECLOSURE",
            Self::WantsToRenegotiateLoanTerms => "WANTS_TO_RENEGOTIATE_LOAN_TERMS",
            Self::Dispute => "DISPUTE",
        }
    }
}

// ── Reason for not paying ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonForNotPaying {
    BusinessClosed,
    BusinessLoss,
    ClaimingFraud,
    ClaimingPaymentIsCompleted,
    CustomerExpired,
    CustomerNotTellingReason,
    CustomerOutOfStation,
    CustomerPlansToVisitBranch,
    DeathInFamily,
    FundIssue,
    GrievanceAppIssue,
    GrievanceCallerMisconduct,
    GrievanceFraud,
    GrievanceLoanAmountDispute,
    JobChangedWaitingForSalary,
    LoanClosureMiscommunication,
    LoanTakenByKnownParty,
    LostJob,
    MedicalIssue,
    MultipleLoans,
    OtherPersonTaken,
    OtherReasons,
    PenaltyIssue,
    SalaryNotCredited,
    ServiceIssue,
    TrustIssue,
}

impl Label for ReasonForNotPaying {
    const KIND: &'static str = "reason_for_not_paying";
    const ALL: &'static [Self] = &[
        Self::BusinessClosed,
        Self::BusinessLoss,
        Self::ClaimingFraud,
        Self::ClaimingPaymentIsCompleted,
        Self::CustomerExpired,
        Self::CustomerNotTellingReason,
        Self::CustomerOutOfStation,
        Self::CustomerPlansToVisitBranch,
        Self::DeathInFamily,
        Self::FundIssue,
        Self::GrievanceAppIssue,
        Self::GrievanceCallerMisconduct,
        Self::GrievanceFraud,
        Self::GrievanceLoanAmountDispute,
        Self::JobChangedWaitingForSalary,
        Self::LoanClosureMiscommunication,
        Self::LoanTakenByKnownParty,
        Self::LostJob,
        Self::MedicalIssue,
        Self::MultipleLoans,
        Self::OtherPersonTaken,
        Self::OtherReasons,
        Self::PenaltyIssue,
        Self::SalaryNotCredited,
        Self::ServiceIssue,
        Self::TrustIssue,
    ];
    const SYNONYMS: &'static [(&'static str, Self)] = &[
        ("JOB_LOST", Self::LostJob),
        ("JOB_CHALI_GAYI", Self::LostJob),
        ("UNEMPLOYED", Self::LostJob),
        ("PAISE_NAHI_HAI", Self::FundIssue),
        ("FINANCIAL_CRISIS", Self::FundIssue),
        ("FUNDS_ISSUE", Self::FundIssue),
        ("HEALTH_ISSUE", Self::MedicalIssue),
        ("TECHNICAL_ISSUE", Self::GrievanceAppIssue),
        ("LOAN_ALREADY_PAID", Self::ClaimingPaymentIsCompleted),
        ("DISPUTE_ON_INTEREST", Self::GrievanceLoanAmountDispute),
        ("RATE_OF_INTEREST_ISSUES", Self::GrievanceLoanAmountDispute),
    ];
    const FALLBACK: Option<Self> = Some(Self::OtherReasons);

    fn as_str(&self) -> &'static str {
        match self {
            Self::BusinessClosed => "BUSINESS_CLOSED",
            Self::BusinessLoss => "BUSINESS_LOSS",
            Self::ClaimingFraud => "CLAIMING_FRAUD",
            Self::ClaimingPaymentIsCompleted => "CLAIMING_PAYMENT_IS_COMPLETED",
            Self::CustomerExpired => "CUSTOMER_EXPIRED",
            Self::CustomerNotTellingReason => "CUSTOMER_NOT_TELLING_REASON",
            Self::CustomerOutOfStation => "CUSTOMER_OUT_OF_STATION",
            Self::CustomerPlansToVisitBranch => "CUSTOMER_PLANS_TO_VISIT_BRANCH",
            Self::DeathInFamily => "DEATH_IN_FAMILY",
            Self::FundIssue => "FUND_ISSUE",
            Self::GrievanceAppIssue => "GRIEVANCE_APP_ISSUE",
            Self::GrievanceCallerMisconduct => "GRIEVANCE_CALLER_MISCONDUCT",
            Self::GrievanceFraud => "GRIEVANCE_FRAUD",
            Self::GrievanceLoanAmountDispute => "GRIEVANCE_LOAN_AMOUNT_DISPUTE",
            Self::JobChangedWaitingForSalary => "JOB_CHANGED_WAITING_FOR_SALARY",
            Self::LoanClosureMiscommunication => "LOAN_CLOSURE_MISCOMMUNICATION",
            Self::LoanTakenByKnownParty => "LOAN_TAKEN_BY_KNOWN_PARTY",
            Self::LostJob => "LOST_JOB",
            Self::MedicalIssue => "MEDICAL_ISSUE",
            Self::MultipleLoans => "MULTIPLE_LOANS",
            Self::OtherPersonTaken => "OTHER_PERSON_TAKEN",
            Self::OtherReasons => "OTHER_REASONS",
            Self::PenaltyIssue => "PENALTY_ISSUE",
            Self::SalaryNotCredited => "SALARY_NOT_CREDITED",
            Self::ServiceIssue => "SERVICE_ISSUE",
            Self::TrustIssue => "TRUST_ISSUE",
        }
    }
}

macro_rules! label_traits {
    ($($ty:ty),*) => {$(
        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_strict(s)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

label_traits!(Disposition, PaymentDisposition, ReasonForNotPaying);

/// Arrow schema for exported, normalized records.
pub mod arrow_schema {
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    /// One row per normalized record. `id` is the caller's correlation key.
    pub fn record_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, true),
            Field::new("disposition", DataType::Utf8, true),
            Field::new("payment_disposition", DataType::Utf8, true),
            Field::new("reason_for_not_paying", DataType::Utf8, true),
            Field::new("ptp_amount", DataType::Float64, true),
            Field::new("ptp_date", DataType::Date32, true),
            Field::new("followup_date", DataType::Date32, true),
            Field::new("remarks", DataType::Utf8, true),
            Field::new("confidence_score", DataType::Float64, false),
            Field::new(
                "review_flags",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                true,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_as_str() {
        for d in Disposition::ALL {
            assert_eq!(serde_json::to_value(d).unwrap(), d.as_str());
        }
        for p in PaymentDisposition::ALL {
            assert_eq!(serde_json::to_value(p).unwrap(), p.as_str());
        }
        for r in ReasonForNotPaying::ALL {
            assert_eq!(serde_json::to_value(r).unwrap(), r.as_str());
        }
    }

    #[test]
    fn lenient_parse_normalises_case_and_separators() {
        assert_eq!(
            Disposition::from_raw("  answered by family-member "),
            Some(Disposition::AnsweredByFamilyMember)
        );
        assert_eq!(PaymentDisposition::from_raw("ptp"), Some(PaymentDisposition::Ptp));
    }

    #[test]
    fn parse_label_picks_the_label_type() {
        assert_eq!(parse_label::<Disposition>("wrong number"), Some(Disposition::WrongNumber));
        assert_eq!(parse_label::<PaymentDisposition>("null"), None);
    }

    #[test]
    fn synonyms_map_to_canonical_labels() {
        assert_eq!(Disposition::from_raw("RNG"), Some(Disposition::Ringing));
        assert_eq!(
            PaymentDisposition::from_raw("ALREADY_PAID"),
            Some(PaymentDisposition::Paid)
        );
        assert_eq!(
            ReasonForNotPaying::from_raw("job chali gayi"),
            Some(ReasonForNotPaying::LostJob)
        );
    }

    #[test]
    fn null_like_values_are_absent() {
        for v in ["", "null", "None", " NaN ", "n/a"] {
            assert_eq!(Disposition::from_raw(v), None, "{v:?}");
            assert_eq!(ReasonForNotPaying::from_raw(v), None, "{v:?}");
        }
    }

    #[test]
    fn unknown_values_use_fallback() {
        assert_eq!(Disposition::from_raw("HUNG_UP_TWICE"), Some(Disposition::Others));
        assert_eq!(
            ReasonForNotPaying::from_raw("ALIENS"),
            Some(ReasonForNotPaying::OtherReasons)
        );
        assert_eq!(PaymentDisposition::from_raw("MAYBE_LATER"), None);
    }

    #[test]
    fn strict_parse_rejects_unknown() {
        assert_eq!("WRONG_NUMBER".parse::<Disposition>().unwrap(), Disposition::WrongNumber);
        let err = "MAYBE".parse::<PaymentDisposition>().unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnknownLabel { kind: "payment_disposition", .. }
        ));
    }

    #[test]
    fn synonyms_point_at_distinct_spellings() {
        for (alias, _) in Disposition::SYNONYMS {
            assert!(Disposition::ALL.iter().all(|d| d.as_str() != *alias));
        }
        for (alias, _) in ReasonForNotPaying::SYNONYMS {
            assert!(ReasonForNotPaying::ALL.iter().all(|r| r.as_str() != *alias));
        }
    }

    #[test]
    fn record_schema_has_expected_fields() {
        let schema = arrow_schema::record_schema();
        assert_eq!(schema.fields().len(), 10);
        assert!(schema.field_with_name("ptp_date").is_ok());
        assert!(!schema.field_with_name("confidence_score").unwrap().is_nullable());
    }
}

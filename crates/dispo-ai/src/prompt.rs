//! The extraction prompt.

use chrono::NaiveDate;

use crate::generator::GenerateRequest;

pub const MAX_TOKENS: u32 = 512;

// ── Prompt templates ──

pub const SYSTEM_PROMPT: &str = "\
You extract structured disposition data from loan-collection calls between an agent and a borrower. \
Transcripts may mix English, Hindi and Hinglish.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"disposition\": \"call outcome label\" or null,
  \"payment_disposition\": \"payment outcome label, e.g. PTP\" or null,
  \"reason_for_not_paying\": \"reason label\" or null,
  \"ptp_amount\": promised amount as a number or null,
  \"ptp_date\": \"YYYY-MM-DD\" or null,
  \"followup_date\": \"YYYY-MM-DD\" or null,
  \"remarks\": \"one-line summary, e.g. 'will pay one EMI'\" or null
}

Rules:
- Only extract what the transcript states. If an amount or date is not mentioned, use null. Never guess.
- Resolve relative dates (today, kal, parso, Friday, next week, 10th) against the current date given with the transcript.
- Dates and amounts belong in their own fields, not only in remarks.
- A family member answering is ANSWERED_BY_FAMILY_MEMBER. A request to call later is CALL_BACK_LATER.
- A borrower who will not commit to a date is NO_PAYMENT_COMMITMENT.";

fn build_user_prompt(transcript: &str, reference_date: NaiveDate) -> String {
    format!(
        "Current date: {date}\n\
         \n\
         Transcript:\n\
         {transcript}",
        date = reference_date.format("%Y-%m-%d"),
        transcript = transcript.trim(),
    )
}

/// Deterministic generation request for one transcript.
pub fn build_request(transcript: &str, reference_date: NaiveDate) -> GenerateRequest {
    GenerateRequest {
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        user_prompt: build_user_prompt(transcript, reference_date),
        max_tokens: MAX_TOKENS,
        temperature: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_embeds_reference_date_and_transcript() {
        let req = build_request("  Borrower: kal dunga \n", NaiveDate::from_ymd_opt(2026, 1, 29).unwrap());
        assert!(req.user_prompt.starts_with("Current date: 2026-01-29\n\nTranscript:\n"));
        assert!(req.user_prompt.ends_with("Borrower: kal dunga"));
        assert_eq!(req.temperature, 0.0);
        assert_eq!(req.max_tokens, MAX_TOKENS);
        assert!(req.system_prompt.unwrap().contains("\"ptp_date\""));
    }
}

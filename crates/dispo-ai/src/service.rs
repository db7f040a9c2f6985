//! Transcript in, normalized record out.

use chrono::NaiveDate;
use dispo_core::{ExtractionRecord, Normalizer, RawExtraction, SourceContext};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::generator::TextGenerator;
use crate::{InferenceError, confidence, extract, prompt};

/// Generates an extraction for a transcript, scores it, and normalizes it
/// against the transcript. Construct once and share by reference.
pub struct ExtractionService<G> {
    generator: G,
    normalizer: Normalizer,
}

impl<G: TextGenerator> ExtractionService<G> {
    pub fn new(generator: G, normalizer: Normalizer) -> Self {
        Self {
            generator,
            normalizer,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Without a reference date, today's local date is used.
    pub async fn predict(
        &self,
        transcript: &str,
        reference_date: Option<NaiveDate>,
    ) -> Result<ExtractionRecord, InferenceError> {
        if transcript.trim().is_empty() {
            return Err(InferenceError::EmptyTranscript);
        }
        let ctx = SourceContext::new(transcript, reference_date);
        let request = prompt::build_request(transcript, ctx.reference_date);

        let generation = self.generator.generate(&request).await?;
        let score = confidence::weighted(&generation.token_probs);
        debug!(
            tokens = generation.token_probs.len(),
            confidence = score,
            "generation complete"
        );

        let mut raw = match extract::first_json_object(&generation.text) {
            Ok(map) => RawExtraction(map),
            Err(e) => {
                warn!(error = %e, confidence = score, "unparsable generation");
                return Err(e);
            }
        };
        raw.insert("confidence_score", Value::from(score));

        Ok(self.normalizer.normalize(&raw, &ctx))
    }

    /// Predict several transcripts with at most `concurrency` generations in
    /// flight. Results are in input order.
    pub async fn predict_batch(
        &self,
        items: Vec<(String, Option<NaiveDate>)>,
        concurrency: usize,
    ) -> Vec<Result<ExtractionRecord, InferenceError>> {
        let total = items.len();
        info!(total, concurrency, "batch prediction started");

        let results: Vec<_> = stream::iter(items)
            .map(|(transcript, reference_date)| async move {
                self.predict(&transcript, reference_date).await
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(total, failed, "batch prediction complete");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerateRequest, Generation};
    use async_trait::async_trait;
    use dispo_core::PaymentDisposition;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replies with a fixed generation and records the prompts it saw.
    struct FakeGenerator {
        text: String,
        token_probs: Vec<f64>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl FakeGenerator {
        fn new(text: &str, token_probs: Vec<f64>) -> Self {
            Self {
                text: text.to_string(),
                token_probs,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, request: &GenerateRequest) -> Result<Generation, InferenceError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(Generation {
                text: self.text.clone(),
                token_probs: self.token_probs.clone(),
            })
        }
    }

    /// Echoes the transcript line back as remarks, slower for shorter input.
    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, request: &GenerateRequest) -> Result<Generation, InferenceError> {
            let transcript = request.user_prompt.rsplit('\n').next().unwrap_or_default();
            if transcript == "fail" {
                return Err(InferenceError::Backend("boom".into()));
            }
            let delay = 40u64.saturating_sub(transcript.len() as u64 * 4);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Generation {
                text: serde_json::json!({ "remarks": transcript }).to_string(),
                token_probs: vec![],
            })
        }
    }

    fn reference() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 1, 29)
    }

    #[tokio::test]
    async fn predict_normalizes_generation() {
        let generator = FakeGenerator::new(
            r#"Output: {"payment_disposition": "PTP", "ptp_amount": 4000, "ptp_date": "2026-05-01"}"#,
            vec![0.9, 0.9, 0.5, 0.5],
        );
        let service = ExtractionService::new(generator, Normalizer::default());

        let record = service
            .predict("Borrower: main 5 Feb ko 4000 de dunga", reference())
            .await
            .unwrap();
        assert_eq!(record.payment_disposition, Some(PaymentDisposition::Ptp));
        assert_eq!(record.ptp_amount, Some(4000.0));
        assert_eq!(record.ptp_date, NaiveDate::from_ymd_opt(2026, 2, 5));
        assert_eq!(record.followup_date, NaiveDate::from_ymd_opt(2026, 2, 5));
        assert_eq!(record.confidence_score, 0.78);

        let seen = service.generator().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].user_prompt.contains("Current date: 2026-01-29"));
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected_before_generation() {
        let service = ExtractionService::new(FakeGenerator::new("{}", vec![]), Normalizer::default());
        let err = service.predict("   ", reference()).await.unwrap_err();
        assert!(matches!(err, InferenceError::EmptyTranscript));
        assert!(service.generator().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparsable_generation_carries_raw_text() {
        let service = ExtractionService::new(
            FakeGenerator::new("I cannot help with that", vec![0.4]),
            Normalizer::default(),
        );
        let err = service.predict("hello", reference()).await.unwrap_err();
        assert_eq!(err.raw_output(), Some("I cannot help with that"));
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let service = ExtractionService::new(EchoGenerator, Normalizer::default());
        let items = ["a first", "second one here", "fail", "x3"]
            .iter()
            .map(|t| (t.to_string(), reference()))
            .collect();

        let results = service.predict_batch(items, 3).await;
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().remarks.as_deref(), Some("a first"));
        assert_eq!(
            results[1].as_ref().unwrap().remarks.as_deref(),
            Some("second one here")
        );
        assert!(matches!(results[2], Err(InferenceError::Backend(_))));
        // Too short to survive remark cleaning.
        assert_eq!(results[3].as_ref().unwrap().remarks, None);
    }
}

//! Pipeline driver: normalize → chunk → tag → combine → verify.
//!
//! Strictly sequential and order-preserving. Every chunk yields exactly one
//! `VerifiedRecord` regardless of AI availability — tagging-layer failures
//! degrade to the rule-based path, they never drop or reorder chunks.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;

use crate::config::PipelineConfig;

use super::chunker::Chunker;
use super::combine::{combine, text_prefix, AiOutcome};
use super::gemini::AiTagger;
use super::normalize::{normalize_items, split_merged_blob};
use super::rules::RuleTagger;
use super::types::{Chunk, VerifiedRecord};
use super::verify::Verifier;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

pub struct Pipeline {
    config: PipelineConfig,
    chunker: Chunker,
    rules: RuleTagger,
    ai: AiTagger,
    verifier: Verifier,
}

impl Pipeline {
    /// Build a pipeline with the default vocabulary and verification table.
    pub fn new(config: PipelineConfig, ai: AiTagger) -> Self {
        let chunker = Chunker::from_config(&config);
        Self {
            config,
            chunker,
            rules: RuleTagger::default(),
            ai,
            verifier: Verifier::default(),
        }
    }

    pub fn with_rule_tagger(mut self, rules: RuleTagger) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Process a merged extraction blob with file-boundary markers.
    pub fn run_merged_text(&self, text: &str) -> Vec<VerifiedRecord> {
        let sections = split_merged_blob(text);
        tracing::info!(sections = sections.len(), "split merged input into sections");
        let chunks = self.chunker.chunk_sections(&sections);
        self.process_chunks(chunks)
    }

    /// Process a JSON item list (strings or `{text, line_number}` objects).
    pub fn run_items(&self, raw: &Value) -> Vec<VerifiedRecord> {
        let units = normalize_items(raw);
        tracing::info!(units = units.len(), "normalized input items");
        let chunks = self.chunker.chunk_units(&units);
        self.process_chunks(chunks)
    }

    fn process_chunks(&self, chunks: Vec<Chunk>) -> Vec<VerifiedRecord> {
        let total = chunks.len();
        tracing::info!(chunks = total, live = self.ai.is_live(), "processing chunks");

        let mut ai_processed = 0usize;
        let mut fallback_processed = 0usize;
        let mut records = Vec::with_capacity(total);

        for chunk in chunks {
            tracing::info!(chunk_id = chunk.id, total, "processing chunk");

            let rule_tags = self.rules.tag(&chunk.text);

            let outcome = if self.ai.is_live() {
                match self.ai.tag_chunk(&chunk) {
                    Some(tags) => {
                        ai_processed += 1;
                        AiOutcome::Success(tags)
                    }
                    None => {
                        fallback_processed += 1;
                        AiOutcome::Failed
                    }
                }
            } else {
                fallback_processed += 1;
                AiOutcome::NotRequested
            };

            let result = combine(
                rule_tags,
                outcome,
                &chunk.text,
                self.config.sample_chars,
                self.config.offline_confidence,
            );

            let text_sample = text_prefix(&chunk.text, self.config.sample_chars);
            let verification = self.verifier.verify(&result.tags, &text_sample);

            records.push(VerifiedRecord {
                chunk_id: chunk.id,
                created_at: Utc::now(),
                summary: result.summary,
                text_sample,
                tags: result.tags,
                detected_years: extract_years(&chunk.text),
                confidence: result.confidence,
                source: result.source,
                verification,
            });
        }

        tracing::info!(
            ai_processed,
            fallback_processed,
            "pipeline run complete"
        );
        records
    }
}

/// All distinct 4-digit years in the text, ascending.
pub fn extract_years(text: &str) -> Vec<i32> {
    let mut years: Vec<i32> = YEAR
        .captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{TagSource, VerificationStatus};
    use serde_json::json;

    fn offline_pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default(), AiTagger::offline())
    }

    #[test]
    fn merged_blob_end_to_end_offline() {
        let blob = "===== BEGIN FILE: a.pdf =====\n\
            Our tax filing and budget report covers the full review period in detail.\n\
            ===== END FILE: a.pdf =====";
        let records = offline_pipeline().run_merged_text(blob);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.chunk_id, 1);
        assert!(record.tags.contains(&"finance".to_string()));
        assert_eq!(record.source, TagSource::Rule);
        assert_eq!(record.verification.status, VerificationStatus::Passed);
    }

    #[test]
    fn every_record_has_at_least_one_tag() {
        let blob = "===== BEGIN FILE: x.pdf =====\n\
            Plain words without any category keywords, padded to clear the floor filter.\n\
            ===== END FILE: x.pdf =====";
        let records = offline_pipeline().run_merged_text(blob);
        assert_eq!(records.len(), 1);
        assert!(!records[0].tags.is_empty());
        assert_eq!(records[0].tags, vec!["general"]);
    }

    #[test]
    fn confidence_stays_in_domain() {
        let blob = "===== BEGIN FILE: a.pdf =====\n\
            The annual budget revenue statement includes every quarterly breakdown.\n\
            ===== END FILE: a.pdf =====";
        for record in offline_pipeline().run_merged_text(blob) {
            assert!((0.0..=1.0).contains(&record.confidence));
        }
    }

    #[test]
    fn item_list_preserves_order() {
        let raw = json!([
            {"line_number": 3, "text": "Third entry in the corpus with sufficient length to retain."},
            {"line_number": 1, "text": "First entry in the corpus with sufficient length to retain."},
        ]);
        let config = PipelineConfig {
            chunk_target_chars: 60,
            chunk_floor_chars: 10,
            ..Default::default()
        };
        let records = Pipeline::new(config, AiTagger::offline()).run_items(&raw);
        assert_eq!(records.len(), 2);
        assert!(records[0].text_sample.starts_with("First"));
        assert!(records[1].text_sample.starts_with("Third"));
        assert!(records.windows(2).all(|w| w[0].chunk_id < w[1].chunk_id));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(offline_pipeline().run_merged_text("").is_empty());
        assert!(offline_pipeline().run_items(&json!([])).is_empty());
    }

    #[test]
    fn years_are_extracted_sorted_and_deduped() {
        let years = extract_years("Fiscal 2023 follows 2022, repeated in 2023, unlike 1999.");
        assert_eq!(years, vec![1999, 2022, 2023]);
        assert!(extract_years("no years, not even 123 or 30000").is_empty());
    }
}

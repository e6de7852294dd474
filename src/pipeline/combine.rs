//! Merge rule-based and AI tagging outcomes into a single `TagResult`.
//!
//! Combination cannot fail and never re-invokes the AI client: whatever the
//! AI outcome, the rule tags are already in hand and a result is produced.

use super::types::{AiTags, TagResult, TagSource};

/// What the AI tagging stage produced for a chunk.
#[derive(Debug, Clone)]
pub enum AiOutcome {
    Success(AiTags),
    /// Every model was tried and exhausted.
    Failed,
    /// Offline mode — no attempt was made.
    NotRequested,
}

/// Combine the per-chunk outcomes. Rule tags are always present; the AI
/// outcome decides tags union, confidence, summary, and source marker.
pub fn combine(
    rule_tags: Vec<String>,
    ai: AiOutcome,
    chunk_text: &str,
    sample_chars: usize,
    offline_confidence: f64,
) -> TagResult {
    match ai {
        AiOutcome::Success(ai_tags) => {
            let summary = ai_tags
                .summary
                .unwrap_or_else(|| text_prefix(chunk_text, sample_chars));
            TagResult {
                tags: union_tags(rule_tags, ai_tags.tags),
                confidence: ai_tags.confidence,
                summary,
                source: TagSource::Ai,
            }
        }
        AiOutcome::Failed => TagResult {
            tags: rule_tags,
            confidence: offline_confidence,
            summary: text_prefix(chunk_text, sample_chars),
            source: TagSource::AiFailedFallbackRule,
        },
        AiOutcome::NotRequested => TagResult {
            tags: rule_tags,
            confidence: offline_confidence,
            summary: text_prefix(chunk_text, sample_chars),
            source: TagSource::Rule,
        },
    }
}

/// Union with deterministic order: rule tags first (vocabulary order), then
/// AI-only tags in model order, case-insensitive dedupe on first occurrence.
fn union_tags(rule_tags: Vec<String>, ai_tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();

    for tag in rule_tags.into_iter().chain(ai_tags) {
        let key = tag.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(tag);
        }
    }
    out
}

/// Bounded, character-safe prefix with an ellipsis when truncated.
pub fn text_prefix(text: &str, max_chars: usize) -> String {
    let mut iter = text.char_indices();
    match iter.nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

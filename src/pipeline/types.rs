//! Value types flowing through the tagging pipeline.
//!
//! Everything here is produced by one stage and consumed by the next;
//! nothing is mutated after creation. `VerifiedRecord` is the terminal
//! entity handed to the reporting step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized unit of input text. The ordinal is unique within a corpus
/// and defines final output order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextUnit {
    pub ordinal: u32,
    pub text: String,
}

/// A marker-delimited section of the merged extraction blob.
#[derive(Debug, Clone)]
pub struct Section {
    /// Source file name from the `BEGIN FILE:` marker.
    pub name: Option<String>,
    pub text: String,
    /// Set when the marker carried the `(EXTRACTION FAILED)` annotation.
    /// The body of such a section is an extractor error message, not content.
    pub extraction_failed: bool,
}

/// A bounded unit of text submitted as one tagging/verification work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Assigned sequentially from 1 in emission order, after floor filtering.
    pub id: u32,
    pub text: String,
    /// File name of the source section, when chunked from a merged blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Validated output of the model-response parse boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct AiTags {
    pub tags: Vec<String>,
    pub summary: Option<String>,
    /// Clamped to [0, 1] at the parse boundary.
    pub confidence: f64,
}

/// Which tagging path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    Rule,
    Ai,
    AiFailedFallbackRule,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::Rule => "rule",
            TagSource::Ai => "ai",
            TagSource::AiFailedFallbackRule => "ai_failed_fallback_rule",
        }
    }
}

/// Combined tagging outcome for a single chunk.
#[derive(Debug, Clone)]
pub struct TagResult {
    pub tags: Vec<String>,
    pub confidence: f64,
    pub summary: String,
    pub source: TagSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Failed,
}

/// Keyword-evidence check result for one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    pub notes: Vec<String>,
}

/// Terminal, externally consumed record: one per chunk, ordered by `chunk_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedRecord {
    pub chunk_id: u32,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    pub text_sample: String,
    pub tags: Vec<String>,
    pub detected_years: Vec<i32>,
    pub confidence: f64,
    pub source: TagSource,
    pub verification: Verification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_source_serializes_snake_case() {
        let json = serde_json::to_string(&TagSource::AiFailedFallbackRule).unwrap();
        assert_eq!(json, "\"ai_failed_fallback_rule\"");
        assert_eq!(TagSource::Ai.as_str(), "ai");
    }

    #[test]
    fn verification_status_round_trips() {
        let v = Verification {
            status: VerificationStatus::Failed,
            notes: vec!["note".into()],
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["status"], "failed");
        let back: Verification = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, VerificationStatus::Failed);
    }
}

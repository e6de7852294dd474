//! Aggregate summary of a pipeline run, for the log and an optional JSON file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::types::{VerificationStatus, VerifiedRecord};

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub chunks_processed: usize,
    pub tag_counts: BTreeMap<String, usize>,
    pub source_counts: BTreeMap<String, usize>,
    pub years_detected: Vec<i32>,
    pub verification_passed: usize,
    pub verification_failed: usize,
}

impl RunReport {
    pub fn from_records(records: &[VerifiedRecord]) -> Self {
        let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut source_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut years: Vec<i32> = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        for record in records {
            for tag in &record.tags {
                *tag_counts.entry(tag.clone()).or_default() += 1;
            }
            *source_counts
                .entry(record.source.as_str().to_string())
                .or_default() += 1;
            years.extend(&record.detected_years);
            match record.verification.status {
                VerificationStatus::Passed => passed += 1,
                VerificationStatus::Failed => failed += 1,
            }
        }

        years.sort_unstable();
        years.dedup();

        Self {
            generated_at: Utc::now(),
            chunks_processed: records.len(),
            tag_counts,
            source_counts,
            years_detected: years,
            verification_passed: passed,
            verification_failed: failed,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            chunks = self.chunks_processed,
            passed = self.verification_passed,
            failed = self.verification_failed,
            distinct_tags = self.tag_counts.len(),
            "run summary"
        );
        for (tag, count) in &self.tag_counts {
            tracing::info!(tag = %tag, count = *count, "tag usage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{TagSource, Verification};

    fn record(id: u32, tags: &[&str], source: TagSource, passed: bool) -> VerifiedRecord {
        VerifiedRecord {
            chunk_id: id,
            created_at: Utc::now(),
            summary: "s".into(),
            text_sample: "t".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            detected_years: vec![2023],
            confidence: 0.5,
            source,
            verification: Verification {
                status: if passed {
                    VerificationStatus::Passed
                } else {
                    VerificationStatus::Failed
                },
                notes: vec![],
            },
        }
    }

    #[test]
    fn aggregates_tags_sources_and_verification() {
        let records = vec![
            record(1, &["finance", "legal"], TagSource::Rule, true),
            record(2, &["finance"], TagSource::Ai, false),
        ];
        let report = RunReport::from_records(&records);

        assert_eq!(report.chunks_processed, 2);
        assert_eq!(report.tag_counts["finance"], 2);
        assert_eq!(report.tag_counts["legal"], 1);
        assert_eq!(report.source_counts["rule"], 1);
        assert_eq!(report.source_counts["ai"], 1);
        assert_eq!(report.years_detected, vec![2023]);
        assert_eq!(report.verification_passed, 1);
        assert_eq!(report.verification_failed, 1);
    }

    #[test]
    fn empty_run_produces_empty_report() {
        let report = RunReport::from_records(&[]);
        assert_eq!(report.chunks_processed, 0);
        assert!(report.tag_counts.is_empty());
        assert!(report.years_detected.is_empty());
    }
}

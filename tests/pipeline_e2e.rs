//! End-to-end runs over realistic inputs, offline and with a scripted model.

use std::io::Write;
use std::time::Duration;

use serde_json::json;

use compliance_copilot::config::PipelineConfig;
use compliance_copilot::pipeline::gemini::{
    AiTagger, GeminiError, MockGenerator, RecordingSleeper,
};
use compliance_copilot::pipeline::runner::Pipeline;
use compliance_copilot::pipeline::types::{TagSource, VerificationStatus, VerifiedRecord};

const MERGED_BLOB: &str = "\
===== BEGIN FILE: budget_2023.pdf =====\n\
The annual tax filing and budget report lists every payment and invoice \
recorded during fiscal year 2023, with revenue broken down by quarter.\n\
===== END FILE: budget_2023.pdf =====\n\
===== BEGIN FILE: scan_0042.pdf (EXTRACTION FAILED) =====\n\
pdfium: could not open document\n\
===== END FILE: scan_0042.pdf (EXTRACTION FAILED) =====\n\
===== BEGIN FILE: handbook.pdf =====\n\
Employee leave policy: salary continues during approved leave, and \
recruitment decisions follow the signed agreement with the works council.\n\
===== END FILE: handbook.pdf =====\n";

fn live_pipeline(generator: MockGenerator, sleeper: RecordingSleeper) -> Pipeline {
    let config = PipelineConfig::default();
    let tagger =
        AiTagger::live(Box::new(generator), &config).with_sleeper(Box::new(sleeper));
    Pipeline::new(config, tagger)
}

fn offline_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::default(), AiTagger::offline())
}

#[test]
fn offline_run_tags_and_verifies_merged_blob() {
    let records = offline_pipeline().run_merged_text(MERGED_BLOB);

    // The failed extraction is dropped; one chunk per surviving file.
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].chunk_id, 1);
    assert_eq!(records[1].chunk_id, 2);

    let finance = &records[0];
    assert!(finance.tags.contains(&"finance".to_string()));
    assert_eq!(finance.source, TagSource::Rule);
    assert_eq!(finance.verification.status, VerificationStatus::Passed);
    assert_eq!(finance.detected_years, vec![2023]);
    assert!((finance.confidence - 0.5).abs() < f64::EPSILON);

    let handbook = &records[1];
    assert!(handbook.tags.contains(&"legal".to_string()));
    assert!(handbook.detected_years.is_empty());
}

#[test]
fn live_run_merges_ai_tags_and_marks_source() {
    let generator = MockGenerator::new(vec![
        Ok(r#"{"tags": ["government"], "summary": "Fiscal year summary.", "confidence": 0.9}"#
            .to_string()),
        Ok(r#"{"tags": ["hr"], "summary": "Leave policy summary.", "confidence": 0.8}"#
            .to_string()),
    ]);
    let records =
        live_pipeline(generator, RecordingSleeper::new()).run_merged_text(MERGED_BLOB);

    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.source, TagSource::Ai);
    assert_eq!(first.summary, "Fiscal year summary.");
    assert!((first.confidence - 0.9).abs() < f64::EPSILON);
    // Rule tags come first, AI-only tags after.
    assert_eq!(first.tags.first().map(String::as_str), Some("finance"));
    assert!(first.tags.contains(&"government".to_string()));

    let second = &records[1];
    assert!(second.tags.contains(&"hr".to_string()));
    // "hr" has a verification rule and the sample mentions salary and leave.
    assert_eq!(second.verification.status, VerificationStatus::Passed);
}

#[test]
fn exhausted_models_fall_back_without_losing_chunks() {
    // Empty script: every call fails with a transport error.
    let generator = MockGenerator::new(Vec::new());
    let sleeper = RecordingSleeper::new();
    let live = live_pipeline(generator, sleeper).run_merged_text(MERGED_BLOB);
    let offline = offline_pipeline().run_merged_text(MERGED_BLOB);

    assert_eq!(live.len(), offline.len());
    for record in &live {
        assert_eq!(record.source, TagSource::AiFailedFallbackRule);
        assert!(!record.tags.is_empty());
    }
    // Tag content matches the pure rule-based run.
    for (l, o) in live.iter().zip(&offline) {
        assert_eq!(l.tags, o.tags);
    }
}

#[test]
fn quota_errors_advance_models_and_transient_errors_back_off() {
    let generator = MockGenerator::new(vec![
        Err(GeminiError::Api {
            status: 429,
            body: "quota exceeded".into(),
        }),
        Err(GeminiError::Transport("connection reset".into())),
        Ok(r#"{"tags": ["finance"], "confidence": 0.7}"#.to_string()),
        Ok(r#"{"tags": ["hr"], "confidence": 0.7}"#.to_string()),
    ]);
    let sleeper = RecordingSleeper::new();
    let records =
        live_pipeline(generator.clone(), sleeper.clone()).run_merged_text(MERGED_BLOB);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source, TagSource::Ai);

    // First chunk: quota skips to the second model, one transient retry there.
    assert_eq!(
        generator.calls(),
        vec![
            "gemini-2.5-pro-exp",
            "gemini-2.0-pro-exp",
            "gemini-2.0-pro-exp",
            "gemini-2.5-pro-exp",
        ]
    );
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(15)]);
}

#[test]
fn json_item_list_runs_end_to_end() {
    let raw = json!([
        {"line_number": 2, "text": "The software platform migration finished ahead of schedule this cycle."},
        {"line_number": 1, "text": "Hospital patient intake procedures were updated by the medical board."},
        "plain string entries are accepted as well and keep their position",
    ]);
    let config = PipelineConfig {
        chunk_target_chars: 80,
        chunk_floor_chars: 20,
        ..Default::default()
    };
    let records = Pipeline::new(config, AiTagger::offline()).run_items(&raw);

    assert_eq!(records.len(), 3);
    assert!(records.windows(2).all(|w| w[0].chunk_id < w[1].chunk_id));
    assert!(records[0].text_sample.starts_with("Hospital"));
    assert!(records[0].tags.contains(&"healthcare".to_string()));
    assert!(records[1].tags.contains(&"technology".to_string()));
}

#[test]
fn records_survive_a_file_round_trip() {
    let records = offline_pipeline().run_merged_text(MERGED_BLOB);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string_pretty(&records).unwrap().as_bytes())
        .unwrap();

    let raw = std::fs::read_to_string(file.path()).unwrap();
    let restored: Vec<VerifiedRecord> = serde_json::from_str(&raw).unwrap();

    assert_eq!(restored.len(), records.len());
    for (a, b) in restored.iter().zip(&records) {
        assert_eq!(a.chunk_id, b.chunk_id);
        assert_eq!(a.tags, b.tags);
        assert_eq!(a.source, b.source);
        assert_eq!(a.detected_years, b.detected_years);
    }
}

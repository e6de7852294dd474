//! Input normalization: lenient item lists and marker-delimited blobs.
//!
//! Both entry points are total — malformed elements are skipped with a
//! warning, and an input with nothing usable yields an empty sequence, never
//! an error. Downstream stages then simply produce an empty record set.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::types::{Section, TextUnit};

/// File boundary markers written by the PDF extraction step.
static FILE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"===== (BEGIN|END) FILE: (.+?) =====").unwrap());

const EXTRACTION_FAILED_NOTE: &str = "(EXTRACTION FAILED)";

/// Normalize a JSON item list into ordered `TextUnit`s.
///
/// Accepts an array whose elements are bare strings or objects carrying
/// `text` and an optional positive `line_number`, or an object wrapping such
/// an array under a `lines` key. Elements without usable text are dropped.
/// Output is sorted by ordinal ascending (stable for ties).
pub fn normalize_items(raw: &Value) -> Vec<TextUnit> {
    let items = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("lines").and_then(Value::as_array) {
            Some(items) => {
                tracing::warn!("input is not a list, using its 'lines' key");
                items.as_slice()
            }
            None => {
                tracing::error!("unsupported input format, expected list or {{\"lines\": [...]}}");
                return Vec::new();
            }
        },
        _ => {
            tracing::error!("unsupported input format, expected list or {{\"lines\": [...]}}");
            return Vec::new();
        }
    };

    let mut units = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let fallback_ordinal = (idx + 1) as u32;
        match item {
            Value::String(text) => units.push(TextUnit {
                ordinal: fallback_ordinal,
                text: text.clone(),
            }),
            Value::Object(map) => {
                let Some(text) = map.get("text").and_then(Value::as_str) else {
                    tracing::warn!(index = idx, "skipping item: missing or invalid 'text'");
                    continue;
                };
                let ordinal = map
                    .get("line_number")
                    .and_then(Value::as_u64)
                    .filter(|&n| n > 0 && n <= u64::from(u32::MAX))
                    .map(|n| n as u32)
                    .unwrap_or(fallback_ordinal);
                units.push(TextUnit {
                    ordinal,
                    text: text.to_string(),
                });
            }
            other => {
                tracing::warn!(index = idx, "skipping item: unsupported type {}", value_kind(other));
            }
        }
    }

    units.sort_by_key(|u| u.ordinal);
    units
}

/// Split a merged extraction blob into its marker-delimited sections.
///
/// Content outside `BEGIN FILE` / `END FILE` pairs (headers, commentary) is
/// discarded. A `(EXTRACTION FAILED)` annotation on the marker flags the
/// section so the chunker can drop it.
pub fn split_merged_blob(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut open: Option<(String, bool, usize)> = None;

    for captures in FILE_MARKER.captures_iter(text) {
        let marker = captures.get(0).expect("capture 0 is the whole match");
        let is_begin = &captures[1] == "BEGIN";
        let raw_name = captures[2].trim();

        if is_begin {
            if open.is_some() {
                tracing::warn!(file = raw_name, "BEGIN marker inside an open section, skipping");
                continue;
            }
            let failed = raw_name.ends_with(EXTRACTION_FAILED_NOTE);
            let name = raw_name
                .trim_end_matches(EXTRACTION_FAILED_NOTE)
                .trim()
                .to_string();
            open = Some((name, failed, marker.end()));
        } else {
            let Some((name, failed, body_start)) = open.take() else {
                tracing::warn!(file = raw_name, "END marker without matching BEGIN, skipping");
                continue;
            };
            let body = text[body_start..marker.start()].trim();
            if !body.is_empty() {
                sections.push(Section {
                    name: Some(name),
                    text: body.to_string(),
                    extraction_failed: failed,
                });
            }
        }
    }

    if let Some((name, _, _)) = open {
        tracing::warn!(file = %name, "unterminated BEGIN marker, section discarded");
    }

    sections
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

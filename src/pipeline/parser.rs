//! Parse-and-validate boundary for model tagging responses.
//!
//! The model returns untyped text. Everything defensive — locating JSON
//! inside surrounding prose, coercing a non-list `tags` value, defaulting and
//! clamping confidence — happens exactly once, here. Callers get either a
//! well-formed `AiTags` or an error that the retry policy treats as an
//! attempt failure.

use serde_json::Value;

use super::gemini::GeminiError;
use super::types::AiTags;

/// Confidence assumed when the model omits the field.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Parse a model response into validated tag data.
///
/// Accepts a bare JSON object, a single-object array, or JSON embedded in
/// prose (located by the first `{`/`[` and the matching last `}`/`]`).
/// A missing `tags` key is an error; a present but non-array `tags` value is
/// coerced to an empty list.
pub fn parse_tag_response(response: &str) -> Result<AiTags, GeminiError> {
    let json = locate_json(response)
        .ok_or_else(|| GeminiError::MalformedResponse("no JSON found in response".into()))?;

    let value: Value =
        serde_json::from_str(json).map_err(|e| GeminiError::MalformedResponse(e.to_string()))?;

    let object = match &value {
        Value::Object(_) => &value,
        Value::Array(items) => items
            .iter()
            .find(|v| v.is_object())
            .ok_or_else(|| GeminiError::MalformedResponse("JSON array holds no object".into()))?,
        _ => {
            return Err(GeminiError::MalformedResponse(
                "top-level JSON is neither object nor array".into(),
            ))
        }
    };

    let tags = match object.get("tags") {
        None => {
            return Err(GeminiError::MalformedResponse(
                "response is missing the 'tags' key".into(),
            ))
        }
        Some(Value::Array(items)) => coerce_tag_list(items),
        // Non-list tags value: repaired to empty rather than propagated.
        Some(_) => Vec::new(),
    };

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(AiTags {
        tags,
        summary,
        confidence,
    })
}

/// Find the JSON payload: the span from the first opening bracket to the
/// matching last closing bracket. Code fences around it are irrelevant
/// because the span search skips them.
fn locate_json(response: &str) -> Option<&str> {
    let object_start = response.find('{');
    let array_start = response.find('[');

    let (start, close) = match (object_start, array_start) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return None,
    };

    let end = response.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

/// Coerce a JSON array into tag strings: strings pass through, scalar
/// values are stringified, nested structures and nulls are dropped.
fn coerce_tag_list(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

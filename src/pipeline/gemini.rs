//! Resilient Gemini tagging client.
//!
//! Transport, error classification, and the per-chunk retry state machine
//! live here; response validation lives in `parser`. The policy: try each
//! model in priority order, retrying transient failures with escalating
//! backoff, abandoning a model immediately on a not-found/quota class error.
//! Exhausting every model is a normal outcome (`None`), never a fault — the
//! combiner falls back to rule tags.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PipelineConfig;

use super::parser::parse_tag_response;
use super::types::{AiTags, Chunk};

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("empty response from model")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl GeminiError {
    /// True for errors that disqualify the current model for the remainder
    /// of this chunk's attempts: not found, quota exhausted, model
    /// unavailable. Everything else (connect, timeout, 5xx, malformed
    /// output) is worth retrying.
    pub fn is_model_fatal(&self) -> bool {
        match self {
            GeminiError::Api { status: 404, .. } => true,
            GeminiError::Api { body, .. } => {
                let lower = body.to_lowercase();
                lower.contains("quota")
                    || lower.contains("not found")
                    || lower.contains("unavailable")
            }
            _ => false,
        }
    }
}

/// Seam between the retry policy and the wire. Mocked in tests.
pub trait TextGenerator {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GeminiError>;
}

/// Injected clock so the retry policy is testable without real sleeps.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper: blocks the worker thread for the backoff duration.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Blocking HTTP client for the Gemini generateContent endpoint.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout_secs)
    }

    /// Override the endpoint, for tests against a local mock server.
    pub fn with_base_url(base_url: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl TextGenerator for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, model
        );
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GeminiError::Timeout(self.timeout_secs)
                } else {
                    GeminiError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| GeminiError::MalformedResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Instruction sent ahead of the chunk text.
const TAGGING_INSTRUCTION: &str = "Analyze the following compliance document text. \
Respond with JSON only: {\"tags\": [\"category\", ...], \"summary\": \"2-3 sentence summary\", \
\"confidence\": 0.0-1.0}. Categories: finance, technology, healthcare, environment, \
infrastructure, legal, education, government. Assign at least one tag.";

/// Per-chunk AI tagging with bounded retries and model fallback.
///
/// Constructed once per run; the credential and model list are read-only and
/// shared across all chunk calls. An offline tagger (no credential) answers
/// immediately without any network attempt.
pub struct AiTagger {
    generator: Option<Box<dyn TextGenerator>>,
    models: Vec<String>,
    backoff: Vec<Duration>,
    prompt_chars: usize,
    sleeper: Box<dyn Sleeper>,
}

impl AiTagger {
    pub fn live(generator: Box<dyn TextGenerator>, config: &PipelineConfig) -> Self {
        Self {
            generator: Some(generator),
            models: config.model_priority.clone(),
            backoff: config
                .backoff_secs
                .iter()
                .map(|&s| Duration::from_secs(s))
                .collect(),
            prompt_chars: config.prompt_chars,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Permanently unavailable for this run — a configuration state, not a
    /// per-call failure.
    pub fn offline() -> Self {
        Self {
            generator: None,
            models: Vec::new(),
            backoff: Vec::new(),
            prompt_chars: 0,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_live(&self) -> bool {
        self.generator.is_some()
    }

    /// Obtain tags for one chunk, or `None` once every model is exhausted.
    /// Never panics and never surfaces an error to the pipeline.
    pub fn tag_chunk(&self, chunk: &Chunk) -> Option<AiTags> {
        let generator = self.generator.as_ref()?;
        let prompt = format!(
            "{}\n\nText:\n{}",
            TAGGING_INSTRUCTION,
            truncate_chars(&chunk.text, self.prompt_chars)
        );

        let attempts_per_model = self.backoff.len() + 1;
        let mut last_error: Option<GeminiError> = None;

        for model in &self.models {
            for attempt in 0..attempts_per_model {
                if attempt > 0 {
                    let delay = self.backoff[attempt - 1];
                    tracing::warn!(
                        model = model.as_str(),
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        "retrying model after backoff"
                    );
                    self.sleeper.sleep(delay);
                }

                match generator.generate(model, &prompt) {
                    Ok(text) => match parse_tag_response(&text) {
                        Ok(tags) => {
                            tracing::debug!(
                                chunk_id = chunk.id,
                                model = model.as_str(),
                                tag_count = tags.tags.len(),
                                "model tagging succeeded"
                            );
                            return Some(tags);
                        }
                        Err(e) => {
                            tracing::warn!(
                                model = model.as_str(),
                                error = %e,
                                "model returned unparsable output"
                            );
                            last_error = Some(e);
                        }
                    },
                    Err(e) if e.is_model_fatal() => {
                        tracing::warn!(
                            model = model.as_str(),
                            error = %e,
                            "model unavailable, advancing to next"
                        );
                        last_error = Some(e);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            model = model.as_str(),
                            attempt = attempt + 1,
                            error = %e,
                            "model call failed"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }

        tracing::warn!(
            chunk_id = chunk.id,
            last_error = ?last_error,
            "all models exhausted, falling back to rule tags"
        );
        None
    }
}

/// Character-boundary-safe prefix.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ──────────────────────────────────────────────
// Test doubles (shared with integration tests)
// ──────────────────────────────────────────────

/// Scripted generator: pops one outcome per call and records which model
/// each call targeted. Clones share state.
#[derive(Clone, Default)]
pub struct MockGenerator {
    inner: Arc<MockGeneratorInner>,
}

#[derive(Default)]
struct MockGeneratorInner {
    responses: Mutex<Vec<Result<String, GeminiError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(mut responses: Vec<Result<String, GeminiError>>) -> Self {
        // Stored reversed so each call can pop from the back.
        responses.reverse();
        Self {
            inner: Arc::new(MockGeneratorInner {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Models targeted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().expect("mock lock poisoned").clone()
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, model: &str, _prompt: &str) -> Result<String, GeminiError> {
        self.inner
            .calls
            .lock()
            .expect("mock lock poisoned")
            .push(model.to_string());
        self.inner
            .responses
            .lock()
            .expect("mock lock poisoned")
            .pop()
            .unwrap_or_else(|| Err(GeminiError::Transport("mock script exhausted".into())))
    }
}

/// Sleeper that records requested delays instead of blocking.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("sleeper lock poisoned").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .expect("sleeper lock poisoned")
            .push(duration);
    }
}

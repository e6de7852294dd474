//! Pipeline tunables and the defaults the CLI ships with.
//!
//! All values are overridable by the caller; none are required. The keyword
//! vocabularies live with the stages that consume them (`pipeline::rules`,
//! `pipeline::verify`), not here — this is the numeric surface only.

/// Gemini model identifiers in priority order, most capable first.
pub const DEFAULT_MODEL_PRIORITY: &[&str] = &[
    "gemini-2.5-pro-exp",
    "gemini-2.0-pro-exp",
    "gemini-1.5-flash",
];

/// Escalating waits between retries of the same model, in seconds.
/// Length of this list bounds the retry count: N waits = N + 1 attempts.
pub const DEFAULT_BACKOFF_SECS: &[u64] = &[15, 30, 60];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target chunk size in characters.
    pub chunk_target_chars: usize,
    /// Chunks below this trimmed length are discarded (unless the whole
    /// corpus would otherwise be empty).
    pub chunk_floor_chars: usize,
    /// Length of the text sample stored on each record.
    pub sample_chars: usize,
    /// Prefix of chunk text sent to the model, to respect payload limits.
    pub prompt_chars: usize,
    /// Confidence assigned when tagging falls back to keyword rules.
    pub offline_confidence: f64,
    /// HTTP timeout for a single model call, in seconds.
    pub request_timeout_secs: u64,
    pub model_priority: Vec<String>,
    pub backoff_secs: Vec<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_target_chars: 1200,
            chunk_floor_chars: 50,
            sample_chars: 500,
            prompt_chars: 2000,
            offline_confidence: 0.5,
            request_timeout_secs: 120,
            model_priority: DEFAULT_MODEL_PRIORITY
                .iter()
                .map(|m| m.to_string())
                .collect(),
            backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
        }
    }
}

//! Bounded-size chunking with a three-tier splitting fallback.
//!
//! A section at or under the target size becomes one chunk. Oversized
//! sections are split on blank-line paragraph boundaries with an
//! accumulate-and-flush buffer; any piece still over the target (a single
//! oversized paragraph) is split again on sentence boundaries. Paragraph
//! context is preferred, but the target gives a hard upper bound for
//! downstream API payloads — the only irreducible remainder is a single
//! sentence longer than the target.

use crate::config::PipelineConfig;

use super::types::{Chunk, Section, TextUnit};

pub struct Chunker {
    target_chars: usize,
    floor_chars: usize,
}

impl Chunker {
    pub fn new(target_chars: usize, floor_chars: usize) -> Self {
        Self {
            target_chars,
            floor_chars,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.chunk_target_chars, config.chunk_floor_chars)
    }

    /// Chunk marker-delimited sections. Never merges two sections into the
    /// same chunk; sections flagged as failed extractions are dropped.
    pub fn chunk_sections(&self, sections: &[Section]) -> Vec<Chunk> {
        let mut candidates: Vec<(String, Option<String>)> = Vec::new();

        for section in sections {
            if section.extraction_failed {
                tracing::warn!(
                    file = section.name.as_deref().unwrap_or("<unnamed>"),
                    "dropping section with failed extraction"
                );
                continue;
            }
            let text = section.text.trim();
            if text.is_empty() {
                continue;
            }
            if text.len() <= self.target_chars {
                candidates.push((text.to_string(), section.name.clone()));
            } else {
                for piece in split_section(text, self.target_chars) {
                    candidates.push((piece, section.name.clone()));
                }
            }
        }

        self.finalize(candidates)
    }

    /// Chunk an ordered unit list: small consecutive units are grouped up to
    /// the target size, oversized units go through the same splitting tiers.
    pub fn chunk_units(&self, units: &[TextUnit]) -> Vec<Chunk> {
        let mut candidates: Vec<(String, Option<String>)> = Vec::new();
        let mut buffer = String::new();

        for unit in units {
            let text = unit.text.trim();
            if text.is_empty() {
                continue;
            }
            if text.len() > self.target_chars {
                if !buffer.is_empty() {
                    candidates.push((std::mem::take(&mut buffer), None));
                }
                for piece in split_section(text, self.target_chars) {
                    candidates.push((piece, None));
                }
            } else if !buffer.is_empty() && buffer.len() + 1 + text.len() > self.target_chars {
                candidates.push((std::mem::take(&mut buffer), None));
                buffer.push_str(text);
            } else {
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(text);
            }
        }
        if !buffer.is_empty() {
            candidates.push((buffer, None));
        }

        self.finalize(candidates)
    }

    /// Apply the floor filter and assign sequential ids.
    ///
    /// When filtering would leave nothing from a non-empty corpus, the
    /// smallest non-empty candidate is retained instead.
    fn finalize(&self, candidates: Vec<(String, Option<String>)>) -> Vec<Chunk> {
        let total = candidates.len();
        let mut retained: Vec<(String, Option<String>)> = candidates
            .iter()
            .filter(|(text, _)| text.trim().len() >= self.floor_chars)
            .cloned()
            .collect();

        if retained.is_empty() {
            if let Some(best) = candidates
                .into_iter()
                .filter(|(text, _)| !text.trim().is_empty())
                .min_by_key(|(text, _)| text.trim().len())
            {
                retained.push(best);
            }
        } else if retained.len() < total {
            tracing::debug!(
                dropped = total - retained.len(),
                floor = self.floor_chars,
                "discarded chunks below floor size"
            );
        }

        retained
            .into_iter()
            .enumerate()
            .map(|(idx, (text, source))| Chunk {
                id: (idx + 1) as u32,
                text: text.trim().to_string(),
                source,
            })
            .collect()
    }
}

/// Tier 2 + 3: paragraph accumulation, then sentence splitting for any
/// paragraph that alone exceeds the target.
fn split_section(text: &str, target: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut pieces = Vec::new();
    for piece in accumulate(&paragraphs, target, "\n\n") {
        if piece.len() <= target {
            pieces.push(piece);
        } else {
            let sentences = split_sentences(&piece);
            pieces.extend(accumulate(&sentences, target, " "));
        }
    }
    pieces
}

/// Accumulate pieces into a running buffer, flushing whenever appending the
/// next piece would exceed the target. The piece that triggered the flush
/// starts the next buffer.
fn accumulate(pieces: &[&str], target: usize, separator: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buffer = String::new();

    for piece in pieces {
        if !buffer.is_empty() && buffer.len() + separator.len() + piece.len() > target {
            out.push(std::mem::take(&mut buffer));
        }
        if !buffer.is_empty() {
            buffer.push_str(separator);
        }
        buffer.push_str(piece);
    }
    if !buffer.is_empty() {
        out.push(buffer);
    }
    out
}

/// Split on terminal punctuation followed by whitespace. Byte scanning is
/// safe here: the split points are ASCII and never land inside a multi-byte
/// character.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;

    for i in 0..bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let end = i + 1;
            if end == bytes.len() || bytes[end].is_ascii_whitespace() {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

//! Chunking, tagging, and verification pipeline for compliance document text.
//!
//! Input is either a merged PDF-extraction blob with file-boundary markers or
//! a JSON list of extracted items. The pipeline normalizes it, splits it into
//! bounded chunks, tags each chunk (keyword rules always, Gemini when a
//! credential is present), cross-checks the tags against the text, and emits
//! one `VerifiedRecord` per chunk.

pub mod config;
pub mod pipeline;
pub mod report;

//! Core data types and error definitions for the text-processing pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while turning sanitized text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The caller configured an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// One sentence-respecting slice of a document, ready for dispatch to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position in the chunk sequence.
    pub index: usize,
    /// Chunk text, including any overlap copied from the previous chunk.
    pub content: String,
    /// Number of leading characters copied from the previous chunk (0 for the first chunk).
    #[serde(default)]
    pub overlap_chars: usize,
}

impl Chunk {
    /// Length of the chunk content in characters.
    pub fn char_len(&self) -> usize {
        super::chunking::char_len(&self.content)
    }

    /// Leading text duplicated from the previous chunk.
    pub fn overlap_text(&self) -> &str {
        let end = byte_offset(&self.content, self.overlap_chars);
        &self.content[..end]
    }

    /// Content introduced by this chunk, without the overlap and its separating space.
    pub fn fresh_content(&self) -> &str {
        let start = byte_offset(&self.content, self.overlap_chars);
        let rest = &self.content[start..];
        if self.overlap_chars > 0 {
            rest.strip_prefix(' ').unwrap_or(rest)
        } else {
            rest
        }
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

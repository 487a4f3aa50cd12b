//! Sentence-aware chunking with trailing overlap.
//!
//! This module decides where a sanitized document is cut before each piece is sent to the
//! language model. Highlights:
//!
//! - Sentence boundaries only: text is split after `.`, `?` or `!` when followed by whitespace,
//!   and chunks are assembled from whole sentences.
//! - Character budget: a chunk stays within `max_chars` characters (Unicode scalar values, not
//!   bytes). A single sentence longer than the budget is emitted whole as its own chunk; callers
//!   must tolerate that oversized chunk.
//! - Overlap: every chunk after the first starts with up to `overlap_chars` characters copied
//!   from the tail of the previous chunk, followed by a space. The copied tail shrinks when the
//!   full overlap would push the new chunk past the budget, down to no overlap at all when the
//!   incoming sentence nearly fills `max_chars` on its own. Callers must not assume a chunk
//!   carries any overlap; [`Chunk::overlap_chars`] reports how much it actually got.

use regex::Regex;
use std::sync::OnceLock;

use super::types::{Chunk, ChunkingError};

static SENTENCE_BOUNDARY: OnceLock<Regex> = OnceLock::new();

fn sentence_boundary() -> &'static Regex {
    SENTENCE_BOUNDARY
        .get_or_init(|| Regex::new(r"[.?!]\s+").expect("sentence boundary pattern is valid"))
}

/// Split text into sentences.
///
/// A sentence ends at a terminator (`.`, `?`, `!`) that is immediately followed by whitespace;
/// the terminator stays attached and the whitespace run is dropped. Whitespace-only pieces are
/// skipped, so an empty or blank input yields no sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in sentence_boundary().find_iter(text) {
        // Terminators are ASCII, so `start + 1` is a char boundary.
        sentences.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Chunk text into sentence-respecting pieces of at most `max_chars` characters.
///
/// Total over any input: an empty or whitespace-only `text` yields an empty vector. See
/// [`chunk_document`] for the validated variant that also reports overlap offsets.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    build_chunks(text, max_chars, overlap_chars)
        .into_iter()
        .map(|chunk| chunk.content)
        .collect()
}

/// Validate the budget and chunk a document into indexed [`Chunk`] values.
///
/// Rejects `max_chars == 0`. An overlap greater than or equal to the budget is accepted but
/// logged, since overlap would then dominate every chunk.
pub fn chunk_document(
    text: &str,
    max_chars: usize,
    overlap_chars: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    if max_chars == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap_chars >= max_chars {
        tracing::warn!(
            max_chars,
            overlap_chars,
            "Chunk overlap is not smaller than the chunk budget"
        );
    }

    let chunks = build_chunks(text, max_chars, overlap_chars);
    tracing::debug!(
        chunk_count = chunks.len(),
        max_chars,
        overlap_chars,
        "Chunked document"
    );
    Ok(chunks)
}

fn build_chunks(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut current_overlap = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = char_len(sentence);
        let projected = if current.is_empty() {
            sentence_len
        } else {
            current_len + 1 + sentence_len
        };

        if projected <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
            current_len = projected;
            continue;
        }

        if !current.is_empty() {
            chunks.push(Chunk {
                index: chunks.len(),
                content: std::mem::take(&mut current),
                overlap_chars: current_overlap,
            });
        }

        let budget = overlap_chars.min(max_chars.saturating_sub(sentence_len + 1));
        let tail = chunks
            .last()
            .map(|previous| tail_chars(&previous.content, budget).trim_start())
            .unwrap_or("");

        if tail.is_empty() {
            current = sentence.to_string();
            current_overlap = 0;
        } else {
            current = format!("{tail} {sentence}");
            current_overlap = char_len(tail);
        }
        current_len = char_len(&current);
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            content: current,
            overlap_chars: current_overlap,
        });
    }

    chunks
}

/// Return the last `count` characters of `text` (the whole text when it is shorter).
fn tail_chars(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    let total = char_len(text);
    if total <= count {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - count)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    &text[start..]
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

//! Deterministic text-processing core: sanitization, sentence-aware chunking, fingerprints.

pub mod chunking;
pub mod fingerprint;
pub mod sanitize;
pub mod types;

pub use chunking::{chunk_document, chunk_text, split_sentences};
pub use fingerprint::fingerprint;
pub use sanitize::sanitize;
pub use types::{Chunk, ChunkingError};

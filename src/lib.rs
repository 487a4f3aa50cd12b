#![deny(missing_docs)]

//! Core library for the ToS Decoder: turns long Terms of Service documents into summaries and
//! risk lists with a language-model backend.

/// Chunk summaries, consolidation, and risk extraction.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Language-model backend abstraction and adapters.
pub mod backend;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from PDFs, images, and text files.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis metrics helpers.
pub mod metrics;
/// Text sanitizing, chunking, and fingerprinting.
pub mod processing;
/// Follow-up questions about an analyzed document.
pub mod session;

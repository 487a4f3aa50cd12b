//! Turn uploaded documents into plain text for analysis.
//!
//! PDFs go through their embedded text layer, images through an external OCR command, and
//! plain-text files are read as UTF-8. A PDF whose text layer is missing or shorter than the
//! configured threshold is treated as a scan: its pages are rendered to PNG and OCR'd in order.
//! The output feeds straight into the sanitizer.

mod ocr;
mod pdf;

use crate::config::{Config, get_config};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_OCR_COMMAND: &str = "tesseract";
const DEFAULT_OCR_MIN_CHARS: usize = 100;
const DEFAULT_PDF_RENDER_COMMAND: &str = "pdftoppm";

/// Errors surfaced while extracting document text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The PDF could not be parsed.
    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),
    /// The OCR command failed or could not be started.
    #[error("OCR failed: {0}")]
    Ocr(String),
    /// The file extension is not a supported document type.
    #[error("Unsupported document type: {0}")]
    UnsupportedKind(String),
    /// Extraction succeeded but produced no text at all.
    #[error("No text could be extracted from {0}")]
    NoText(PathBuf),
}

/// Document formats accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF with an embedded text layer.
    Pdf,
    /// Raster image that needs OCR.
    Image,
    /// UTF-8 text or Markdown.
    PlainText,
}

impl DocumentKind {
    /// Detect the kind from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Ok(Self::Image),
            "txt" | "md" => Ok(Self::PlainText),
            "" => Err(ExtractionError::UnsupportedKind(path.display().to_string())),
            other => Err(ExtractionError::UnsupportedKind(format!(".{other}"))),
        }
    }
}

/// Interface for turning a document on disk into text.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract the document's text.
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extractor backed by `pdf-extract`, a local PDF page renderer, and a local OCR executable.
#[derive(Debug, Clone)]
pub struct LocalExtractor {
    ocr_command: String,
    ocr_min_chars: usize,
    pdf_render_command: String,
}

impl Default for LocalExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_OCR_COMMAND, DEFAULT_OCR_MIN_CHARS)
    }
}

impl LocalExtractor {
    /// Build an extractor with an explicit OCR command and scan threshold.
    pub fn new(ocr_command: impl Into<String>, ocr_min_chars: usize) -> Self {
        Self {
            ocr_command: ocr_command.into(),
            ocr_min_chars,
            pdf_render_command: DEFAULT_PDF_RENDER_COMMAND.to_string(),
        }
    }

    /// Use `command` to render scanned PDF pages (invoked as `<cmd> -r 200 -png <pdf> <prefix>`).
    pub fn with_pdf_renderer(mut self, command: impl Into<String>) -> Self {
        self.pdf_render_command = command.into();
        self
    }

    /// Build an extractor from the global configuration.
    pub fn from_config() -> Self {
        Self::with_config(get_config())
    }

    /// Build an extractor from `config`.
    pub fn with_config(config: &Config) -> Self {
        Self::new(config.ocr_command.clone(), config.ocr_min_chars)
            .with_pdf_renderer(config.pdf_render_command.clone())
    }
}

#[async_trait]
impl DocumentExtractor for LocalExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let kind = DocumentKind::from_path(path)?;
        tracing::info!(path = %path.display(), kind = ?kind, "Extracting document text");
        let text = match kind {
            DocumentKind::Pdf => {
                let bytes = read_file(path).await?;
                pdf::extract_pdf_text(path, bytes, self).await?
            }
            DocumentKind::Image => ocr::run_ocr(&self.ocr_command, path).await?,
            DocumentKind::PlainText => {
                let bytes = read_file(path).await?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText(path.to_path_buf()));
        }
        tracing::debug!(
            path = %path.display(),
            chars = text.chars().count(),
            "Document text extracted"
        );
        Ok(text)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tos-decoder-{}.{extension}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn detects_kinds_from_extensions() {
        assert_eq!(
            DocumentKind::from_path(Path::new("terms.PDF")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("scan.jpeg")).unwrap(),
            DocumentKind::Image
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.md")).unwrap(),
            DocumentKind::PlainText
        );
        assert!(matches!(
            DocumentKind::from_path(Path::new("terms.docx")),
            Err(ExtractionError::UnsupportedKind(ext)) if ext == ".docx"
        ));
        assert!(DocumentKind::from_path(Path::new("README")).is_err());
    }

    #[tokio::test]
    async fn reads_plain_text_files() {
        let path = temp_path("txt");
        std::fs::write(&path, "We may share your data.").unwrap();

        let text = LocalExtractor::default().extract(&path).await;
        std::fs::remove_file(&path).ok();
        assert_eq!(text.unwrap(), "We may share your data.");
    }

    #[tokio::test]
    async fn blank_text_files_yield_no_text() {
        let path = temp_path("txt");
        std::fs::write(&path, "  \n ").unwrap();

        let result = LocalExtractor::default().extract(&path).await;
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ExtractionError::NoText(_))));
    }

    #[tokio::test]
    async fn missing_files_report_io_errors() {
        let path = temp_path("txt");
        let result = LocalExtractor::default().extract(&path).await;
        assert!(matches!(result, Err(ExtractionError::Io { .. })));
    }

    #[tokio::test]
    async fn garbage_pdfs_report_pdf_errors() {
        let path = temp_path("pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let extractor = LocalExtractor::new("echo", 100).with_pdf_renderer("false");
        let result = extractor.extract(&path).await;
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scanned_pdfs_fall_back_to_page_ocr() {
        use std::os::unix::fs::PermissionsExt;

        let renderer = temp_path("sh");
        std::fs::write(&renderer, "#!/bin/sh\ntouch \"$5-2.png\" \"$5-1.png\"\n").unwrap();
        std::fs::set_permissions(&renderer, std::fs::Permissions::from_mode(0o755)).unwrap();
        let path = temp_path("pdf");
        std::fs::write(&path, b"scanned pages, no text layer").unwrap();

        let extractor =
            LocalExtractor::new("echo", 100).with_pdf_renderer(renderer.display().to_string());
        let result = extractor.extract(&path).await;
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&renderer).ok();

        let text = result.expect("OCR text");
        let first = text.find("page-1.png stdout").expect("first page");
        let second = text.find("page-2.png stdout").expect("second page");
        assert!(first < second, "pages out of order: {text:?}");
    }

    #[tokio::test]
    async fn default_extractor_reports_unreadable_pdfs() {
        let path = temp_path("pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let result = LocalExtractor::default().extract(&path).await;
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }
}

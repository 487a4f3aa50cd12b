use super::{ExtractionError, LocalExtractor, ocr};
use std::path::Path;

/// Pull the text out of a PDF, OCR'ing rendered pages when the text layer is too thin.
///
/// The embedded text layer is parsed on the blocking pool; a panic inside the parser counts as
/// a PDF error. A layer that fails to parse or holds fewer than `ocr_min_chars` characters is
/// treated as a scan and every page goes through OCR. OCR text is appended to whatever the layer
/// produced. When OCR fails the layer result is returned unchanged.
pub(super) async fn extract_pdf_text(
    path: &Path,
    bytes: Vec<u8>,
    extractor: &LocalExtractor,
) -> Result<String, ExtractionError> {
    let layer = parse_text_layer(bytes).await;
    let chars = layer
        .as_ref()
        .map(|text| text.trim().chars().count())
        .unwrap_or(0);
    if chars >= extractor.ocr_min_chars {
        return layer;
    }

    match &layer {
        Ok(_) => tracing::warn!(
            chars,
            threshold = extractor.ocr_min_chars,
            "PDF text layer is sparse; falling back to OCR"
        ),
        Err(error) => tracing::warn!(
            error = %error,
            "PDF text layer unreadable; falling back to OCR"
        ),
    }

    match ocr::ocr_pdf_pages(
        &extractor.pdf_render_command,
        &extractor.ocr_command,
        path,
    )
    .await
    {
        Ok(recovered) if !recovered.trim().is_empty() => {
            let mut text = layer.unwrap_or_default();
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&recovered);
            Ok(text)
        }
        Ok(_) => layer,
        Err(error) => {
            tracing::warn!(error = %error, "OCR fallback failed");
            layer
        }
    }
}

async fn parse_text_layer(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|error| ExtractionError::Pdf(format!("PDF parser task failed: {error}")))?
        .map_err(|error| ExtractionError::Pdf(error.to_string()))
}

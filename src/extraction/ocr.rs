use super::ExtractionError;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Resolution passed to the page renderer.
const RENDER_DPI: &str = "200";

/// Run `<command> <path> stdout` and return what the OCR engine printed.
pub(super) async fn run_ocr(command: &str, path: &Path) -> Result<String, ExtractionError> {
    let output = Command::new(command)
        .arg(path)
        .arg("stdout")
        .output()
        .await
        .map_err(|error| ExtractionError::Ocr(format!("failed to run `{command}`: {error}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Ocr(format!(
            "`{command}` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Render every page of `pdf` to PNG with `render_command`, then OCR the pages in order.
///
/// The renderer is invoked as `<render_command> -r 200 -png <pdf> <prefix>` (the `pdftoppm`
/// calling convention) inside a scratch directory that is removed afterwards.
pub(super) async fn ocr_pdf_pages(
    render_command: &str,
    ocr_command: &str,
    pdf: &Path,
) -> Result<String, ExtractionError> {
    let workdir = std::env::temp_dir().join(format!("tos-decoder-ocr-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&workdir).await.map_err(|error| {
        ExtractionError::Ocr(format!("failed to create {}: {error}", workdir.display()))
    })?;

    let result = render_and_read(render_command, ocr_command, pdf, &workdir).await;
    if let Err(error) = tokio::fs::remove_dir_all(&workdir).await {
        tracing::debug!(
            path = %workdir.display(),
            error = %error,
            "Failed to remove OCR scratch directory"
        );
    }
    result
}

async fn render_and_read(
    render_command: &str,
    ocr_command: &str,
    pdf: &Path,
    workdir: &Path,
) -> Result<String, ExtractionError> {
    let output = Command::new(render_command)
        .args(["-r", RENDER_DPI, "-png"])
        .arg(pdf)
        .arg(workdir.join("page"))
        .output()
        .await
        .map_err(|error| {
            ExtractionError::Ocr(format!("failed to run `{render_command}`: {error}"))
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Ocr(format!(
            "`{render_command}` exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let pages = rendered_pages(workdir).await?;
    if pages.is_empty() {
        return Err(ExtractionError::Ocr(format!(
            "`{render_command}` produced no page images"
        )));
    }

    let mut text = String::new();
    for page in &pages {
        let page_text = run_ocr(ocr_command, page).await?;
        text.push_str(page_text.trim_end());
        text.push('\n');
    }
    tracing::info!(pages = pages.len(), "Recovered PDF text via OCR");
    Ok(text)
}

/// PNG files in `workdir`, in page order (the renderer zero-pads page numbers).
async fn rendered_pages(workdir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let read_error = |error: std::io::Error| {
        ExtractionError::Ocr(format!("failed to list {}: {error}", workdir.display()))
    };
    let mut entries = tokio::fs::read_dir(workdir).await.map_err(read_error)?;
    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_an_ocr_error() {
        let result = run_ocr("tos-decoder-no-such-ocr", Path::new("scan.png")).await;
        assert!(matches!(
            result,
            Err(ExtractionError::Ocr(message)) if message.contains("failed to run")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_command_stdout() {
        let text = run_ocr("echo", Path::new("scan.png")).await.expect("echo runs");
        assert_eq!(text.trim(), "scan.png stdout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_an_ocr_error() {
        let result = run_ocr("false", Path::new("scan.png")).await;
        assert!(matches!(result, Err(ExtractionError::Ocr(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_renderer_is_an_ocr_error() {
        let result = ocr_pdf_pages("false", "echo", Path::new("scan.pdf")).await;
        assert!(matches!(
            result,
            Err(ExtractionError::Ocr(message)) if message.contains("exited with")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn renderer_without_pages_is_an_ocr_error() {
        let result = ocr_pdf_pages("true", "echo", Path::new("scan.pdf")).await;
        assert!(matches!(
            result,
            Err(ExtractionError::Ocr(message)) if message.contains("no page images")
        ));
    }
}

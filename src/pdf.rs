use crate::error::{Result, SplitError};
use std::path::Path;
use tokio::process::Command;

/// Pages worth reading: the summary and per-line detail sit up front.
pub const DEFAULT_MAX_PAGES: u32 = 2;

/// Runs `pdftotext -layout -l <max_pages> <file> -` and returns its stdout.
pub async fn extract_text(file: &Path, max_pages: u32) -> Result<String> {
    which::which("pdftotext").map_err(|_| {
        SplitError::Extraction(
            "pdftotext not installed (install poppler-utils / brew install poppler)".to_string(),
        )
    })?;

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-l")
        .arg(max_pages.max(1).to_string())
        .arg(file)
        .arg("-")
        .output()
        .await
        .map_err(|e| SplitError::Extraction(format!("failed to run pdftotext: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SplitError::Extraction(format!(
            "pdftotext failed on {} (exit {}): {}",
            file.display(),
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    if text.trim().is_empty() {
        return Err(SplitError::Extraction(format!(
            "{} has no extractable text (scanned or image-only PDF?)",
            file.display()
        )));
    }

    log::debug!("Extracted {} characters from {}", text.len(), file.display());
    Ok(text)
}

//! Output routing: where result files go and how they are written.
//!
//! | File | Location | When |
//! |------|----------|------|
//! | `<stem>_OCR.md` | next to the source | markdown output, always |
//! | `<stem>_OCR文本版本.pdf` | next to the source | PDF summary requested |
//! | `<stem>.md` / `.txt` / `.json` | output directory | output directory set |
//!
//! All writes go to a temporary sibling first and are renamed into place, so
//! an interrupted run never leaves a half-written file under the final name.

use crate::config::OutputFormat;
use crate::error::OcrError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to the source stem for the markdown sibling file.
pub const MARKDOWN_SUFFIX: &str = "_OCR";

/// Suffix appended to the source stem for the PDF summary.
pub const PDF_SUFFIX: &str = "_OCR文本版本";

fn stem_of(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

fn sibling(source: &Path, file_name: String) -> PathBuf {
    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// `dir/report.pdf` → `dir/report_OCR.md`
pub fn markdown_sibling_path(source: &Path) -> PathBuf {
    sibling(source, format!("{}{}.md", stem_of(source), MARKDOWN_SUFFIX))
}

/// `dir/report.pdf` → `dir/report_OCR文本版本.pdf`
pub fn pdf_sibling_path(source: &Path) -> PathBuf {
    sibling(source, format!("{}{}.pdf", stem_of(source), PDF_SUFFIX))
}

/// `out/` + `dir/report.pdf` → `out/report.<ext>`
pub fn output_file_path(output_dir: &Path, source: &Path, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{}.{}", stem_of(source), format.extension()))
}

/// Write `bytes` to `path` via a temporary file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), OcrError> {
    let fail = |source| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(fail)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }

    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

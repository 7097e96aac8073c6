//! Input resolution: validate a user-supplied path and load it for upload.
//!
//! The OCR service only accepts PDFs and PNG/JPEG images, so the extension
//! is checked before any bytes are read or sent. Directory listing keeps
//! regular files with a supported extension and ignores everything else,
//! including the `<stem>_OCR文本版本.pdf` summaries a previous run left behind.

use crate::client::{DocumentKind, SourceDocument};
use crate::error::OcrError;
use crate::pipeline::write::PDF_SUFFIX;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check that `path` exists and has a supported extension.
pub fn validate_input(path: &Path) -> Result<DocumentKind, OcrError> {
    if !path.exists() {
        return Err(OcrError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    DocumentKind::from_path(path).ok_or_else(|| OcrError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default(),
    })
}

/// Validate `path` and read it into a [`SourceDocument`].
pub async fn load_document(path: &Path) -> Result<SourceDocument, OcrError> {
    let kind = validate_input(path)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => OcrError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    debug!("Loaded {} ({} bytes, {:?})", path.display(), bytes.len(), kind);
    Ok(SourceDocument {
        file_name,
        kind,
        bytes,
    })
}

/// List the supported files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    if !dir.is_dir() {
        return Err(OcrError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => OcrError::DirectoryNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && DocumentKind::from_path(p).is_some())
        .filter(|p| !is_generated_summary(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!("Found {} supported files in {}", files.len(), dir.display());
    Ok(files)
}

/// Whether `path` is a PDF summary written by an earlier run.
fn is_generated_summary(path: &Path) -> bool {
    DocumentKind::from_path(path) == Some(DocumentKind::Pdf)
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.ends_with(PDF_SUFFIX))
}

//! Error types for the edgequake-ocr library.
//!
//! [`OcrError`] is the single error enum of the crate. Every variant belongs
//! to one [`ErrorKind`], which mirrors how failures are handled:
//!
//! * **Service** — the OCR service rejected or failed the request.
//! * **Input** — missing file, unsupported extension, missing directory.
//! * **Assembly** — the service answered with an unexpected shape.
//! * **Output** — a result file could not be written or rendered.
//! * **Config** — the processor cannot be built at all (e.g. no API key).
//!
//! Only `Config` errors (and a missing batch directory) surface as `Err` from
//! the public entry points. Per-file failures are caught at the file boundary
//! and stored in [`crate::output::DocumentResult::error`] so that one bad file
//! never aborts a directory batch.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the edgequake-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not one the OCR service accepts.
    #[error("Unsupported file format '{extension}' for '{path}'. Supported: PDF, PNG, JPG, JPEG")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Batch input directory does not exist or is not a directory.
    #[error("Directory not found: '{path}'")]
    DirectoryNotFound { path: PathBuf },

    // ── Service errors ────────────────────────────────────────────────────
    /// The OCR service returned a non-success status or could not be reached.
    #[error("OCR service error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    ServiceError {
        status: Option<u16>,
        message: String,
    },

    /// The OCR service rejected the credential (HTTP 401/403).
    #[error("Authentication failed: {detail}\nCheck MISTRAL_API_KEY or --api-key.")]
    AuthError { detail: String },

    /// The OCR service throttled the request (HTTP 429).
    #[error("Rate limit exceeded{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// The service response could not be decoded into page records.
    #[error("Unexpected OCR response shape: {detail}")]
    MalformedResponse { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The PDF summary could not be produced.
    #[error("Failed to render PDF summary '{path}': {detail}")]
    PdfRenderFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No credential was supplied for the OCR service.
    #[error("Mistral API key is required.\nSet MISTRAL_API_KEY, add it to .env, or pass --api-key.\nGet a key at https://console.mistral.ai/")]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`OcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Service,
    Input,
    Assembly,
    Output,
    Config,
}

impl OcrError {
    /// Which family of failure this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::FileNotFound { .. }
            | OcrError::PermissionDenied { .. }
            | OcrError::UnsupportedFormat { .. }
            | OcrError::DirectoryNotFound { .. } => ErrorKind::Input,
            OcrError::ServiceError { .. } | OcrError::AuthError { .. } | OcrError::RateLimited { .. } => {
                ErrorKind::Service
            }
            OcrError::MalformedResponse { .. } | OcrError::Internal(_) => ErrorKind::Assembly,
            OcrError::OutputWriteFailed { .. } | OcrError::PdfRenderFailed { .. } => ErrorKind::Output,
            OcrError::MissingApiKey | OcrError::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

impl From<reqwest::Error> for OcrError {
    fn from(e: reqwest::Error) -> Self {
        OcrError::ServiceError {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_display_with_status() {
        let e = OcrError::ServiceError {
            status: Some(500),
            message: "upstream exploded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 500"), "got: {msg}");
        assert!(msg.contains("upstream exploded"));
    }

    #[test]
    fn service_error_display_without_status() {
        let e = OcrError::ServiceError {
            status: None,
            message: "connection refused".into(),
        };
        assert!(!e.to_string().contains("HTTP"));
    }

    #[test]
    fn rate_limit_display() {
        let with = OcrError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(with.to_string().contains("30s"));
        let without = OcrError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(without.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn unsupported_format_lists_accepted_types() {
        let e = OcrError::UnsupportedFormat {
            path: PathBuf::from("scan.tiff"),
            extension: ".tiff".into(),
        };
        assert!(e.to_string().contains("PDF, PNG, JPG, JPEG"));
    }

    #[test]
    fn kinds_are_classified() {
        assert_eq!(
            OcrError::FileNotFound {
                path: PathBuf::from("x.pdf")
            }
            .kind(),
            ErrorKind::Input
        );
        assert_eq!(
            OcrError::AuthError {
                detail: "bad key".into()
            }
            .kind(),
            ErrorKind::Service
        );
        assert_eq!(
            OcrError::MalformedResponse {
                detail: "missing pages".into()
            }
            .kind(),
            ErrorKind::Assembly
        );
        assert_eq!(
            OcrError::PdfRenderFailed {
                path: PathBuf::from("x_OCR文本版本.pdf"),
                detail: "render task panicked".into()
            }
            .kind(),
            ErrorKind::Output
        );
        assert_eq!(OcrError::MissingApiKey.kind(), ErrorKind::Config);
    }
}

//! Data model: what the OCR service returns and what a run produces.

use crate::config::OutputFormat;
use crate::error::{ErrorKind, OcrError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One embedded image of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// Identifier used by the page markdown (`![id](id)`).
    pub id: String,

    /// Inline image data, typically a `data:image/...;base64,` URI.
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// One page as recognised by the OCR service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Position reported by the service (0-indexed).
    #[serde(default)]
    pub index: usize,

    /// Recognised plain text.
    #[serde(default)]
    pub text: String,

    /// Recognised markdown with `![id](id)` image placeholders.
    #[serde(default)]
    pub markdown: String,

    #[serde(default)]
    pub images: Vec<PageImage>,
}

#[derive(Deserialize)]
struct PagesEnvelope {
    pages: Vec<PageRecord>,
}

/// A raw OCR service response.
///
/// Keeps the JSON exactly as received so JSON output can pass it through
/// unchanged; page records are decoded on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResponse {
    raw: serde_json::Value,
}

impl OcrResponse {
    pub fn new(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    /// The response as returned by the service.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Decode the ordered page records, in response order.
    pub fn pages(&self) -> Result<Vec<PageRecord>, OcrError> {
        PagesEnvelope::deserialize(&self.raw)
            .map(|env| env.pages)
            .map_err(|e| OcrError::MalformedResponse {
                detail: e.to_string(),
            })
    }
}

/// Outcome of processing one input file.
///
/// Exactly one of `content` and `error` is set. A result is created once per
/// file and never mutated by later files of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// The input file.
    pub source: PathBuf,

    pub format: OutputFormat,

    /// Assembled content. In JSON mode: the pretty-printed raw response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Raw service response (JSON mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    /// `<stem>_OCR.md` next to the source (markdown mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_path: Option<PathBuf>,

    /// File written to the configured output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// PDF summary next to the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,

    /// Human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl DocumentResult {
    /// A successful result carrying `content`.
    pub fn success(source: PathBuf, format: OutputFormat, content: String) -> Self {
        Self {
            source,
            format,
            content: Some(content),
            response: None,
            markdown_path: None,
            output_path: None,
            pdf_path: None,
            error: None,
            error_kind: None,
        }
    }

    /// A failed result; carries no content and no paths.
    pub fn failure(source: PathBuf, format: OutputFormat, error: &OcrError) -> Self {
        Self {
            source,
            format,
            content: None,
            response: None,
            markdown_path: None,
            output_path: None,
            pdf_path: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One entry of a directory batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    /// File name relative to the batch directory.
    pub file: String,
    pub result: DocumentResult,
}

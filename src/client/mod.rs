//! The OCR collaborator seam.
//!
//! [`OcrClient`] is the only place the crate talks to the outside OCR
//! service. The processor treats a call as an opaque request/response pair:
//! a document goes in, the service's JSON comes back. Upload, signing and
//! clean-up mechanics stay inside the implementation.
//!
//! * [`MistralClient`] — the hosted Mistral OCR API over HTTPS.
//! * [`StaticOcrClient`] — canned responses, for tests and offline runs.

pub mod mistral;
pub mod mock;

pub use mistral::MistralClient;
pub use mock::StaticOcrClient;

use crate::error::OcrError;
use async_trait::async_trait;
use std::path::Path;

/// Kind of document submitted to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Classify a path by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" => Some(DocumentKind::Png),
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Png => "image/png",
            DocumentKind::Jpeg => "image/jpeg",
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, DocumentKind::Pdf)
    }
}

/// A document read from disk, ready for upload.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name including extension, e.g. `report.pdf`.
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

/// An OCR backend.
///
/// Implementations must be `Send + Sync` so one client can be shared by a
/// processor through an `Arc`.
#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Run OCR on `document` and return the service response unchanged.
    async fn recognize(&self, document: &SourceDocument) -> Result<serde_json::Value, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_path(Path::new("a.Jpg")), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_path(Path::new("a.jpeg")), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_path(Path::new("a.png")), Some(DocumentKind::Png));
        assert_eq!(DocumentKind::from_path(Path::new("a.tiff")), None);
        assert_eq!(DocumentKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn mime_types() {
        assert_eq!(DocumentKind::Pdf.mime_type(), "application/pdf");
        assert!(DocumentKind::Png.is_image());
        assert!(!DocumentKind::Pdf.is_image());
    }
}

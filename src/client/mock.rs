//! In-memory OCR client returning canned responses.

use super::{OcrClient, SourceDocument};
use crate::error::OcrError;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Canned {
    Response(serde_json::Value),
    Failure(String),
}

/// An [`OcrClient`] that never touches the network.
///
/// Responses are looked up by file name; unknown files get the default
/// response. Every call is recorded.
pub struct StaticOcrClient {
    default_response: serde_json::Value,
    by_file: HashMap<String, Canned>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl StaticOcrClient {
    /// Answer every request with `response`.
    pub fn new(response: serde_json::Value) -> Self {
        Self {
            default_response: response,
            by_file: HashMap::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A client whose default response has one page per `(text, markdown)`.
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        let pages: Vec<_> = pages
            .iter()
            .enumerate()
            .map(|(i, (text, markdown))| {
                json!({ "index": i, "text": text, "markdown": markdown, "images": [] })
            })
            .collect();
        Self::new(json!({ "pages": pages, "model": "static" }))
    }

    /// Use `response` for requests about `file_name`.
    pub fn respond_to(mut self, file_name: impl Into<String>, response: serde_json::Value) -> Self {
        self.by_file.insert(file_name.into(), Canned::Response(response));
        self
    }

    /// Fail requests about `file_name` with a service error.
    pub fn fail_on(mut self, file_name: impl Into<String>, message: impl Into<String>) -> Self {
        self.by_file.insert(file_name.into(), Canned::Failure(message.into()));
        self
    }

    /// Number of recognitions attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// File names in the order they were submitted.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl OcrClient for StaticOcrClient {
    fn name(&self) -> &str {
        "static"
    }

    async fn recognize(&self, document: &SourceDocument) -> Result<serde_json::Value, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(document.file_name.clone());
        }

        match self.by_file.get(&document.file_name) {
            Some(Canned::Response(v)) => Ok(v.clone()),
            Some(Canned::Failure(msg)) => Err(OcrError::ServiceError {
                status: Some(500),
                message: msg.clone(),
            }),
            None => Ok(self.default_response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DocumentKind;

    fn doc(name: &str) -> SourceDocument {
        SourceDocument {
            file_name: name.to_string(),
            kind: DocumentKind::Pdf,
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    #[tokio::test]
    async fn routes_by_file_name() {
        let client = StaticOcrClient::with_pages(&[("a", "# a")])
            .respond_to("special.pdf", json!({"pages": []}))
            .fail_on("broken.pdf", "boom");

        let v = client.recognize(&doc("any.pdf")).await.unwrap();
        assert_eq!(v["pages"][0]["text"], "a");

        let v = client.recognize(&doc("special.pdf")).await.unwrap();
        assert_eq!(v["pages"].as_array().unwrap().len(), 0);

        let err = client.recognize(&doc("broken.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("boom"));

        assert_eq!(client.calls(), 3);
        assert_eq!(client.seen(), vec!["any.pdf", "special.pdf", "broken.pdf"]);
    }
}

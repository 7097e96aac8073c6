//! Mistral OCR over HTTPS.
//!
//! One recognition is four requests:
//!
//! ```text
//! POST   /files            multipart upload, purpose=ocr  → {id}
//! GET    /files/{id}/url   signed retrieval URL           → {url}
//! POST   /ocr              model + document URL           → {pages: [...]}
//! DELETE /files/{id}       best-effort clean-up
//! ```
//!
//! Images are always requested inline (`include_image_base64`) because the
//! markdown and PDF outputs embed them.

use super::{DocumentKind, OcrClient, SourceDocument};
use crate::config::OcrConfig;
use crate::error::OcrError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the hosted Mistral OCR API.
pub struct MistralClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    expiry_hours: u32,
}

impl std::fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("expiry_hours", &self.expiry_hours)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct UploadedFile {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrl {
    url: String,
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: serde_json::Value,
    include_image_base64: bool,
}

impl MistralClient {
    /// Build a client from the credential, model and endpoint in `config`.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(OcrError::MissingApiKey)?
            .to_string();

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| OcrError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            expiry_hours: config.signed_url_expiry_hours,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn upload(&self, document: &SourceDocument) -> Result<String, OcrError> {
        info!("Uploading {} ({} bytes)", document.file_name, document.bytes.len());

        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(document.kind.mime_type())?;
        let form = Form::new().text("purpose", "ocr").part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let uploaded: UploadedFile = parse_json(check_status(response).await?).await?;
        debug!("Uploaded as file id {}", uploaded.id);
        Ok(uploaded.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, OcrError> {
        let response = self
            .client
            .get(format!("{}/files/{}/url", self.base_url, file_id))
            .query(&[("expiry", self.expiry_hours)])
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let signed: SignedUrl = parse_json(check_status(response).await?).await?;
        Ok(signed.url)
    }

    async fn process(&self, url: &str, kind: DocumentKind) -> Result<serde_json::Value, OcrError> {
        info!("Calling OCR with model {}", self.model);

        let body = OcrRequest {
            model: &self.model,
            document: document_chunk(url, kind),
            include_image_base64: true,
        };

        let response = self
            .client
            .post(format!("{}/ocr", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        parse_json(check_status(response).await?).await
    }

    async fn delete(&self, file_id: &str) {
        let result = self
            .client
            .delete(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match result {
            Ok(r) if r.status().is_success() => debug!("Deleted uploaded file {}", file_id),
            Ok(r) => warn!("Could not delete uploaded file {}: HTTP {}", file_id, r.status()),
            Err(e) => warn!("Could not delete uploaded file {}: {}", file_id, e),
        }
    }
}

#[async_trait]
impl OcrClient for MistralClient {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn recognize(&self, document: &SourceDocument) -> Result<serde_json::Value, OcrError> {
        let file_id = self.upload(document).await?;

        // The uploaded file is removed whether or not OCR succeeded.
        let result = match self.signed_url(&file_id).await {
            Ok(url) => self.process(&url, document.kind).await,
            Err(e) => Err(e),
        };
        self.delete(&file_id).await;

        if result.is_ok() {
            info!("OCR finished for {}", document.file_name);
        }
        result
    }
}

/// The `document` field of an OCR request.
fn document_chunk(url: &str, kind: DocumentKind) -> serde_json::Value {
    if kind.is_image() {
        json!({ "type": "image_url", "image_url": url })
    } else {
        json!({ "type": "document_url", "document_url": url })
    }
}

/// Turn a non-2xx response into the matching [`OcrError`].
async fn check_status(response: Response) -> Result<Response, OcrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(status_error(status, body, retry_after))
}

fn status_error(status: StatusCode, body: String, retry_after_secs: Option<u64>) -> OcrError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OcrError::AuthError {
            detail: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        },
        StatusCode::TOO_MANY_REQUESTS => OcrError::RateLimited { retry_after_secs },
        _ => OcrError::ServiceError {
            status: Some(status.as_u16()),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            },
        },
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, OcrError> {
    response
        .json::<T>()
        .await
        .map_err(|e| OcrError::MalformedResponse {
            detail: e.to_string(),
        })
}

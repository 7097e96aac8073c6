//! Configuration types for OCR processing.
//!
//! All processing behaviour is controlled through [`OcrConfig`], built via
//! its [`OcrConfigBuilder`]. The credential lives here too: it is handed to
//! [`crate::process::OcrProcessor::new`] as part of the config instead of
//! being read from process-wide state, so two processors with different keys
//! can coexist in one program.

use crate::client::OcrClient;
use crate::error::OcrError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default OCR model.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Default Mistral API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Configuration for an OCR run.
///
/// # Example
/// ```rust
/// use edgequake_ocr::{OcrConfig, OutputFormat};
///
/// let config = OcrConfig::builder()
///     .api_key("sk-test")
///     .output_format(OutputFormat::Text)
///     .generate_pdf(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "mistral-ocr-latest");
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Mistral API key. Required unless `client` is set.
    pub api_key: Option<String>,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub model: String,

    /// API root used by the built-in Mistral client.
    pub base_url: String,

    /// Pre-constructed OCR client. Takes precedence over `api_key`.
    ///
    /// Useful in tests, or to route requests through a custom transport.
    pub client: Option<Arc<dyn OcrClient>>,

    /// Output representation. Default: [`OutputFormat::Markdown`].
    pub output_format: OutputFormat,

    /// Also render a PDF summary next to each source file. Default: false.
    pub generate_pdf: bool,

    /// Directory receiving `<stem>.md|.txt|.json`. `None` leaves results
    /// in memory only (the markdown sibling file is written regardless).
    pub output_dir: Option<PathBuf>,

    /// Font files tried before the built-in candidate list when rendering
    /// the PDF summary.
    pub font_paths: Vec<PathBuf>,

    /// Lifetime of the signed retrieval URL, in hours. Default: 1.
    pub signed_url_expiry_hours: u32,

    /// Optional HTTP timeout per request. Default: none.
    ///
    /// OCR of a long PDF can take minutes; by default the client waits as
    /// long as the service does.
    pub request_timeout_secs: Option<u64>,

    /// Receives per-file events during directory processing.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: None,
            output_format: OutputFormat::default(),
            generate_pdf: false,
            output_dir: None,
            font_paths: Vec::new(),
            signed_url_expiry_hours: 1,
            request_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("client", &self.client.as_ref().map(|_| "<dyn OcrClient>"))
            .field("output_format", &self.output_format)
            .field("generate_pdf", &self.generate_pdf)
            .field("output_dir", &self.output_dir)
            .field("font_paths", &self.font_paths)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn client(mut self, client: Arc<dyn OcrClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn generate_pdf(mut self, v: bool) -> Self {
        self.config.generate_pdf = v;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_paths.push(path.into());
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.signed_url_expiry_hours = hours;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model must not be empty".into()));
        }
        if c.signed_url_expiry_hours == 0 {
            return Err(OcrError::InvalidConfig(
                "signed URL expiry must be ≥ 1 hour".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(OcrError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(OcrError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output representation produced for each document.
///
/// | Format | Content | Output-dir file |
/// |--------|---------|-----------------|
/// | `markdown` | page markdown, images inlined | `<stem>.md` |
/// | `text` | page plain text | `<stem>.txt` |
/// | `json` | raw service response | `<stem>.json` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Text,
    #[default]
    Markdown,
}

impl OutputFormat {
    /// Extension (without dot) of the file written to the output directory.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
            OutputFormat::Markdown => "md",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
            OutputFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(OcrError::InvalidConfig(format!(
                "unknown output format '{other}' (expected markdown, text or json)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = OcrConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.output_format, OutputFormat::Markdown);
        assert!(!c.generate_pdf);
        assert_eq!(c.signed_url_expiry_hours, 1);
        assert!(c.request_timeout_secs.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = OcrConfig::builder().api_key("sk-secret-123").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret-123"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn builder_trims_base_url() {
        let c = OcrConfig::builder()
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(OcrConfig::builder().model("  ").build().is_err());
        assert!(OcrConfig::builder().signed_url_expiry_hours(0).build().is_err());
        assert!(OcrConfig::builder().request_timeout_secs(0).build().is_err());
        assert!(OcrConfig::builder().base_url("ftp://x").build().is_err());
    }

    #[test]
    fn output_format_parse_and_extension() {
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("html".parse::<OutputFormat>().is_err());

        assert_eq!(OutputFormat::Text.extension(), "txt");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}

//! Document and directory processing entry points.
//!
//! [`OcrProcessor`] owns the resolved configuration and the OCR client. A
//! single document never fails at the call level: every failure becomes a
//! [`DocumentResult`] with `error` set, so a directory batch can record it
//! and move on to the next file.

use crate::client::{MistralClient, OcrClient};
use crate::config::{OcrConfig, OutputFormat};
use crate::error::OcrError;
use crate::output::{BatchEntry, DocumentResult, OcrResponse};
use crate::pipeline::assemble::{self, Assembled};
use crate::pipeline::write::{markdown_sibling_path, output_file_path, write_atomic};
use crate::pipeline::{input, render};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs documents through the OCR service and routes the results.
pub struct OcrProcessor {
    config: OcrConfig,
    client: Arc<dyn OcrClient>,
}

impl std::fmt::Debug for OcrProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrProcessor")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .finish()
    }
}

impl OcrProcessor {
    /// Create a processor.
    ///
    /// Uses `config.client` when set; otherwise builds a [`MistralClient`]
    /// from `config.api_key`.
    ///
    /// # Errors
    /// [`OcrError::MissingApiKey`] when no client is injected and no key is
    /// configured.
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let client: Arc<dyn OcrClient> = match config.client {
            Some(ref client) => Arc::clone(client),
            None => Arc::new(MistralClient::from_config(&config)?),
        };
        debug!(
            "OCR processor ready: client={}, format={}",
            client.name(),
            config.output_format
        );
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Process one document.
    ///
    /// Writes `<stem>_OCR.md` next to the source in markdown mode, the
    /// output-directory file when one is configured, and the PDF summary when
    /// requested. Nothing is written when input validation, the service call
    /// or assembly fails.
    pub async fn process_document(&self, path: impl AsRef<Path>) -> DocumentResult {
        let path = path.as_ref();
        let format = self.config.output_format;
        let start = Instant::now();
        info!("Processing {} ({})", path.display(), format);

        match self.try_process(path, format).await {
            Ok(result) => {
                info!(
                    "Processed {} in {}ms",
                    path.display(),
                    start.elapsed().as_millis()
                );
                result
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                DocumentResult::failure(path.to_path_buf(), format, &e)
            }
        }
    }

    async fn try_process(&self, path: &Path, format: OutputFormat) -> Result<DocumentResult, OcrError> {
        let document = input::load_document(path).await?;
        let raw = self.client.recognize(&document).await?;
        let assembled = assemble::assemble(&OcrResponse::new(raw), format)?;
        let content = assembled.content()?;

        let mut markdown_path = None;
        if format == OutputFormat::Markdown {
            let md_path = markdown_sibling_path(path);
            write_atomic(&md_path, content.as_bytes()).await?;
            info!("Wrote {}", md_path.display());
            markdown_path = Some(md_path);
        }

        let mut output_path = None;
        if let Some(ref dir) = self.config.output_dir {
            let out_path = output_file_path(dir, path, format);
            write_atomic(&out_path, content.as_bytes()).await?;
            info!("Saved result to {}", out_path.display());
            output_path = Some(out_path);
        }

        let mut pdf_path = None;
        if self.config.generate_pdf {
            pdf_path = Some(render::write_summary(path, &content, &self.config.font_paths).await?);
        }

        let mut result = DocumentResult::success(path.to_path_buf(), format, content);
        if let Assembled::Json(raw) = assembled {
            result.response = Some(raw);
        }
        result.markdown_path = markdown_path;
        result.output_path = output_path;
        result.pdf_path = pdf_path;
        Ok(result)
    }

    /// Process every supported file directly inside `dir`, in file-name
    /// order, one at a time.
    ///
    /// Per-file failures are recorded in the returned entries and do not
    /// stop the batch.
    ///
    /// # Errors
    /// Only when `dir` is not a readable directory or the output directory
    /// cannot be created.
    pub async fn process_directory(&self, dir: impl AsRef<Path>) -> Result<Vec<BatchEntry>, OcrError> {
        let dir = dir.as_ref();
        let files = input::list_documents(dir)?;

        if let Some(ref out) = self.config.output_dir {
            tokio::fs::create_dir_all(out)
                .await
                .map_err(|e| OcrError::OutputWriteFailed {
                    path: out.clone(),
                    source: e,
                })?;
        }

        let total = files.len();
        if total == 0 {
            warn!("No supported documents found in {}", dir.display());
        } else {
            info!("Processing {} documents from {}", total, dir.display());
        }

        let progress = self.config.progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_batch_start(total);
        }

        let mut entries = Vec::with_capacity(total);
        for (i, path) in files.iter().enumerate() {
            let index = i + 1;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            if let Some(cb) = progress {
                cb.on_file_start(index, total, &name);
            }

            let result = self.process_document(path).await;

            if let Some(cb) = progress {
                match (&result.content, &result.error) {
                    (_, Some(e)) => cb.on_file_error(index, total, &name, e),
                    (Some(c), None) => cb.on_file_complete(index, total, &name, c.len()),
                    (None, None) => cb.on_file_complete(index, total, &name, 0),
                }
            }

            entries.push(BatchEntry { file: name, result });
        }

        let success = entries.iter().filter(|e| e.result.is_success()).count();
        info!("Batch complete: {}/{} documents succeeded", success, total);
        if let Some(cb) = progress {
            cb.on_batch_complete(total, success);
        }

        Ok(entries)
    }
}

/// Process one document with a one-off [`OcrProcessor`].
///
/// # Errors
/// Only configuration errors; document failures are reported in the result.
pub async fn process_file(path: impl AsRef<Path>, config: OcrConfig) -> Result<DocumentResult, OcrError> {
    let processor = OcrProcessor::new(config)?;
    Ok(processor.process_document(path).await)
}

/// Synchronous wrapper around [`process_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_file_sync(path: impl AsRef<Path>, config: OcrConfig) -> Result<DocumentResult, OcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| OcrError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(process_file(path, config))
}

/// Process a directory with a one-off [`OcrProcessor`].
pub async fn process_directory(dir: impl AsRef<Path>, config: OcrConfig) -> Result<Vec<BatchEntry>, OcrError> {
    OcrProcessor::new(config)?.process_directory(dir).await
}

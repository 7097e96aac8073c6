//! # edgequake-ocr
//!
//! Run PDFs and images through the hosted Mistral OCR service and shape the
//! result into JSON, plain text or Markdown with inline images.
//!
//! ## Why this crate?
//!
//! The OCR itself is delegated: the service returns structured per-page
//! results with extracted images. What is left to do locally is assembling
//! those pages into one output and routing it to the right files, plus an
//! optional plain-text PDF summary for reading on any device.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file (.pdf / .png / .jpg)
//!  │
//!  ├─ 1. Input     validate extension, read bytes
//!  ├─ 2. OCR       upload → signed URL → /ocr → delete
//!  ├─ 3. Assemble  json passthrough | text join | markdown + inline images
//!  ├─ 4. Write     <stem>_OCR.md sibling, <outdir>/<stem>.<ext>
//!  └─ 5. Render    optional <stem>_OCR文本版本.pdf summary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr::{OcrConfig, OcrProcessor, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::builder()
//!         .api_key(std::env::var("MISTRAL_API_KEY")?)
//!         .output_format(OutputFormat::Text)
//!         .build()?;
//!     let processor = OcrProcessor::new(config)?;
//!     let result = processor.process_document("scan.pdf").await;
//!     match result.error {
//!         None => println!("{}", result.content.unwrap_or_default()),
//!         Some(e) => eprintln!("failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `edgequake-ocr` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-ocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{MistralClient, OcrClient, SourceDocument, StaticOcrClient};
pub use config::{OcrConfig, OcrConfigBuilder, OutputFormat};
pub use error::{ErrorKind, OcrError};
pub use output::{BatchEntry, DocumentResult, OcrResponse, PageImage, PageRecord};
pub use process::{process_directory, process_file, process_file_sync, OcrProcessor};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};

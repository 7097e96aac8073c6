//! Pipeline stages for turning one document into OCR output files.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the network client can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ client ──▶ assemble ──▶ write ──▶ render
//! (path)    (OCR API)  (json/text/md) (files)  (PDF summary)
//! ```
//!
//! 1. [`input`]    — validate the path and read the document bytes
//! 2. [`crate::client`] — upload, OCR, delete; the only stage with network I/O
//! 3. [`assemble`] — build the requested output format from the raw response
//! 4. [`write`]    — route results to sibling files and the output directory
//! 5. [`render`]   — optional plain-text PDF summary; uses [`fonts`] to find
//!    a Unicode typeface and runs in `spawn_blocking`

pub mod assemble;
pub mod fonts;
pub mod input;
pub mod render;
pub mod write;

//! Result assembly: shape a raw OCR response into the requested output.
//!
//! Image placeholders are replaced with plain substring substitution, one
//! page at a time. Ids are only unique within a page, so a page never sees
//! another page's image map. An id that appears elsewhere in the page in the
//! exact `![id](id)` form is replaced too; downstream consumers rely on the
//! placeholder format, so this is kept as is.

use crate::config::OutputFormat;
use crate::error::OcrError;
use crate::output::{OcrResponse, PageRecord};

/// Separator between pages in text and markdown output.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Assembled output of one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Assembled {
    /// Raw response, passed through unchanged.
    Json(serde_json::Value),
    /// Concatenated page text.
    Text(String),
    /// Concatenated page markdown with images inlined.
    Markdown(String),
}

impl Assembled {
    /// The content string of this output. JSON is pretty-printed.
    pub fn content(&self) -> Result<String, OcrError> {
        match self {
            Assembled::Json(v) => serde_json::to_string_pretty(v)
                .map_err(|e| OcrError::Internal(format!("JSON encoding failed: {e}"))),
            Assembled::Text(s) | Assembled::Markdown(s) => Ok(s.clone()),
        }
    }

    pub fn format(&self) -> OutputFormat {
        match self {
            Assembled::Json(_) => OutputFormat::Json,
            Assembled::Text(_) => OutputFormat::Text,
            Assembled::Markdown(_) => OutputFormat::Markdown,
        }
    }
}

/// Shape `response` according to `format`.
///
/// JSON never decodes the page records, so it accepts any response shape.
pub fn assemble(response: &OcrResponse, format: OutputFormat) -> Result<Assembled, OcrError> {
    match format {
        OutputFormat::Json => Ok(Assembled::Json(response.raw().clone())),
        OutputFormat::Text => Ok(Assembled::Text(join_text(&response.pages()?))),
        OutputFormat::Markdown => Ok(Assembled::Markdown(join_markdown(&response.pages()?))),
    }
}

/// Join the plain text of every page, in order. Empty pages keep their slot.
pub fn join_text(pages: &[PageRecord]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Join the markdown of every page, in order, inlining each page's images.
pub fn join_markdown(pages: &[PageRecord]) -> String {
    pages
        .iter()
        .map(inline_page_images)
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Inline the images of a single page into its markdown.
///
/// Images are applied in the order the page lists them. A repeated id keeps
/// its first position and takes the data of its last occurrence.
pub fn inline_page_images(page: &PageRecord) -> String {
    let mut images: Vec<(&str, &str)> = Vec::with_capacity(page.images.len());
    for img in &page.images {
        let Some(data) = img.image_base64.as_deref() else {
            continue;
        };
        match images.iter_mut().find(|(id, _)| *id == img.id) {
            Some(entry) => entry.1 = data,
            None => images.push((img.id.as_str(), data)),
        }
    }
    replace_image_refs(&page.markdown, &images)
}

/// Replace every `![id](id)` with `![id](data)`, one `(id, data)` pair at a
/// time in slice order.
pub fn replace_image_refs(markdown: &str, images: &[(&str, &str)]) -> String {
    let mut out = markdown.to_string();
    for (id, data) in images {
        let placeholder = format!("![{id}]({id})");
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &format!("![{id}]({data})"));
        }
    }
    out
}

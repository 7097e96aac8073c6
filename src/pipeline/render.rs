//! PDF summary rendering: assembled content → a plain, readable PDF.
//!
//! The layout is deliberately naive. The content is split on blank lines
//! into paragraphs; each non-blank paragraph becomes a block of text whose
//! internal newlines are forced line breaks. Nothing is parsed: markdown
//! markup, JSON punctuation and inline image URIs are printed verbatim.
//!
//! ## Why spawn_blocking?
//!
//! Text measurement, wrapping and stream compression are CPU-bound and a
//! large response can run to hundreds of pages, so the work runs on the
//! blocking pool instead of a Tokio worker.
//!
//! ## Fonts
//!
//! With a font from [`super::fonts`] the text is drawn through a Type0 /
//! CIDFontType2 font (Identity-H, glyph ids as character codes) with a
//! ToUnicode map so the PDF stays searchable. Without one, Helvetica with
//! WinAnsiEncoding is used.

use super::fonts::{self, LoadedFont};
use super::write::{pdf_sibling_path, write_atomic};
use crate::error::OcrError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Title prefix of the summary document.
pub const TITLE_PREFIX: &str = "OCR 文本版本";

const FONT_RESOURCE: &str = "F1";

/// Page geometry and type sizes, in PDF points.
#[derive(Debug, Clone)]
pub struct SummaryLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub title_size: f32,
    pub title_leading: f32,
    /// Space below the title.
    pub title_gap: f32,
    pub body_size: f32,
    pub body_leading: f32,
    /// Space below each paragraph.
    pub paragraph_gap: f32,
}

impl Default for SummaryLayout {
    /// A4, one-inch margins, 12/14 body text.
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin: 72.0,
            title_size: 18.0,
            title_leading: 22.0,
            title_gap: 18.0,
            body_size: 12.0,
            body_leading: 14.0,
            paragraph_gap: 7.2,
        }
    }
}

/// Render `content` into a PDF summary next to `source`.
///
/// Returns the path of the written file.
pub async fn write_summary(
    source: &Path,
    content: &str,
    font_paths: &[PathBuf],
) -> Result<PathBuf, OcrError> {
    let out_path = pdf_sibling_path(source);
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = format!("{TITLE_PREFIX} - {file_name}");
    let content = content.to_string();
    let candidates = fonts::candidates(font_paths);

    let bytes = tokio::task::spawn_blocking(move || {
        let font = fonts::find_font(&candidates);
        render_summary(&title, &content, font.as_ref(), &SummaryLayout::default())
    })
    .await
    .map_err(|e| OcrError::PdfRenderFailed {
        path: out_path.clone(),
        detail: format!("render task panicked: {e}"),
    })?
    .map_err(|detail| OcrError::PdfRenderFailed {
        path: out_path.clone(),
        detail,
    })?;

    write_atomic(&out_path, &bytes).await?;
    info!("Wrote PDF summary {}", out_path.display());
    Ok(out_path)
}

/// Split content into paragraphs of lines.
///
/// Paragraphs are separated by `"\n\n"`; whitespace-only paragraphs are
/// dropped. Each remaining paragraph keeps its internal line structure.
pub fn split_paragraphs(content: &str) -> Vec<Vec<String>> {
    content
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.split('\n')
                .map(|line| line.trim_end_matches('\r').replace('\t', "    "))
                .collect()
        })
        .collect()
}

/// Render a complete PDF into memory.
pub fn render_summary(
    title: &str,
    content: &str,
    font: Option<&LoadedFont>,
    layout: &SummaryLayout,
) -> Result<Vec<u8>, String> {
    let mut typeface = match font {
        Some(f) => Typeface::embedded(f)?,
        None => Typeface::Builtin,
    };

    let mut pages = PageWriter::new(layout.clone());
    let text_width = layout.page_width - 2.0 * layout.margin;

    // Title, centred.
    for line in wrap_line(title, text_width, layout.title_size, |c| typeface.width(c)) {
        let w = typeface.text_width(&line, layout.title_size);
        let x = ((layout.page_width - w) / 2.0).max(layout.margin);
        let encoded = typeface.encode(&line);
        pages.line(x, layout.title_size, layout.title_leading, encoded);
    }
    pages.gap(layout.title_gap);

    let paragraphs = split_paragraphs(content);
    debug!("Rendering {} paragraphs", paragraphs.len());
    for paragraph in &paragraphs {
        for line in paragraph {
            for wrapped in wrap_line(line, text_width, layout.body_size, |c| typeface.width(c)) {
                let encoded = typeface.encode(&wrapped);
                pages.line(layout.margin, layout.body_size, layout.body_leading, encoded);
            }
        }
        pages.gap(layout.paragraph_gap);
    }

    build_document(title, pages.finish(), &typeface, layout)
}

/// Greedy line wrapping at `max_width` points.
///
/// Breaks at the last space when one exists, otherwise between characters
/// (CJK text has no spaces). An empty input yields one empty line so forced
/// breaks survive.
pub fn wrap_line(
    line: &str,
    max_width: f32,
    size: f32,
    width_of: impl Fn(char) -> f32,
) -> Vec<String> {
    let char_w = |c: char| width_of(c) * size / 1000.0;
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0f32;
    let mut last_space: Option<usize> = None;

    for c in line.chars() {
        let w = char_w(c);
        if width + w > max_width && !current.is_empty() {
            match last_space.filter(|&i| i > 0) {
                Some(i) => {
                    let rest = current[i + 1..].to_string();
                    current.truncate(i);
                    lines.push(std::mem::replace(&mut current, rest));
                    width = current.chars().map(char_w).sum();
                }
                None => {
                    lines.push(std::mem::take(&mut current));
                    width = 0.0;
                }
            }
            last_space = None;
            if c == ' ' && current.is_empty() {
                continue;
            }
        }
        if c == ' ' {
            last_space = Some(current.len());
        }
        current.push(c);
        width += w;
    }
    lines.push(current);
    lines
}

// ── Page assembly ────────────────────────────────────────────────────────

struct PageWriter {
    layout: SummaryLayout,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor: f32,
}

impl PageWriter {
    fn new(layout: SummaryLayout) -> Self {
        let cursor = layout.page_height - layout.margin;
        Self {
            layout,
            pages: Vec::new(),
            ops: Vec::new(),
            cursor,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.cursor = self.layout.page_height - self.layout.margin;
    }

    fn line(&mut self, x: f32, size: f32, leading: f32, text: Object) {
        if self.cursor - leading < self.layout.margin && !self.ops.is_empty() {
            self.new_page();
        }
        let baseline = self.cursor - size;
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FONT_RESOURCE.into(), Object::Real(size)]),
            Operation::new("Td", vec![Object::Real(x), Object::Real(baseline)]),
            Operation::new("Tj", vec![text]),
            Operation::new("ET", vec![]),
        ]);
        self.cursor -= leading;
    }

    fn gap(&mut self, points: f32) {
        self.cursor -= points;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

fn build_document(
    title: &str,
    pages: Vec<Vec<Operation>>,
    typeface: &Typeface<'_>,
    layout: &SummaryLayout,
) -> Result<Vec<u8>, String> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = typeface.add_to(&mut doc);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let stream = content.encode().map_err(|e| e.to_string())?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, stream));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(layout.page_width),
                Object::Real(layout.page_height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => text_string(concat!("edgequake-ocr ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| e.to_string())?;
    debug!("Rendered PDF: {} pages, {} bytes", count, buf.len());
    Ok(buf)
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::string_literal(s);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

// ── Typefaces ────────────────────────────────────────────────────────────

enum Typeface<'a> {
    /// Base-14 Helvetica, WinAnsiEncoding.
    Builtin,
    /// Embedded TrueType, Identity-H.
    Embedded {
        font: &'a LoadedFont,
        face: ttf_parser::Face<'a>,
        /// Glyph id → (width in 1/1000 em, first char mapped to it).
        used: BTreeMap<u16, (i64, char)>,
    },
}

impl<'a> Typeface<'a> {
    fn embedded(font: &'a LoadedFont) -> Result<Self, String> {
        let face = font
            .face()
            .ok_or_else(|| format!("font {} no longer parses", font.path.display()))?;
        Ok(Typeface::Embedded {
            font,
            face,
            used: BTreeMap::new(),
        })
    }

    /// Advance width of `c` in 1/1000 em.
    fn width(&self, c: char) -> f32 {
        match self {
            Typeface::Builtin => helvetica_width(winansi_byte(c)),
            Typeface::Embedded { face, .. } => glyph_width(face, glyph_id(face, c)) as f32,
        }
    }

    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.width(c)).sum::<f32>() * size / 1000.0
    }

    /// Encode `text` as a string operand, recording glyph usage.
    fn encode(&mut self, text: &str) -> Object {
        match self {
            Typeface::Builtin => Object::String(
                text.chars().map(winansi_byte).collect(),
                StringFormat::Literal,
            ),
            Typeface::Embedded { face, used, .. } => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let gid = glyph_id(face, c);
                    used.entry(gid).or_insert_with(|| (glyph_width(face, gid), c));
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                Object::String(bytes, StringFormat::Hexadecimal)
            }
        }
    }

    /// Add the font objects to `doc` and return the font dictionary id.
    fn add_to(&self, doc: &mut Document) -> ObjectId {
        match self {
            Typeface::Builtin => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
            Typeface::Embedded { font, face, used } => add_embedded_font(doc, font, face, used),
        }
    }
}

fn glyph_id(face: &ttf_parser::Face<'_>, c: char) -> u16 {
    face.glyph_index(c).map(|g| g.0).unwrap_or(0)
}

fn glyph_width(face: &ttf_parser::Face<'_>, gid: u16) -> i64 {
    let upem = face.units_per_em().max(1) as f32;
    let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0) as f32;
    (advance * 1000.0 / upem).round() as i64
}

fn add_embedded_font(
    doc: &mut Document,
    font: &LoadedFont,
    face: &ttf_parser::Face<'_>,
    used: &BTreeMap<u16, (i64, char)>,
) -> ObjectId {
    let scale = 1000.0 / face.units_per_em().max(1) as f32;
    let scaled = |v: i16| (v as f32 * scale).round() as i64;
    let bbox = face.global_bounding_box();
    let name = Object::Name(font.name.as_bytes().to_vec());

    let font_file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => font.data.len() as i64 },
        font.data.clone(),
    ));

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => name.clone(),
        "Flags" => Object::Integer(4),
        "FontBBox" => vec![
            scaled(bbox.x_min).into(),
            scaled(bbox.y_min).into(),
            scaled(bbox.x_max).into(),
            scaled(bbox.y_max).into(),
        ],
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => scaled(face.ascender()),
        "Descent" => scaled(face.descender()),
        "CapHeight" => scaled(face.capital_height().unwrap_or(face.ascender())),
        "StemV" => Object::Integer(80),
        "FontFile2" => font_file_id,
    });

    let widths: Vec<Object> = used
        .iter()
        .flat_map(|(gid, (w, _))| [Object::Integer(*gid as i64), Object::Array(vec![Object::Integer(*w)])])
        .collect();

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => name.clone(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => descriptor_id,
        "DW" => Object::Integer(1000),
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(used).into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => name,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![cid_font_id.into()],
        "ToUnicode" => to_unicode_id,
    })
}

/// CMap mapping each used glyph id back to its character.
fn to_unicode_cmap(used: &BTreeMap<u16, (i64, char)>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = used.iter().map(|(gid, (_, c))| (*gid, *c)).collect();
    // bfchar blocks hold at most 100 entries.
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{gid:04X}> <{hex}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

/// WinAnsi code for `c`; `?` when not representable.
///
/// Only the ASCII and Latin-1 ranges are mapped; they coincide with
/// WinAnsiEncoding there.
fn winansi_byte(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
        _ => b'?',
    }
}

/// Helvetica advance widths for codes 32–126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn helvetica_width(code: u8) -> f32 {
    match code {
        32..=126 => HELVETICA_WIDTHS[(code - 32) as usize] as f32,
        _ => 556.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(_: char) -> f32 {
        500.0
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let p = split_paragraphs("first\nline two\n\n   \n\nsecond");
        assert_eq!(
            p,
            vec![
                vec!["first".to_string(), "line two".to_string()],
                vec!["second".to_string()],
            ]
        );
    }

    #[test]
    fn empty_content_has_no_paragraphs() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n\n\n").is_empty());
    }

    #[test]
    fn wrap_prefers_spaces() {
        // 500/1000 em at size 10 = 5pt per char; 30pt fits 6 chars.
        let lines = wrap_line("aaa bbb ccc", 30.0, 10.0, fixed);
        assert_eq!(lines, vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn wrap_breaks_long_runs_between_chars() {
        let lines = wrap_line("中文中文中文中文", 20.0, 10.0, fixed);
        assert_eq!(lines, vec!["中文中文", "中文中文"]);
    }

    #[test]
    fn wrap_keeps_short_and_empty_lines() {
        assert_eq!(wrap_line("short", 100.0, 10.0, fixed), vec!["short"]);
        assert_eq!(wrap_line("", 100.0, 10.0, fixed), vec![""]);
    }

    #[test]
    fn winansi_degrades_non_latin() {
        assert_eq!(winansi_byte('A'), b'A');
        assert_eq!(winansi_byte('é'), 0xE9);
        assert_eq!(winansi_byte('中'), b'?');
        assert_eq!(helvetica_width(b'W'), 944.0);
        assert_eq!(helvetica_width(b'i'), 222.0);
    }

    #[test]
    fn text_string_encodes_unicode_as_utf16() {
        assert_eq!(text_string("abc"), Object::string_literal("abc"));
        match text_string("文") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0x65, 0x87]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn to_unicode_maps_glyphs() {
        let mut used = BTreeMap::new();
        used.insert(3u16, (500i64, 'A'));
        used.insert(0x1234u16, (1000i64, '中'));
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<1234> <4E2D>"));
    }

    #[test]
    fn renders_loadable_pdf_with_builtin_font() {
        let bytes = render_summary(
            "OCR 文本版本 - scan.pdf",
            "Hello world\nsecond line\n\nNext paragraph",
            None,
            &SummaryLayout::default(),
        )
        .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    /// Font dictionaries in `doc` whose `/Subtype` is `subtype`.
    fn fonts_of(doc: &Document, subtype: &[u8]) -> Vec<lopdf::Dictionary> {
        doc.objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| d.get(b"Subtype").and_then(Object::as_name).ok() == Some(subtype))
            .cloned()
            .collect()
    }

    #[test]
    fn embedded_font_lists_only_used_glyphs() {
        let Some(font) = fonts::find_font(&fonts::candidates(&[])) else {
            println!("SKIP — no embeddable TrueType font installed");
            return;
        };
        let title = "Scan";
        let content = "中文 and Latin";
        let bytes =
            render_summary(title, content, Some(&font), &SummaryLayout::default()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let type0 = fonts_of(&doc, b"Type0");
        assert_eq!(type0.len(), 1);
        assert!(type0[0].get(b"ToUnicode").is_ok());
        assert!(fonts_of(&doc, b"Type1").is_empty());

        let face = font.face().unwrap();
        let expected: std::collections::BTreeSet<i64> = title
            .chars()
            .chain(content.chars())
            .map(|c| glyph_id(&face, c) as i64)
            .collect();

        let cid = fonts_of(&doc, b"CIDFontType2");
        assert_eq!(cid.len(), 1);
        let w = cid[0].get(b"W").and_then(Object::as_array).unwrap();
        assert_eq!(w.len(), 2 * expected.len());
        let listed: std::collections::BTreeSet<i64> =
            w.iter().step_by(2).map(|o| o.as_i64().unwrap()).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn long_content_spans_multiple_pages() {
        let content: String = (0..200)
            .map(|i| format!("Paragraph number {i}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let bytes = render_summary("t", &content, None, &SummaryLayout::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[tokio::test]
    async fn write_summary_lands_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let path = write_summary(&source, "body", &[PathBuf::from("/no/font.ttf")])
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("scan_OCR文本版本.pdf"));
        assert!(Document::load(&path).is_ok());
    }
}

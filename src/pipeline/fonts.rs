//! Best-effort typeface discovery for the PDF summary.
//!
//! OCR output is frequently CJK, which the PDF base-14 fonts cannot show.
//! We try a fixed list of well-known font files and embed the first one
//! that parses as a single-face TrueType font with `glyf` outlines. Only
//! loose `.ttf` files are listed: font collections (`.ttc`, which is how
//! current macOS ships PingFang and Hiragino) and CFF-flavoured OpenType
//! files cannot be embedded as `FontFile2`, and [`load_font`] rejects them
//! when they are passed in explicitly.
//!
//! Finding nothing is not an error: rendering falls back to Helvetica and
//! characters outside Latin-1 degrade to `?`.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Well-known Unicode/CJK font files, tried in order.
pub const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    // macOS
    "/Library/Fonts/Arial Unicode.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    // Linux
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/google-droid-sans-fonts/DroidSansFallbackFull.ttf",
    "/usr/share/fonts/truetype/arphic-gkai00mp/gkai00mp.ttf",
    "/usr/share/fonts/truetype/arphic-bsmi00lp/bsmi00lp.ttf",
    "/usr/share/fonts/truetype/unifont/unifont.ttf",
    // Windows
    "C:\\Windows\\Fonts\\simhei.ttf",
    "C:\\Windows\\Fonts\\simkai.ttf",
    "C:\\Windows\\Fonts\\arialuni.ttf",
    // No CJK, but still covers Latin-extended, Greek and Cyrillic.
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

/// A font file read into memory and checked for embeddability.
#[derive(Clone)]
pub struct LoadedFont {
    pub path: PathBuf,
    pub data: Vec<u8>,
    /// PDF-safe name derived from the file name.
    pub name: String,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("path", &self.path)
            .field("bytes", &self.data.len())
            .field("name", &self.name)
            .finish()
    }
}

impl LoadedFont {
    /// Parse the font face. Succeeds for every font returned by [`load_font`].
    pub fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).ok()
    }
}

/// Candidate list: caller-supplied paths first, then the defaults.
pub fn candidates(extra: &[PathBuf]) -> Vec<PathBuf> {
    extra
        .iter()
        .cloned()
        .chain(DEFAULT_FONT_CANDIDATES.iter().map(PathBuf::from))
        .collect()
}

/// Return the first embeddable font among `candidates`.
pub fn find_font(candidates: &[PathBuf]) -> Option<LoadedFont> {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_font(path) {
            Ok(font) => {
                info!("Using font {}", path.display());
                return Some(font);
            }
            Err(reason) => warn!("Skipping font {}: {}", path.display(), reason),
        }
    }
    warn!("No Unicode font found; falling back to Helvetica. Non-Latin text will not display.");
    None
}

/// Read and validate one font file.
pub fn load_font(path: &Path) -> Result<LoadedFont, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;

    if ttf_parser::fonts_in_collection(&data).is_some() {
        return Err("font collections cannot be embedded".into());
    }

    {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| e.to_string())?;
        if face.tables().glyf.is_none() {
            return Err("no TrueType outlines (glyf table)".into());
        }
        debug!(
            "Font {}: {} glyphs, {} units/em",
            path.display(),
            face.number_of_glyphs(),
            face.units_per_em()
        );
    }

    Ok(LoadedFont {
        path: path.to_path_buf(),
        name: pdf_font_name(path),
        data,
    })
}

/// Font name restricted to characters valid in a PDF name object.
fn pdf_font_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name: String = stem.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect();
    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}

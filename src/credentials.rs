//! API key lookup and `.env` persistence.
//!
//! The key is resolved once at startup and handed to
//! [`crate::config::OcrConfigBuilder::api_key`]; nothing here keeps global
//! state. Persisting a key rewrites the `.env` file line by line: the first
//! `MISTRAL_API_KEY=` line is replaced, or a new one is appended, and every
//! other line is kept as it was.

use crate::error::OcrError;
use crate::pipeline::write::write_atomic;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable (and `.env` key) holding the Mistral API key.
pub const API_KEY_VAR: &str = "MISTRAL_API_KEY";

/// Credential file in the working directory.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Variables that are already set win.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) => {
            debug!("No .env loaded: {e}");
            None
        }
    }
}

/// First non-blank key among `explicit` and the `MISTRAL_API_KEY` variable.
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    let non_blank = |k: &str| Some(k.trim().to_string()).filter(|k| !k.is_empty());
    explicit
        .and_then(non_blank)
        .or_else(|| std::env::var(API_KEY_VAR).ok().as_deref().and_then(non_blank))
}

/// A `.env`-style file kept as raw lines.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl EnvFile {
    /// Read `path`; a missing file loads as empty.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, OcrError> {
        let path = path.into();
        let lines = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(OcrError::InvalidConfig(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self { path, lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of the first `KEY=` line, surrounding quotes removed.
    pub fn get(&self, key: &str) -> Option<&str> {
        let prefix = format!("{key}=");
        self.lines
            .iter()
            .find_map(|line| line.strip_prefix(&prefix))
            .map(|v| {
                let v = v.trim();
                v.strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                    .unwrap_or(v)
            })
    }

    /// Replace the first `KEY=` line or append one.
    pub fn set(&mut self, key: &str, value: &str) {
        let prefix = format!("{key}=");
        let entry = format!("{key}={value}");
        match self.lines.iter_mut().find(|l| l.starts_with(&prefix)) {
            Some(line) => *line = entry,
            None => self.lines.push(entry),
        }
    }

    /// File contents, one entry per line with a trailing newline.
    pub fn contents(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    pub async fn save(&self) -> Result<(), OcrError> {
        write_atomic(&self.path, self.contents().as_bytes()).await?;
        debug!("Saved {}", self.path.display());
        Ok(())
    }
}

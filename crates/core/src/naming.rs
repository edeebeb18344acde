//! Output naming strategies
//!
//! The pipeline never invents output paths itself; it asks an
//! [`OutputNaming`] implementation. Callers that process documents
//! concurrently must hand each request a strategy whose paths do not collide.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_PREFIX: &str = "masked_";
pub const DEFAULT_PAGE_EXTENSION: &str = "jpg";

const FALLBACK_NAME: &str = "upload";

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid regex"));

/// Where masked outputs are written
pub trait OutputNaming {
    /// Output path for a single image input
    fn image_output(&self, input: &Path) -> PathBuf;

    /// Output path for page `page_number` (1-based) of a PDF input
    fn page_output(&self, input: &Path, page_number: usize) -> PathBuf;
}

/// `<dir>/masked_<file name>` for images, `<dir>/masked_page_<n>.jpg` for PDF pages
#[derive(Debug, Clone)]
pub struct PrefixedNaming {
    output_dir: PathBuf,
    prefix: String,
    page_extension: String,
}

impl PrefixedNaming {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            page_extension: DEFAULT_PAGE_EXTENSION.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Raster format for PDF pages, e.g. "png"
    pub fn with_page_extension(mut self, extension: &str) -> Self {
        self.page_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl OutputNaming for PrefixedNaming {
    fn image_output(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.output_dir
            .join(format!("{}{}", self.prefix, sanitize_filename(&name)))
    }

    fn page_output(&self, _input: &Path, page_number: usize) -> PathBuf {
        self.output_dir.join(format!(
            "{}page_{}.{}",
            self.prefix, page_number, self.page_extension
        ))
    }
}

/// Reduce a file name to `[A-Za-z0-9_.-]`.
///
/// Accents are folded to ASCII and other non-ASCII characters dropped.
/// Separators become spaces, whitespace runs become `_`, anything else
/// outside the safe set is dropped and leading/trailing `.`/`_` are stripped
/// from the stem. The extension is kept, and an empty stem becomes `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");

    let (stem, extension) = match spaced.rsplit_once('.') {
        Some((stem, ext)) if is_extension(ext) => (stem, Some(ext)),
        _ => (spaced.as_str(), None),
    };

    let joined = stem.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let stem = match cleaned.trim_matches(|c| c == '.' || c == '_') {
        "" => FALLBACK_NAME,
        trimmed => trimmed,
    };

    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.to_string(),
    }
}

fn is_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

//! Pipeline errors
//!
//! Every failure is terminal for the page or document being processed.

use piimask_ocr::OcrError;
use piimask_pdf::PdfError;
use piimask_rules::RulesError;
use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, RedactError>;

/// Pipeline stage an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detect,
    Load,
    Ocr,
    Persist,
    Rasterize,
    Configure,
}

/// A file, or one page of a PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub path: PathBuf,
    /// 1-based, `None` for single images
    pub page: Option<usize>,
}

impl PageRef {
    pub fn file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            page: None,
        }
    }

    pub fn page(path: &Path, page: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            page: Some(page),
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} (page {})", self.path.display(), page),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    #[error("unsupported file type '{extension}': {}", path.display())]
    UnsupportedType { path: PathBuf, extension: String },

    #[error("cannot load image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("OCR failed on {page}: {source}")]
    Ocr {
        page: PageRef,
        #[source]
        source: OcrError,
    },

    #[error("cannot write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("PDF conversion failed for {}: {source}", path.display())]
    PdfConversion {
        path: PathBuf,
        #[source]
        source: PdfError,
    },

    #[error("invalid sensitivity policy: {0}")]
    Policy(#[from] RulesError),
}

impl RedactError {
    pub fn stage(&self) -> Stage {
        match self {
            RedactError::UnsupportedType { .. } => Stage::Detect,
            RedactError::Load { .. } => Stage::Load,
            RedactError::Ocr { .. } => Stage::Ocr,
            RedactError::Persist { .. } => Stage::Persist,
            RedactError::PdfConversion { .. } => Stage::Rasterize,
            RedactError::Policy(_) => Stage::Configure,
        }
    }

    pub(crate) fn persist(path: &Path, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        RedactError::Persist {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

//! OCR capability
//!
//! The pipeline only sees the [`OcrEngine`] trait. [`TesseractEngine`] drives
//! the `tesseract` command line tool and reports word-level boxes in pixels.

mod error;
mod tesseract;

pub use error::OcrError;
pub use tesseract::{tesseract_languages, tesseract_version, TesseractConfig, TesseractEngine};

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Word box in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// One recognized word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub bbox: BBox,
    /// 0-1, when the engine reports one
    pub confidence: Option<f32>,
    /// Position in the engine's output
    pub source_index: usize,
}

impl Token {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Text recognition over a raster image
pub trait OcrEngine: Send {
    /// Recognize words in `image`. A blank image yields an empty list, not an error.
    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<Token>, OcrError>;

    /// Engine name for logs and audit reports
    fn name(&self) -> &str;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<Token>, OcrError> {
        (**self).recognize(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//! Single page redaction
//!
//! Load -> OCR -> classify -> mask -> persist. A failing stage aborts the
//! page and nothing is written.

use image::{ImageFormat, ImageReader, RgbImage};
use piimask_ocr::{BBox, OcrEngine};
use piimask_render::{MaskStyle, Rect, Redactor};
use piimask_rules::{mask_snippet, TokenClassifier};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::error::{PageRef, RedactError, Result};

/// Per-page counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageReport {
    /// Words returned by OCR
    pub tokens: usize,
    /// Whitespace-only words, never classified
    pub blank: usize,
    /// Words the classifier flagged
    pub flagged: usize,
    /// Flagged words whose box touched the image
    pub masked: usize,
}

pub struct PagePipeline {
    ocr: Box<dyn OcrEngine>,
    classifier: Box<dyn TokenClassifier>,
    redactor: Redactor,
}

impl PagePipeline {
    pub fn new(
        ocr: Box<dyn OcrEngine>,
        classifier: Box<dyn TokenClassifier>,
        redactor: Redactor,
    ) -> Self {
        Self {
            ocr,
            classifier,
            redactor,
        }
    }

    pub fn ocr_name(&self) -> &str {
        self.ocr.name()
    }

    /// Load an image file as 8-bit RGB, format sniffed from the content
    pub fn load(path: &Path) -> Result<RgbImage> {
        let load_err = |source: image::ImageError| RedactError::Load {
            path: path.to_path_buf(),
            source,
        };

        let image = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|e| load_err(e.into()))?
            .decode()
            .map_err(load_err)?;
        Ok(image.to_rgb8())
    }

    /// Run OCR on `image` and mask every sensitive word in place.
    pub fn redact_page(
        &mut self,
        image: &mut RgbImage,
        style: MaskStyle,
        page: &PageRef,
    ) -> Result<PageReport> {
        let tokens = self.ocr.recognize(image).map_err(|source| RedactError::Ocr {
            page: page.clone(),
            source,
        })?;

        let mut report = PageReport {
            tokens: tokens.len(),
            ..PageReport::default()
        };

        let mut flagged = Vec::new();
        for token in &tokens {
            if token.is_blank() {
                report.blank += 1;
                continue;
            }
            if let Some(verdict) = self.classifier.explain(&token.text) {
                log::debug!(
                    "[Page] {} flagged \"{}\" at {:?}: {:?}",
                    page,
                    mask_snippet(&token.text),
                    token.bbox,
                    verdict
                );
                flagged.push(token.bbox);
            }
        }
        report.flagged = flagged.len();

        for bbox in flagged {
            if self.redactor.apply_mask(image, to_rect(bbox), style) {
                report.masked += 1;
            }
        }

        Ok(report)
    }

    /// Encode `image` to `dest`, format chosen by extension.
    ///
    /// The bytes go to a temp file next to `dest` which is then renamed, so a
    /// failed write leaves nothing at `dest`.
    pub fn persist(image: &RgbImage, dest: &Path) -> Result<()> {
        let format = ImageFormat::from_path(dest).map_err(|e| RedactError::persist(dest, e))?;

        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| RedactError::persist(dest, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".piimask_")
            .tempfile_in(dir)
            .map_err(|e| RedactError::persist(dest, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            image
                .write_to(&mut writer, format)
                .map_err(|e| RedactError::persist(dest, e))?;
            writer.flush().map_err(|e| RedactError::persist(dest, e))?;
        }
        tmp.persist(dest)
            .map_err(|e| RedactError::persist(dest, e.error))?;
        Ok(())
    }

    /// Redact an image file into `output`.
    pub fn run(&mut self, input: &Path, output: &Path, style: MaskStyle) -> Result<PageReport> {
        let image = Self::load(input)?;
        self.process_raster(image, &PageRef::file(input), output, style)
    }

    /// Redact an already decoded page into `output`; the buffer is dropped afterwards.
    pub fn process_raster(
        &mut self,
        mut image: RgbImage,
        page: &PageRef,
        output: &Path,
        style: MaskStyle,
    ) -> Result<PageReport> {
        let start = Instant::now();
        let report = self.redact_page(&mut image, style, page)?;
        Self::persist(&image, output)?;

        log::info!(
            "[Page] {}: {} words, {} flagged, {} masked ({}) -> {} in {} ms",
            page,
            report.tokens,
            report.flagged,
            report.masked,
            style,
            output.display(),
            start.elapsed().as_millis()
        );
        Ok(report)
    }
}

fn to_rect(bbox: BBox) -> Rect {
    Rect::new(bbox.x, bbox.y, bbox.w, bbox.h)
}

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use piimask_core::{DocumentPipeline, PagePipeline, PrefixedNaming};
use piimask_ocr::{BBox, OcrEngine, OcrError, Token};
use piimask_pdf::{PageRasters, PdfError, PdfRasterizer};
use piimask_render::Redactor;
use piimask_rules::{Classifier, TokenClassifier, Verdict};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn token(text: &str, x: i32, y: i32, w: u32, h: u32) -> Token {
    Token {
        text: text.to_string(),
        bbox: BBox { x, y, w, h },
        confidence: Some(0.9),
        source_index: 0,
    }
}

/// Every pixel distinct from black
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 200) as u8 + 20, (y % 200) as u8 + 20, 180])
    })
}

/// Shared view of what a [`ScriptedOcr`] was asked to do
#[derive(Debug, Default, Clone)]
pub struct OcrLog {
    calls: Arc<AtomicUsize>,
    widths: Arc<Mutex<Vec<u32>>>,
}

impl OcrLog {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Widths of the images passed to `recognize`, in call order
    pub fn widths(&self) -> Vec<u32> {
        self.widths.lock().unwrap().clone()
    }
}

/// OCR fake returning one scripted token list per call
pub struct ScriptedOcr {
    responses: VecDeque<Vec<Token>>,
    /// 1-based call number that fails
    fail_on: Option<usize>,
    log: OcrLog,
}

impl ScriptedOcr {
    pub fn new(responses: Vec<Vec<Token>>) -> Self {
        Self {
            responses: responses.into(),
            fail_on: None,
            log: OcrLog::default(),
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn log(&self) -> OcrLog {
        self.log.clone()
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<Token>, OcrError> {
        let call = self.log.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.widths.lock().unwrap().push(image.width());

        if self.fail_on == Some(call) {
            return Err(OcrError::EngineFailed {
                status: "exit status: 1".to_string(),
                stderr: "Error opening data file eng.traineddata".to_string(),
            });
        }
        Ok(self.responses.pop_front().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// PDF fake yielding prepared rasters, optionally failing at one page
pub struct FakeRasterizer {
    pages: Vec<RgbImage>,
    /// 1-based page number that fails to render
    fail_at: Option<usize>,
}

impl FakeRasterizer {
    pub fn new(pages: Vec<RgbImage>) -> Self {
        Self { pages, fail_at: None }
    }

    pub fn failing_at(mut self, page: usize) -> Self {
        self.fail_at = Some(page);
        self
    }
}

impl PdfRasterizer for FakeRasterizer {
    fn rasterize<'a>(&'a self, _pdf_path: &Path, _dpi: u32) -> Result<PageRasters<'a>, PdfError> {
        let fail_at = self.fail_at;
        Ok(Box::new(self.pages.iter().enumerate().map(move |(index, page)| {
            if fail_at == Some(index + 1) {
                Err(PdfError::Render {
                    page: index + 1,
                    message: "damaged content stream".to_string(),
                })
            } else {
                Ok(page.clone())
            }
        })))
    }
}

/// Rasterizer for a PDF that cannot be opened
pub struct BrokenRasterizer;

impl PdfRasterizer for BrokenRasterizer {
    fn rasterize<'a>(&'a self, pdf_path: &Path, _dpi: u32) -> Result<PageRasters<'a>, PdfError> {
        Err(PdfError::Open {
            path: pdf_path.to_path_buf(),
            message: "not a PDF".to_string(),
        })
    }
}

/// Classifier that panics when handed whitespace-only text
pub struct StrictClassifier {
    pub calls: Arc<AtomicUsize>,
}

impl TokenClassifier for StrictClassifier {
    fn explain(&self, text: &str) -> Option<Verdict> {
        assert!(!text.trim().is_empty(), "blank token reached the classifier");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Classifier::builtin().explain(text)
    }
}

pub fn page_pipeline(ocr: ScriptedOcr) -> PagePipeline {
    PagePipeline::new(
        Box::new(ocr),
        Box::new(Classifier::builtin()),
        Redactor::default(),
    )
}

pub fn document_pipeline(
    ocr: ScriptedOcr,
    rasterizer: impl PdfRasterizer + 'static,
    output_dir: &Path,
) -> DocumentPipeline {
    DocumentPipeline::new(
        page_pipeline(ocr),
        Box::new(rasterizer),
        Box::new(PrefixedNaming::new(output_dir)),
    )
}

/// Regular files directly under `dir`, sorted; empty when `dir` does not exist
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

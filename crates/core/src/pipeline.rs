//! Document pipeline: dispatch by file type, then one page pipeline run per page

use piimask_ocr::OcrEngine;
use piimask_pdf::{PdfRasterizer, PdfiumRasterizer, DEFAULT_DPI};
use piimask_render::{MaskStyle, Redactor};
use piimask_rules::Classifier;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::document::DocumentKind;
use crate::error::{PageRef, RedactError, Result};
use crate::naming::OutputNaming;
use crate::page::{PagePipeline, PageReport};

/// Paths written for one input document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingResult {
    Image(PathBuf),
    /// One output per PDF page, in page order
    Pages(Vec<PathBuf>),
}

impl ProcessingResult {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            ProcessingResult::Image(path) => std::slice::from_ref(path),
            ProcessingResult::Pages(paths) => paths,
        }
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            ProcessingResult::Image(path) => vec![path],
            ProcessingResult::Pages(paths) => paths,
        }
    }
}

pub struct DocumentPipeline {
    page: PagePipeline,
    rasterizer: Box<dyn PdfRasterizer>,
    naming: Box<dyn OutputNaming>,
    dpi: u32,
    last_reports: Vec<PageReport>,
}

impl DocumentPipeline {
    pub fn new(
        page: PagePipeline,
        rasterizer: Box<dyn PdfRasterizer>,
        naming: Box<dyn OutputNaming>,
    ) -> Self {
        Self {
            page,
            rasterizer,
            naming,
            dpi: DEFAULT_DPI,
            last_reports: Vec::new(),
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Build a pipeline from configuration.
    ///
    /// Fails only when the sensitivity policy does not compile; pdfium is not
    /// bound until the first PDF is processed.
    pub fn from_config(
        config: &PipelineConfig,
        ocr: Box<dyn OcrEngine>,
        naming: Box<dyn OutputNaming>,
    ) -> Result<Self> {
        let classifier = Classifier::new(&config.policy)?;
        let page = PagePipeline::new(ocr, Box::new(classifier), Redactor::new(config.blur_kernel));
        let rasterizer = PdfiumRasterizer::new(config.pdfium_library_path.clone());
        Ok(Self::new(page, Box::new(rasterizer), naming).with_dpi(config.pdf_dpi))
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn ocr_name(&self) -> &str {
        self.page.ocr_name()
    }

    /// Page counters from the last successful [`process`](Self::process) call
    pub fn last_reports(&self) -> &[PageReport] {
        &self.last_reports
    }

    /// Redact `input` and return the written output paths.
    pub fn process(&mut self, input: &Path, style: MaskStyle) -> Result<ProcessingResult> {
        let start = Instant::now();
        self.last_reports.clear();

        let kind = DocumentKind::from_path(input)?;
        log::info!("[Pipeline] {} as {:?}, style {}", input.display(), kind, style);

        let result = match kind {
            DocumentKind::Image => self.process_image(input, style)?,
            DocumentKind::Pdf => self.process_pdf(input, style)?,
        };

        log::info!(
            "[Pipeline] {} done: {} output(s) in {} ms",
            input.display(),
            result.paths().len(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }

    fn process_image(&mut self, input: &Path, style: MaskStyle) -> Result<ProcessingResult> {
        let output = self.naming.image_output(input);
        let report = self.page.run(input, &output, style)?;
        self.last_reports.push(report);
        Ok(ProcessingResult::Image(output))
    }

    fn process_pdf(&mut self, input: &Path, style: MaskStyle) -> Result<ProcessingResult> {
        let conversion = |source| RedactError::PdfConversion {
            path: input.to_path_buf(),
            source,
        };

        let pages = self.rasterizer.rasterize(input, self.dpi).map_err(conversion)?;
        let page_pipeline = &mut self.page;
        let naming = &self.naming;

        let mut written = Vec::new();
        let mut reports = Vec::new();
        for (index, raster) in pages.enumerate() {
            let page_number = index + 1;
            let output = naming.page_output(input, page_number);

            let outcome = raster.map_err(conversion).and_then(|image| {
                page_pipeline.process_raster(
                    image,
                    &PageRef::page(input, page_number),
                    &output,
                    style,
                )
            });

            match outcome {
                Ok(report) => {
                    written.push(output);
                    reports.push(report);
                }
                Err(err) => {
                    log::warn!(
                        "[Pipeline] {} failed at page {}, removing {} earlier output(s)",
                        input.display(),
                        page_number,
                        written.len()
                    );
                    discard_outputs(&written);
                    return Err(err);
                }
            }
        }

        self.last_reports = reports;
        Ok(ProcessingResult::Pages(written))
    }
}

fn discard_outputs(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("[Pipeline] cannot remove {}: {}", path.display(), e);
        }
    }
}

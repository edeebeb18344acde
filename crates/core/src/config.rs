//! Pipeline configuration

use piimask_ocr::TesseractConfig;
use piimask_pdf::DEFAULT_DPI;
use piimask_render::DEFAULT_BLUR_KERNEL;
use piimask_rules::SensitivityPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a pipeline needs at construction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub tesseract: TesseractConfig,
    /// Rasterization resolution for PDF pages
    pub pdf_dpi: u32,
    /// Gaussian kernel edge for blur masks
    pub blur_kernel: u32,
    pub policy: SensitivityPolicy,
    /// pdfium shared library, searched for when unset
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tesseract: TesseractConfig::default(),
            pdf_dpi: DEFAULT_DPI,
            blur_kernel: DEFAULT_BLUR_KERNEL,
            policy: SensitivityPolicy::default(),
            pdfium_library_path: None,
        }
    }
}

//! PDF rasterization
//!
//! Pages are rendered lazily, one per iterator step, so only the page being
//! redacted is held in memory.

use image::RgbImage;
use once_cell::unsync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Resolution used for redaction rasters
pub const DEFAULT_DPI: u32 = 300;

/// PDF user space units per inch
const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("pdfium library unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("cannot open PDF '{}': {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("rendering page {page} failed: {message}")]
    Render { page: usize, message: String },
}

/// Rendered pages, in document order
pub type PageRasters<'a> = Box<dyn Iterator<Item = Result<RgbImage, PdfError>> + 'a>;

/// PDF to page images
pub trait PdfRasterizer {
    /// Open `pdf_path` and return its pages rendered at `dpi`.
    fn rasterize<'a>(&'a self, pdf_path: &Path, dpi: u32) -> Result<PageRasters<'a>, PdfError>;
}

/// Rasterizer backed by the pdfium library
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
    pdfium: OnceCell<Pdfium>,
}

impl PdfiumRasterizer {
    /// With `library_path` set only that location is tried; otherwise the
    /// executable-relative search paths and then the system library.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self {
            library_path,
            pdfium: OnceCell::new(),
        }
    }

    fn pdfium(&self) -> Result<&Pdfium, PdfError> {
        self.pdfium.get_or_try_init(|| match &self.library_path {
            Some(path) => bind_at(path),
            None => bind_pdfium(),
        })
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PdfRasterizer for PdfiumRasterizer {
    fn rasterize<'a>(&'a self, pdf_path: &Path, dpi: u32) -> Result<PageRasters<'a>, PdfError> {
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| PdfError::Open {
                path: pdf_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let count = document.pages().len();
        log::info!("[Pdf] {}: {} pages at {} DPI", pdf_path.display(), count, dpi);

        Ok(Box::new(PdfiumPages {
            document,
            next: 0,
            count,
            dpi,
        }))
    }
}

struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
    next: PdfPageIndex,
    count: PdfPageIndex,
    dpi: u32,
}

impl PdfiumPages<'_> {
    fn render(&self, index: PdfPageIndex) -> Result<RgbImage, PdfError> {
        let start = Instant::now();
        let page_number = index as usize + 1;
        let render_err = |e: PdfiumError| PdfError::Render {
            page: page_number,
            message: e.to_string(),
        };

        let page = self.document.pages().get(index).map_err(render_err)?;
        let (width, height) = target_size(page.width().value, page.height().value, self.dpi);

        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);
        let bitmap = page.render_with_config(&render_config).map_err(render_err)?;
        let image = bitmap.as_image().to_rgb8();

        log::info!(
            "[Pdf] page {}: {}x{} px in {} ms",
            page_number,
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }
}

impl Iterator for PdfiumPages<'_> {
    type Item = Result<RgbImage, PdfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.render(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

/// Pixel size of a page of `width_pt` x `height_pt` points at `dpi`
pub fn target_size(width_pt: f32, height_pt: f32, dpi: u32) -> (i32, i32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    (
        (width_pt * scale).round() as i32,
        (height_pt * scale).round() as i32,
    )
}

/// Library search paths, next to the executable first
fn pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());

            #[cfg(target_os = "macos")]
            {
                if let Some(contents_dir) = exe_dir.parent() {
                    paths.push(contents_dir.join("Resources").join("libs"));
                }
            }
        }
    }

    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));
    paths
}

fn bind_at(path: &Path) -> Result<Pdfium, PdfError> {
    let lib_path = if path.is_dir() {
        PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(path))
    } else {
        path.to_path_buf()
    };

    Pdfium::bind_to_library(&lib_path)
        .map(|bindings| {
            log::info!("[Pdf] pdfium loaded from {:?}", lib_path);
            Pdfium::new(bindings)
        })
        .map_err(|e| PdfError::LibraryUnavailable(format!("{}: {}", lib_path.display(), e)))
}

fn bind_pdfium() -> Result<Pdfium, PdfError> {
    for path in pdfium_search_paths() {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(&path);
        log::debug!("[Pdf] trying pdfium at {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::info!("[Pdf] pdfium loaded from {:?}", path);
            return Ok(Pdfium::new(bindings));
        }
    }

    log::debug!("[Pdf] trying system pdfium");
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| PdfError::LibraryUnavailable(e.to_string()))
}

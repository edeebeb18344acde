//! PII redaction pipeline.
//!
//! [`DocumentPipeline`] takes an image or PDF path, runs OCR on every page,
//! masks the words the sensitivity classifier flags and writes the masked
//! pages through an [`OutputNaming`] strategy.

pub mod config;
pub mod document;
pub mod error;
pub mod naming;
pub mod page;
pub mod pipeline;

pub use config::PipelineConfig;
pub use document::{DocumentKind, IMAGE_EXTENSIONS};
pub use error::{PageRef, RedactError, Result, Stage};
pub use naming::{sanitize_filename, OutputNaming, PrefixedNaming};
pub use page::{PagePipeline, PageReport};
pub use pipeline::{DocumentPipeline, ProcessingResult};

pub use piimask_render::MaskStyle;

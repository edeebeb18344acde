//! OCR error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine '{binary}' unavailable: {source}")]
    Unavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine failed ({status}): {stderr}")]
    EngineFailed { status: String, stderr: String },

    #[error("image processing failed: {0}")]
    ImageProcess(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Post-processing verification checks.
//!
//! Masked outputs are read back and run through OCR again. Any word the
//! classifier still flags is reported as a residual.

use piimask_ocr::{BBox, OcrEngine, OcrError};
use piimask_rules::{mask_snippet, TokenClassifier};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("cannot read output {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("verification OCR failed on {}: {source}", path.display())]
    Ocr {
        path: PathBuf,
        #[source]
        source: OcrError,
    },
}

/// Sensitive text still legible in an output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Residual {
    pub path: PathBuf,
    /// Recognized text with its interior masked
    pub snippet: String,
    pub bbox: BBox,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyResult {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub residual: Vec<Residual>,
}

/// Re-run OCR over every output and collect what the classifier still flags.
pub fn verify_outputs<P: AsRef<Path>>(
    paths: &[P],
    ocr: &mut dyn OcrEngine,
    classifier: &dyn TokenClassifier,
) -> Result<VerifyResult, VerifyError> {
    let start = Instant::now();
    let mut residual = Vec::new();

    for path in paths {
        residual.extend(verify_output(path.as_ref(), ocr, classifier)?);
    }

    let warnings: Vec<String> = residual
        .iter()
        .map(|r| {
            format!(
                "{}: sensitive text \"{}\" still readable at ({}, {}) {}x{}",
                r.path.display(),
                r.snippet,
                r.bbox.x,
                r.bbox.y,
                r.bbox.w,
                r.bbox.h
            )
        })
        .collect();

    log::info!(
        "[Verify] {} output(s), {} residual(s) in {} ms",
        paths.len(),
        residual.len(),
        start.elapsed().as_millis()
    );
    for warning in &warnings {
        log::warn!("[Verify] {}", warning);
    }

    Ok(VerifyResult {
        ok: residual.is_empty(),
        warnings,
        residual,
    })
}

fn verify_output(
    path: &Path,
    ocr: &mut dyn OcrEngine,
    classifier: &dyn TokenClassifier,
) -> Result<Vec<Residual>, VerifyError> {
    let image = image::open(path)
        .map_err(|source| VerifyError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();

    let tokens = ocr.recognize(&image).map_err(|source| VerifyError::Ocr {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(tokens
        .into_iter()
        .filter(|t| !t.is_blank() && classifier.classify(&t.text))
        .map(|t| Residual {
            path: path.to_path_buf(),
            snippet: mask_snippet(&t.text),
            bbox: t.bbox,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use piimask_ocr::Token;
    use piimask_rules::Classifier;

    struct FixedOcr {
        tokens: Vec<Token>,
        calls: usize,
    }

    impl OcrEngine for FixedOcr {
        fn recognize(&mut self, _image: &RgbImage) -> Result<Vec<Token>, OcrError> {
            self.calls += 1;
            Ok(self.tokens.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn token(text: &str) -> Token {
        Token {
            text: text.to_string(),
            bbox: BBox { x: 1, y: 2, w: 3, h: 4 },
            confidence: None,
            source_index: 0,
        }
    }

    fn write_output(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbImage::new(8, 8).save(&path).unwrap();
        path
    }

    #[test]
    fn test_clean_outputs_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let outputs = vec![write_output(tmp.path(), "a.png"), write_output(tmp.path(), "b.png")];
        let mut ocr = FixedOcr {
            tokens: vec![token("Invoice"), token("  "), token("total")],
            calls: 0,
        };

        let result = verify_outputs(&outputs, &mut ocr, Classifier::builtin()).unwrap();

        assert!(result.ok);
        assert!(result.warnings.is_empty());
        assert_eq!(ocr.calls, 2);
    }

    #[test]
    fn test_residual_pii_is_reported_masked() {
        let tmp = tempfile::tempdir().unwrap();
        let outputs = vec![write_output(tmp.path(), "page.png")];
        let mut ocr = FixedOcr {
            tokens: vec![token("hello"), token("123-45-6789")],
            calls: 0,
        };

        let result = verify_outputs(&outputs, &mut ocr, Classifier::builtin()).unwrap();

        assert!(!result.ok);
        assert_eq!(result.residual.len(), 1);
        assert_eq!(result.residual[0].bbox, BBox { x: 1, y: 2, w: 3, h: 4 });
        assert!(!result.residual[0].snippet.contains("45"));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("page.png"));
        assert!(!result.warnings[0].contains("123-45-6789"));
    }

    #[test]
    fn test_unreadable_output_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone.png");
        let mut ocr = FixedOcr {
            tokens: vec![],
            calls: 0,
        };

        let err = verify_outputs(&[missing], &mut ocr, Classifier::builtin()).unwrap_err();
        assert!(matches!(err, VerifyError::Read { .. }));
        assert_eq!(ocr.calls, 0);
    }
}

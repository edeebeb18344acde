//! Document kind detection
//!
//! Decided from the file extension alone; the file itself is not opened.

use crate::error::{RedactError, Result};
use std::path::Path;

/// Raster extensions accepted as single-page input
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Ok(DocumentKind::Image),
            _ => Err(RedactError::UnsupportedType {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a.pdf")).unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_path(Path::new("A.PDF")).unwrap(), DocumentKind::Pdf);
        for name in ["a.jpg", "a.JPEG", "dir/a.png", "scan.TiFf"] {
            assert_eq!(DocumentKind::from_path(Path::new(name)).unwrap(), DocumentKind::Image);
        }
    }

    #[test]
    fn test_unsupported_extensions() {
        for name in ["doc.txt", "image.gif", "archive.tar.gz", "no_extension", "pdf"] {
            let err = DocumentKind::from_path(Path::new(name)).unwrap_err();
            assert_eq!(err.stage(), Stage::Detect, "{}", name);
        }
    }

    #[test]
    fn test_does_not_touch_filesystem() {
        // the file does not exist; detection still succeeds
        assert!(DocumentKind::from_path(Path::new("/nonexistent/dir/scan.png")).is_ok());
    }
}

//! Zip packaging of masked outputs

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("output has no file name: {0}")]
    NoFileName(String),
}

/// Write every file in `paths` into a deflate archive at `dest`, entries named by file name.
pub fn write_zip<P: AsRef<Path>>(paths: &[P], dest: &Path) -> Result<(), PackageError> {
    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PackageError::NoFileName(path.display().to_string()))?;

        zip.start_file(name, options)?;
        let mut file = File::open(path)?;
        io::copy(&mut file, &mut zip)?;
    }

    zip.finish()?;
    log::info!("[Package] {} file(s) -> {}", paths.len(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_zip_contains_every_output() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("masked_page_1.jpg");
        let second = tmp.path().join("masked_page_2.jpg");
        fs::write(&first, b"page one").unwrap();
        fs::write(&second, b"page two").unwrap();
        let dest = tmp.path().join("bundle").join("masked_pages.zip");

        write_zip(&[first, second], &dest).unwrap();

        let mut archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_name("masked_page_2.jpg").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "page two");
    }

    #[test]
    fn test_missing_input_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = write_zip(&[tmp.path().join("gone.jpg")], &tmp.path().join("out.zip")).unwrap_err();
        assert!(matches!(err, PackageError::Io(_)));
    }
}

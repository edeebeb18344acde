//! Tesseract OCR engine (CLI wrapper)

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Instant;

use crate::{BBox, OcrEngine, OcrError, Token};

const DEFAULT_BINARY: &str = "tesseract";
const DEFAULT_LANG: &str = "eng";
const DEFAULT_PSM: u8 = 3;
const DEFAULT_OEM: u8 = 3;

/// Word rows in Tesseract's TSV output
const TSV_WORD_LEVEL: i32 = 5;
/// First columns of the header row Tesseract prints before any data
const TSV_HEADER_PREFIX: &str = "level\tpage_num";

/// Tesseract settings, supplied when the pipeline is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TesseractConfig {
    /// Executable path, `tesseract` from PATH when unset
    pub binary_path: Option<String>,
    /// Exported as TESSDATA_PREFIX
    pub tessdata_path: Option<String>,
    /// Language packs, e.g. "eng" or "eng+deu"
    pub lang: Option<String>,
    /// Page segmentation mode (0-13)
    pub psm: Option<u8>,
    /// OCR engine mode (0-3)
    pub oem: Option<u8>,
}

impl TesseractConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or(DEFAULT_BINARY)
    }

    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or(DEFAULT_LANG)
    }

    pub fn psm_or_default(&self) -> u8 {
        self.psm.unwrap_or(DEFAULT_PSM)
    }

    pub fn oem_or_default(&self) -> u8 {
        self.oem.unwrap_or(DEFAULT_OEM)
    }
}

/// Tesseract OCR engine
pub struct TesseractEngine {
    config: TesseractConfig,
    version: String,
}

impl TesseractEngine {
    /// Create the engine, checking that the binary runs.
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let version = tesseract_version(config.binary_or_default())?;
        log::info!("[OCR] tesseract {} at {}", version, config.binary_or_default());
        Ok(Self { config, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    fn command_args(&self, image_path: &Path) -> Vec<OsString> {
        vec![
            image_path.as_os_str().to_os_string(),
            "stdout".into(),
            "-l".into(),
            self.config.lang_or_default().into(),
            "--psm".into(),
            self.config.psm_or_default().to_string().into(),
            "--oem".into(),
            self.config.oem_or_default().to_string().into(),
            "tsv".into(),
        ]
    }

    fn recognize_file(&self, image_path: &Path) -> Result<Vec<Token>, OcrError> {
        let binary = self.config.binary_or_default();
        let mut cmd = Command::new(binary);
        cmd.args(self.command_args(image_path));
        if let Some(tessdata) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata);
        }

        log::debug!(
            "[OCR] run: {} {} -l {} --psm {} --oem {} tsv",
            binary,
            image_path.display(),
            self.config.lang_or_default(),
            self.config.psm_or_default(),
            self.config.oem_or_default()
        );

        let output = run(&mut cmd, binary)?;
        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&mut self, image: &RgbImage) -> Result<Vec<Token>, OcrError> {
        let start = Instant::now();

        let input = tempfile::Builder::new()
            .prefix("piimask_ocr_")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::ImageProcess(format!("writing OCR input failed: {}", e)))?;

        let tokens = self.recognize_file(input.path())?;

        log::info!(
            "[OCR] {}x{} image: {} words in {} ms",
            image.width(),
            image.height(),
            tokens.len(),
            start.elapsed().as_millis()
        );
        Ok(tokens)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

fn run(cmd: &mut Command, binary: &str) -> Result<Output, OcrError> {
    let output = cmd.output().map_err(|source| OcrError::Unavailable {
        binary: binary.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(OcrError::EngineFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Parse Tesseract TSV output
///
/// Columns:
/// level page_num block_num par_num line_num word_num left top width height conf text
///
/// Only word rows are kept. Blank words are kept too; callers decide what to skip.
/// Output without the header row is an engine failure, not an empty page.
fn parse_tsv(tsv: &str) -> Result<Vec<Token>, OcrError> {
    let mut lines = tsv.lines();
    let header = lines.next().unwrap_or("");
    if !header.starts_with(TSV_HEADER_PREFIX) {
        return Err(OcrError::EngineFailed {
            status: "exit status: 0".to_string(),
            stderr: format!("unexpected TSV output: {:?}", truncate(header, 80)),
        });
    }

    let mut tokens = Vec::new();
    for line in lines {
        let cols: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        if cols.len() < 11 {
            continue;
        }

        let level: i32 = cols[0].parse().unwrap_or(-1);
        if level != TSV_WORD_LEVEL {
            continue;
        }

        let geometry = (
            cols[6].parse::<i32>(),
            cols[7].parse::<i32>(),
            cols[8].parse::<u32>(),
            cols[9].parse::<u32>(),
        );
        let (Ok(x), Ok(y), Ok(w), Ok(h)) = geometry else {
            log::debug!("[OCR] skipping malformed TSV row: {}", line);
            continue;
        };

        let confidence = cols[10]
            .parse::<f32>()
            .ok()
            .filter(|c| *c >= 0.0)
            .map(|c| c / 100.0);

        tokens.push(Token {
            text: cols.get(11).copied().unwrap_or("").to_string(),
            bbox: BBox { x, y, w, h },
            confidence,
            source_index: tokens.len(),
        });
    }

    Ok(tokens)
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Installed Tesseract version
pub fn tesseract_version(binary_path: &str) -> Result<String, OcrError> {
    let output = run(Command::new(binary_path).arg("--version"), binary_path)?;

    // older builds print the banner on stderr
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(parse_version(&combined).unwrap_or_else(|| "unknown".to_string()))
}

fn parse_version(banner: &str) -> Option<String> {
    banner
        .lines()
        .find(|line| line.contains("tesseract"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}

/// Language packs Tesseract can load
pub fn tesseract_languages(
    binary_path: &str,
    tessdata_path: Option<&str>,
) -> Result<Vec<String>, OcrError> {
    let mut cmd = Command::new(binary_path);
    cmd.arg("--list-langs");
    if let Some(path) = tessdata_path {
        cmd.env("TESSDATA_PREFIX", path);
    }

    let output = run(&mut cmd, binary_path)?;
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(parse_language_list(&combined))
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.contains("List of available languages"))
        .skip(1)
        .filter(|line| !line.is_empty() && !line.contains(':'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_word_level() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t1000\t800\t-1\t\n\
             5\t1\t1\t1\t1\t1\t100\t200\t50\t20\t95.5\tSSN:\n\
             5\t1\t1\t1\t1\t2\t160\t200\t120\t20\t92.3\t123-45-6789\n\
             5\t1\t1\t1\t2\t1\t100\t250\t10\t20\t88.0\t \n",
            HEADER
        );

        let tokens = parse_tsv(&tsv).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "SSN:");
        assert_eq!(tokens[1].text, "123-45-6789");
        assert_eq!(tokens[1].bbox, BBox { x: 160, y: 200, w: 120, h: 20 });
        assert_eq!(tokens[1].source_index, 1);
        assert!((tokens[0].confidence.unwrap() - 0.955).abs() < 0.001);
        assert!(tokens[2].is_blank());
    }

    #[test]
    fn test_parse_tsv_skips_malformed_rows() {
        let tsv = format!("{}\n5\t1\t1\t1\t1\t1\tx\t0\t10\t10\t90\tword\n5\t1\t1\n", HEADER);
        assert!(parse_tsv(&tsv).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tsv_negative_confidence_is_none() {
        let tsv = format!("{}\n5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tword\n", HEADER);
        let tokens = parse_tsv(&tsv).unwrap();
        assert_eq!(tokens[0].confidence, None);
    }

    #[test]
    fn test_parse_tsv_header_only_is_empty_page() {
        assert!(parse_tsv(HEADER).unwrap().is_empty());
        assert!(parse_tsv(&format!("{}\r\n", HEADER)).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tsv_without_header_is_engine_failure() {
        for output in ["", "\n", "Warning: Invalid resolution 0 dpi\n", "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t90\tword\n"] {
            let err = parse_tsv(output).unwrap_err();
            assert!(matches!(err, OcrError::EngineFailed { .. }), "{:?}", output);
        }
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("tesseract 5.3.0\n leptonica-1.82.0\n").as_deref(),
            Some("5.3.0")
        );
        assert_eq!(parse_version("tesseract v4.1.1").as_deref(), Some("4.1.1"));
        assert_eq!(parse_version("garbage"), None);
    }

    #[test]
    fn test_parse_language_list() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\ndeu\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "osd", "deu"]);
    }

    #[test]
    fn test_config_defaults() {
        let config = TesseractConfig::default();
        assert_eq!(config.binary_or_default(), "tesseract");
        assert_eq!(config.lang_or_default(), "eng");
        assert_eq!(config.psm_or_default(), 3);
        assert_eq!(config.oem_or_default(), 3);

        let parsed: TesseractConfig =
            serde_json::from_str(r#"{"binaryPath": "/opt/tess/bin/tesseract", "psm": 6}"#).unwrap();
        assert_eq!(parsed.binary_or_default(), "/opt/tess/bin/tesseract");
        assert_eq!(parsed.psm_or_default(), 6);
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let config = TesseractConfig {
            binary_path: Some("/nonexistent/piimask/tesseract".to_string()),
            ..TesseractConfig::default()
        };
        match TesseractEngine::new(config) {
            Err(OcrError::Unavailable { binary, .. }) => {
                assert_eq!(binary, "/nonexistent/piimask/tesseract")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("engine should not start"),
        }
    }
}

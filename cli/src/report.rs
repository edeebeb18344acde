//! Audit report written next to masked outputs

use piimask_core::PageReport;
use piimask_render::MaskStyle;
use piimask_verify::VerifyResult;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEntry {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub tool_version: String,
    pub input: PathBuf,
    pub style: MaskStyle,
    pub ocr_engine: String,
    pub outputs: Vec<OutputEntry>,
    pub pages: Vec<PageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerifyResult>,
}

impl AuditReport {
    /// Hash every output and assemble the report
    pub fn build<P: AsRef<Path>>(
        input: &Path,
        style: MaskStyle,
        ocr_engine: &str,
        outputs: &[P],
        pages: &[PageReport],
        verification: Option<VerifyResult>,
    ) -> io::Result<Self> {
        let outputs = outputs
            .iter()
            .map(|p| output_entry(p.as_ref()))
            .collect::<io::Result<Vec<_>>>()?;

        Ok(Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            input: input.to_path_buf(),
            style,
            ocr_engine: ocr_engine.to_string(),
            outputs,
            pages: pages.to_vec(),
            verification,
        })
    }

    pub fn write(&self, dest: &Path) -> anyhow::Result<()> {
        if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(dest, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn output_entry(path: &Path) -> io::Result<OutputEntry> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher)?;
    Ok(OutputEntry {
        path: path.to_path_buf(),
        sha256: hex::encode(hasher.finalize()),
        bytes,
    })
}

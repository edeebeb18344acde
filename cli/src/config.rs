use piimask_core::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    /// Where masked files are written unless `--output-dir` is given
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the config file; defaults when no path is given or the file is absent.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    if !path.exists() {
        log::debug!("config {} not found, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let raw = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, raw).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_means_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(Some(tmp.path().join("absent.json").as_path())).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(load_config(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("piimask.json");

        let mut config = AppConfig::default();
        config.output_dir = PathBuf::from("static/output");
        config.pipeline.pdf_dpi = 150;
        config.pipeline.policy.keyword_fallback = false;
        save_config(&path, &config).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"outputDir\""));
        assert!(raw.contains("\"keywordFallback\": false"));
        assert_eq!(load_config(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("piimask.json");
        fs::write(&path, r#"{"pipeline": {"blurKernel": 31}}"#).unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.pipeline.blur_kernel, 31);
        assert_eq!(config.pipeline.pdf_dpi, 300);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("piimask.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("piimask.json"));
    }
}

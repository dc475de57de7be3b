//! Run configuration loaded from a JSON file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root directory the per-URL download directories live under.
    pub data_dir: PathBuf,
    /// Operator tag; may be overridden on the command line.
    #[serde(default)]
    pub bike_sys: Option<String>,
    /// Year-selection expression (see [`crate::years::parse_years`]).
    /// Defaults to "-", the full supported range.
    #[serde(default)]
    pub years: Option<String>,
    /// Rows per processing chunk; whole files when absent.
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn minimal_config_defaults_optionals() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"data_dir": "/tmp/trips"}"#).unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/trips"));
        assert!(cfg.bike_sys.is_none());
        assert!(cfg.years.is_none());
        assert!(cfg.chunk_size.is_none());
    }

    #[test]
    fn full_config_parses() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"data_dir": "data", "bike_sys": "bixi", "years": "2020-2021", "chunk_size": 50000}"#,
        )
        .unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.bike_sys.as_deref(), Some("bixi"));
        assert_eq!(cfg.years.as_deref(), Some("2020-2021"));
        assert_eq!(cfg.chunk_size, Some(50000));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/config.json")).is_err());
    }
}

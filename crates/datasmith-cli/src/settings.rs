use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use datasmith_generate::ExportFormat;

pub const SETTINGS_FILE: &str = "datasmith.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("toml error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Defaults for `datasmith generate`; command-line flags win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub out_dir: PathBuf,
    pub format: ExportFormat,
    pub boundary: bool,
    pub nulls: bool,
    pub invalid: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("runs"),
            format: ExportFormat::Csv,
            boundary: false,
            nulls: false,
            invalid: false,
        }
    }
}

/// Load `explicit` when given, else `datasmith.toml` from the working
/// directory when present, else defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(SETTINGS_FILE);
            if !path.exists() {
                return Ok(Settings::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
        path: path.clone(),
        source,
    })?;
    parse_settings(&content).map_err(|source| SettingsError::Toml { path, source })
}

pub fn parse_settings(content: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(parse_settings("").unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let settings = parse_settings("format = \"sql\"\nnulls = true\nout_dir = \"out\"\n").unwrap();
        assert_eq!(settings.format, ExportFormat::Sql);
        assert!(settings.nulls);
        assert!(!settings.boundary);
        assert_eq!(settings.out_dir, PathBuf::from("out"));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(parse_settings("format = \"xml\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("datasmith_{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(load_settings(Some(&path)), Err(SettingsError::Io { .. })));
    }
}

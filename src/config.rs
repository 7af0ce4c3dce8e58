//! User configuration, read from `config.toml` under the platform config directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::export::{DEFAULT_FILE_STEM, DEFAULT_PNG_SIZE};
use crate::style::{ErrorCorrection, HexColor, QrStyle, DEFAULT_LOGO_SIZE, LOGO_SIZE_RANGE};

/// Largest accepted PNG export side, in pixels.
pub const MAX_PNG_SIZE: u32 = 4096;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub defaults: StyleDefaults,
    pub export: ExportConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Where records, profiles, accounts and the session live.
    pub data_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// The configured directory, else `dirs::data_dir()/qrcraft`, else `./.qrcraft`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("qrcraft"))
                .unwrap_or_else(|| PathBuf::from(".qrcraft"))
        })
    }
}

/// Style a fresh creation form starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub fg_color: HexColor,
    pub bg_color: HexColor,
    pub error_correction: ErrorCorrection,
    pub logo_size: u8,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        let style = QrStyle::default();
        Self {
            fg_color: style.fg_color,
            bg_color: style.bg_color,
            error_correction: style.error_correction,
            logo_size: DEFAULT_LOGO_SIZE,
        }
    }
}

impl StyleDefaults {
    pub fn style(&self) -> QrStyle {
        QrStyle {
            fg_color: self.fg_color.clone(),
            bg_color: self.bg_color.clone(),
            error_correction: self.error_correction,
            logo_url: None,
            logo_size: self.logo_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub png_size: u32,
    pub file_stem: String,
    /// Exports land here unless a command names another directory.
    pub directory: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            png_size: DEFAULT_PNG_SIZE,
            file_stem: DEFAULT_FILE_STEM.to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// An `EnvFilter` directive, overridden by `QRCRAFT_LOG`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/qrcraft/config.toml` on Linux, or the equivalent via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("qrcraft").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The default logo size is within the slider range
    /// - The PNG size is between 1 and [`MAX_PNG_SIZE`]
    /// - The export file stem is not blank
    /// - The log level is a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOGO_SIZE_RANGE.contains(&self.defaults.logo_size) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "defaults.logo_size {} must be between {} and {}",
                    self.defaults.logo_size,
                    LOGO_SIZE_RANGE.start(),
                    LOGO_SIZE_RANGE.end()
                ),
            });
        }

        if !(1..=MAX_PNG_SIZE).contains(&self.export.png_size) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "export.png_size {} must be between 1 and {MAX_PNG_SIZE}",
                    self.export.png_size
                ),
            });
        }

        if self.export.file_stem.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "export.file_stem must not be empty".to_string(),
            });
        }

        if let Err(e) = EnvFilter::try_new(&self.log.level) {
            return Err(ConfigError::ValidationError {
                message: format!("log.level '{}' is not a valid filter: {e}", self.log.level),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert!(config.store.data_dir.is_none());
        assert_eq!(config.defaults.style(), QrStyle::default());
        assert_eq!(config.export.png_size, 400);
        assert_eq!(config.export.file_stem, "qrcode");
        assert_eq!(config.log.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path_ends_with_expected() {
        assert!(Config::config_path().ends_with("qrcraft/config.toml"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_is_merged_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r##"
[store]
data_dir = "/tmp/qrcraft-data"

[defaults]
fg_color = "#000"
error_correction = "H"

[export]
png_size = 1024
"##,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store.data_dir(), PathBuf::from("/tmp/qrcraft-data"));
        assert_eq!(config.defaults.fg_color.as_str(), "#000000");
        assert_eq!(config.defaults.bg_color.as_str(), "#ffffff");
        assert_eq!(config.defaults.error_correction, ErrorCorrection::H);
        assert_eq!(config.export.png_size, 1024);
        assert_eq!(config.export.file_stem, "qrcode");
    }

    #[test]
    fn test_bad_color_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[defaults]\nfg_color = \"navy\"\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.defaults.logo_size = 40;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError { .. })));

        let mut config = Config::default();
        config.export.png_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.file_stem = " ".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.log.level = "qrcraft=loud".into();
        assert!(config.validate().is_err());
    }
}

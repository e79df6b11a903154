//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments
//! 2. Environment variables (both handled by the binary's clap parser)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is never fatal: the service logs a warning and
//! starts with defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default request body limit for uploads (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interface to bind the HTTP listener to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Directory holding generated PNGs
    pub output_dir: PathBuf,

    /// Optional logo embedded in the centre of every code
    pub logo_path: PathBuf,

    /// Delete every stored PNG after the archive has been built
    pub clear_on_download: bool,

    /// Maximum accepted request body for `POST /generate`
    pub max_upload_bytes: usize,

    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            output_dir: PathBuf::from("volunteers"),
            logo_path: PathBuf::from("logo.png"),
            clear_on_download: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub output_dir: Option<PathBuf>,
    pub logo_path: Option<PathBuf>,
    pub clear_on_download: Option<bool>,
    pub log_level: Option<String>,
}

impl ServiceConfig {
    /// Parse a TOML document; absent keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load from an explicit file; the file must exist
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from `explicit`, else the platform default location
    ///
    /// An explicit path that cannot be read is an error. A missing default
    /// file yields compiled defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config file: {}", path.display());
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config file: {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply command-line / environment values on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(bind_address) = overrides.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(logo_path) = overrides.logo_path {
            self.logo_path = logo_path;
        }
        if let Some(clear_on_download) = overrides.clear_on_download {
            self.clear_on_download = clear_on_download;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir must not be empty".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Platform config file location: `<config_dir>/qrmint/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("qrmint").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_service() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.output_dir, PathBuf::from("volunteers"));
        assert_eq!(config.logo_path, PathBuf::from("logo.png"));
        assert!(config.clear_on_download);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str("port = 8080\n").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert!(config.clear_on_download);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = ServiceConfig::from_toml_str("port = 8080\nclear_on_download = true\n")
            .unwrap()
            .with_overrides(ConfigOverrides {
                port: Some(9090),
                clear_on_download: Some(false),
                ..Default::default()
            });
        assert_eq!(config.port, 9090);
        assert!(!config.clear_on_download);
    }

    #[test]
    fn validate_rejects_zero_upload_limit() {
        let config = ServiceConfig {
            max_upload_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}

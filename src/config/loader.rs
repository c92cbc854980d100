//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Where the configuration lives: a main file plus an optional drop-in directory.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub main: PathBuf,
    pub conf_dir: Option<PathBuf>,
}

impl ConfigSource {
    /// Create a new source.
    pub fn new(main: impl Into<PathBuf>, conf_dir: Option<PathBuf>) -> Self {
        Self {
            main: main.into(),
            conf_dir,
        }
    }

    /// Load, merge and validate.
    pub fn load(&self) -> Result<GatewayConfig, ConfigError> {
        load_config(&self.main, self.conf_dir.as_deref())
    }
}

/// Load and validate configuration from a TOML file and its drop-in directory.
///
/// Domains from `conf_dir/*.toml` are appended in file-name order. A drop-in
/// that cannot be read or parsed is skipped with a warning; the main file is
/// never skipped.
pub fn load_config(path: &Path, conf_dir: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = parse_file(path)?;

    if let Some(dir) = conf_dir {
        for extra in drop_in_files(dir) {
            match parse_file(&extra) {
                Ok(part) => {
                    tracing::debug!(
                        file = %extra.display(),
                        domains = part.domains.len(),
                        "Merged drop-in config"
                    );
                    config.domains.extend(part.domains);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping drop-in config");
                }
            }
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn drop_in_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot read conf directory");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}

//! # Configuration
//!
//! Optional `bomcraft.toml` file:
//!
//! ```toml
//! [storage]
//! database = "catalog.redb"
//! backend = "redb"        # or "file"
//!
//! [resolver]
//! max_depth = 64
//!
//! [logging]
//! format = "text"         # or "json"
//! filter = "bomcraft=info"
//! ```
//!
//! Precedence is command line, then environment, then file, then defaults.

use crate::error::AppError;
use bomcraft_core::primitives::{DEFAULT_RESOLVE_DEPTH, MAX_RESOLVE_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "bomcraft.toml";

/// Database path used when neither the CLI nor the file names one.
pub const DEFAULT_DATABASE: &str = "bomcraft.db";

/// Log filter used when `RUST_LOG` and the file are silent.
pub const DEFAULT_LOG_FILTER: &str = "bomcraft=info";

/// Log filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "bomcraft=debug";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "BOMCRAFT_LOG_FORMAT";

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID database file (redb).
    #[default]
    Redb,
    /// Single snapshot file, rewritten on every change.
    File,
}

impl Backend {
    /// Lowercase name as accepted on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse an environment value; anything but `json` is text.
    #[must_use]
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

// =============================================================================
// FILE SCHEMA
// =============================================================================

/// Contents of `bomcraft.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub storage: StorageSection,
    pub resolver: ResolverSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSection {
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub format: Option<LogFormat>,
    pub filter: Option<String>,
}

impl FileConfig {
    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one,
    /// `bomcraft.toml` is read if present and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }
}

// =============================================================================
// EFFECTIVE SETTINGS
// =============================================================================

/// Values given on the command line or in the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub verbose: bool,
    /// Raw value of `BOMCRAFT_LOG_FORMAT`, if set.
    pub log_format_env: Option<String>,
}

/// Fully resolved settings used by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database: PathBuf,
    pub backend: Backend,
    pub max_depth: usize,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(&Overrides::default(), &FileConfig::default())
    }
}

impl Settings {
    /// Merge overrides over the file over the defaults.
    #[must_use]
    pub fn resolve(overrides: &Overrides, file: &FileConfig) -> Self {
        let database = overrides
            .database
            .clone()
            .or_else(|| file.storage.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        let backend = overrides
            .backend
            .or(file.storage.backend)
            .unwrap_or_default();

        let max_depth = file
            .resolver
            .max_depth
            .unwrap_or(DEFAULT_RESOLVE_DEPTH)
            .min(MAX_RESOLVE_DEPTH);

        let log_format = overrides
            .log_format_env
            .as_deref()
            .map(LogFormat::from_env_value)
            .or(file.logging.format)
            .unwrap_or_default();

        let log_filter = if overrides.verbose {
            VERBOSE_LOG_FILTER.to_string()
        } else {
            file.logging
                .filter
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
        };

        Self {
            database,
            backend,
            max_depth,
            log_format,
            log_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_any_source() {
        let settings = Settings::default();
        assert_eq!(settings.database, PathBuf::from("bomcraft.db"));
        assert_eq!(settings.backend, Backend::Redb);
        assert_eq!(settings.max_depth, DEFAULT_RESOLVE_DEPTH);
        assert_eq!(settings.log_format, LogFormat::Text);
        assert_eq!(settings.log_filter, "bomcraft=info");
    }

    #[test]
    fn env_format_parsing() {
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("pretty"), LogFormat::Text);
    }
}

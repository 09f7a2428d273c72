//! # Application Errors
//!
//! Failures of the binary layer. Engine errors are wrapped unchanged so the
//! CLI prints the same message the core produced.

use bomcraft_core::BomError;
use thiserror::Error;

/// Error type for every CLI command.
#[derive(Debug, Error)]
pub enum AppError {
    /// An engine or storage error.
    #[error(transparent)]
    Core(#[from] BomError),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),

    /// User-supplied input was rejected.
    #[error("Invalid input: {0}")]
    Input(String),
}

impl AppError {
    /// True when the error means "the requested item does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(BomError::ItemNotFound(_)))
    }
}

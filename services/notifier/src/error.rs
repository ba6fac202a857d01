//! services/notifier/src/error.rs
//!
//! Defines the primary error type for the notifier client.
//!
//! Runtime failures on the push connection and REST calls are handled where
//! they happen; only startup and terminal errors surface here.

use crate::config::ConfigError;

/// The primary error type for the `notifier` binary.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., reading the terminal).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Runtime error types.

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur while setting up a page runtime.
///
/// Once the page is loading nothing is fatal; only construction fails.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A declared plugin or template could not be registered.
    #[error("Plugin registration failed: {0}")]
    Plugin(#[from] tessera_framework::PluginError),

    /// The page URL could not be parsed.
    #[error("Invalid page URL {url}: {reason}")]
    InvalidPageUrl { url: String, reason: String },

    /// A required host component was not supplied.
    #[error("Missing host component: {0}")]
    MissingHost(&'static str),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

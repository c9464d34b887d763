//! Error types for the Tessera framework.
//!
//! Registry operations contain failures per entry: these errors are logged
//! and counted, never returned from `load` or `run`.  Only registration
//! returns them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    /// The registration input does not yield a usable id.
    #[error("invalid plugin spec: {0}")]
    InvalidSpec(String),

    /// The entry's condition returned an error.
    #[error("condition of plugin '{id}' failed: {reason}")]
    ConditionFailed { id: String, reason: String },

    /// The entry's module could not be imported or its entry point failed.
    #[error("could not load plugin '{0}'")]
    LoadFailed(String),

    /// A phase function returned an error.
    #[error("phase '{phase}' of plugin '{id}' failed: {reason}")]
    PhaseFailed {
        id: String,
        phase: String,
        reason: String,
    },
}

pub type PluginResult<T> = Result<T, PluginError>;

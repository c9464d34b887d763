//! Error types shared by the loading layers.

use thiserror::Error;

/// Boxed error returned by host- and module-supplied functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors raised while loading a style, script or behavior module.
///
/// None of these are fatal to a page: loaders log them and move the affected
/// unit on to `loaded`.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Stylesheet could not be fetched or parsed.
    #[error("failed to load stylesheet {href}: {reason}")]
    StyleFailed {
        /// The stylesheet URL.
        href: String,
        /// Reason for failure.
        reason: String,
    },

    /// Classic script could not be fetched or evaluated.
    #[error("failed to load script {src}: {reason}")]
    ScriptFailed {
        /// The script URL.
        src: String,
        /// Reason for failure.
        reason: String,
    },

    /// Behavior module could not be imported.
    #[error("failed to import module {path}: {reason}")]
    ImportFailed {
        /// The module path.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Module entry point returned an error.
    #[error("entry point of module '{name}' failed: {reason}")]
    EntryFailed {
        /// The module name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// No resource exists at the path.
    #[error("resource not found: {0}")]
    NotFound(String),
}

impl LoadError {
    /// Creates a stylesheet error.
    pub fn style(href: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StyleFailed {
            href: href.into(),
            reason: reason.into(),
        }
    }

    /// Creates a script error.
    pub fn script(src: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScriptFailed {
            src: src.into(),
            reason: reason.into(),
        }
    }

    /// Creates an import error.
    pub fn import(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImportFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an entry-point error.
    pub fn entry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EntryFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

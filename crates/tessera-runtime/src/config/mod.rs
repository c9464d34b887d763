//! Configuration for the Tessera runtime.
//!
//! Layered loading with figment into the [`TesseraConfig`] schema, plus
//! validation.  Lowest to highest precedence: defaults, programmatic
//! merges, profile file, main file, `TESSERA_*` environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ExperimentationConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PageConfig,
    PluginEntryConfig, SpanEventConfig, TelemetryConfig, TesseraConfig,
};
pub use validation::validate_config;

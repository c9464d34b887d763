//! Tessera Runtime - page bootstrap for the Tessera page-composition runtime.
//!
//! This crate provides:
//! - Layered configuration (`TesseraConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`)
//! - Page context construction in a fixed order (`PageContext`)
//! - The eager / lazy / delayed bootstrap (`PageRuntime`)
//!
//! ```ignore
//! use tessera_runtime::PageRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = PageRuntime::builder()
//!         .document(doc)
//!         .catalog(catalog)
//!         .build()?;
//!
//!     let stats = runtime.load_page().await;
//!     println!("{} of {} sections loaded", stats.sections_loaded, stats.sections);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [page]
//! code_base_path = "/code"
//! url = "https://www.example.com/blog/post"
//!
//! [telemetry]
//! default_weight = 100
//!
//! [[plugins]]
//! url = "/plugins/experimentation/"
//!
//! [[templates]]
//! id = "blog"
//! url = "/templates/blog"
//! ```
//!
//! Every key can be overridden with a `TESSERA_` environment variable, using
//! `__` for nesting (`TESSERA_PAGE__CODE_BASE_PATH=/code`).

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ExperimentationConfig, PageConfig, PluginEntryConfig,
    TelemetryConfig, TesseraConfig,
};
pub use context::{PageContext, PageContextBuilder};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{DELAYED_PHASE, PageRuntime, PageStats, RuntimeBuilder, StageReport};

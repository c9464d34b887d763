//! # Tessera
//!
//! A page-composition runtime.
//!
//! ## Overview
//!
//! Tessera takes a static content document, finds its sections and blocks,
//! loads a style and behavior module per block on demand, and lets plugins
//! and templates hook into named lifecycle phases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ PageRuntime │────▶│ PageLoader │────▶│ SectionLoader │────▶│ BlockLoader │────▶│ ModuleLoader │──▶ host
//! └─────────────┘     └────────────┘     └───────────────┘     └─────────────┘     └──────────────┘
//!        │                                                                                ▲
//!        └──────────▶ PluginRegistry / TemplateRegistry ──────────────────────────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging and the eager / lazy / delayed bootstrap
//! - **Loaders**: sequential sections, sequential blocks, one-shot modules
//! - **Registries**: concurrent loading and sequential running per phase
//! - **Capabilities**: the read-only surface modules call back into
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ModuleCatalog::new().with_module(
//!         "/blocks/hero/hero.js",
//!         Module::new().entry(|args| async move {
//!             if let Some(block) = &args.target {
//!                 block.add_class("hero-ready");
//!             }
//!             Ok(())
//!         }),
//!     );
//!
//!     let runtime = PageRuntime::builder()
//!         .document(document)
//!         .catalog(catalog)
//!         .build()?;
//!     runtime.load_page().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: `tessera.toml` configuration files (default)
//! - `yaml-config`: `tessera.yaml` configuration files
//! - `json-log`: JSON log output

pub use tessera_core as core;
pub use tessera_framework as framework;
pub use tessera_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tessera_runtime::{PageContext, PageRuntime, PageStats, TesseraConfig};

    // Document model
    pub use tessera_core::{Document, Element, UnitKind, UnitStatus};

    // Module contract - for writing blocks and plugins
    pub use tessera_core::BoxError;
    pub use tessera_framework::{Capabilities, Module, ModuleApi, ModuleArgs};

    // Plugin registration
    pub use tessera_framework::{Condition, Phase, PluginConfig, PluginSpec};

    // Host traits for embedding
    pub use tessera_core::{BeaconSink, ResourceHost};
    pub use tessera_framework::{ModuleCatalog, ModuleResolver};
}

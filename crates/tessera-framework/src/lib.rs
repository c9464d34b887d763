//! # Tessera Framework
//!
//! The loading orchestration layer of the Tessera page runtime.
//!
//! ## Components
//!
//! Leaf-first:
//!
//! - [`ModuleLoader`]: paired style + behavior loading, one entry-point call
//!   per load, duplicate-free `<link>`/`<script>` insertion.
//! - [`BlockLoader`]: resolves a block's module paths through the registered
//!   config patchers and drives the module loader.
//! - [`SectionLoader`]: loads a section's blocks strictly in document order,
//!   then reveals the section.
//! - [`PageLoader`]: loads sections top to bottom and fires the one-shot
//!   enhancement hook after the first.
//! - [`PluginRegistry`] / [`TemplateRegistry`]: phase-scoped concurrent
//!   loading and sequential running of third-party modules.
//!
//! Modules talk back to the runtime only through [`Capabilities`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let catalog = ModuleCatalog::new()
//!     .with_module("/blocks/hero/hero.js", Module::new().entry(|args| async move {
//!         if let Some(block) = &args.target {
//!             block.add_class("ready");
//!         }
//!         Ok(())
//!     }));
//!
//! let modules = ModuleLoader::new(doc.clone(), Arc::new(catalog.clone()), Arc::new(catalog));
//! let blocks = BlockLoader::new(modules, "", Telemetry::disabled(doc.clone()));
//! let page = PageLoader::new(SectionLoader::new(blocks));
//! page.load_sections(&doc.body()).await;
//! ```

pub mod block;
pub mod capabilities;
pub mod catalog;
pub mod decorate;
pub mod error;
pub mod loader;
pub mod module;
pub mod page;
pub mod plugin;
pub mod section;

#[cfg(test)]
mod testing;

pub use block::{BlockConfig, BlockLoader, ConfigPatcher};
pub use capabilities::Capabilities;
pub use catalog::{ModuleCatalog, Request};
pub use decorate::{
    BlockCell, build_block, decorate_block, decorate_blocks, decorate_sections,
    decorate_template_and_theme, load_footer, load_header, read_block_config, wrap_text_nodes,
};
pub use error::{PluginError, PluginResult};
pub use loader::{ModuleLoader, ModuleResolver};
pub use module::{EntryFn, Module, ModuleApi, ModuleArgs, PhaseFn};
pub use page::PageLoader;
pub use plugin::{
    Condition, EXPERIMENTATION_ID, ExperimentationOptions, LoadReport, Phase, PluginConfig,
    PluginEntry, PluginRegistry, PluginSpec, RunReport, TemplateRegistry, experimentation_plugin,
    is_experimentation_enabled, load_sidekick_handler,
};
pub use section::SectionLoader;

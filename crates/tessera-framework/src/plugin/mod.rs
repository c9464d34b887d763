//! Plugins and templates.
//!
//! - [`PluginSpec`] / [`PluginConfig`]: what can be registered;
//! - [`Condition`]: the activation predicate of an entry;
//! - [`PluginRegistry`]: phase-scoped loading and running;
//! - [`TemplateRegistry`]: templates as plugins gated on the page template;
//! - [`experimentation`]: the built-in experimentation plugin.

mod condition;
pub mod experimentation;
mod registry;
mod spec;
mod template;

pub use condition::Condition;
pub use experimentation::{
    EXPERIMENTATION_ID, ExperimentationOptions, experimentation_plugin, is_experimentation_enabled,
    load_sidekick_handler,
};
pub use registry::{LoadReport, PluginEntry, PluginRegistry, RunReport};
pub use spec::{Phase, PluginConfig, PluginSpec};
pub use template::TemplateRegistry;

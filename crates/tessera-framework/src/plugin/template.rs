//! The template registry.

use std::sync::Arc;

use tessera_core::to_class_name;

use super::condition::Condition;
use super::registry::{PluginEntry, PluginRegistry};
use super::spec::PluginSpec;
use crate::error::PluginResult;

/// Registers templates as plugins of the shared [`PluginRegistry`].
///
/// A template is a plugin whose condition is fixed to "the page's `template`
/// metadata, in class-name form, equals this id".  It shares phases, pruning
/// and run order with every other plugin.
#[derive(Clone, Debug)]
pub struct TemplateRegistry {
    plugins: Arc<PluginRegistry>,
}

impl TemplateRegistry {
    pub fn new(plugins: Arc<PluginRegistry>) -> Self {
        Self { plugins }
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    /// Registers a template and returns its id.  Any condition in the spec
    /// is replaced.
    pub fn add(&self, spec: impl Into<PluginSpec>) -> PluginResult<String> {
        let (id, mut config) = spec.into().resolve()?;
        let template = id.clone();
        config.condition = Some(Condition::new(move |args| {
            to_class_name(&args.capabilities.get_metadata("template")) == template
        }));
        self.plugins.insert(id.clone(), config);
        Ok(id)
    }

    /// Registers several templates, stopping at the first invalid spec.
    pub fn add_all<I, S>(&self, specs: I) -> PluginResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<PluginSpec>,
    {
        specs.into_iter().map(|spec| self.add(spec)).collect()
    }

    pub fn get(&self, id: &str) -> Option<PluginEntry> {
        self.plugins.get(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.plugins.has(id)
    }
}

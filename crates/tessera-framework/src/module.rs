//! Behavior module contract.
//!
//! A [`Module`] is what a block script or plugin script resolves to.  It has
//! two optional parts:
//!
//! - an **entry point**, invoked exactly once per load with the
//!   [`ModuleArgs`] supplied by the loader.  It may hand back additional
//!   exports;
//! - **named exports** ([`ModuleApi`]), keyed by phase name (`eager`,
//!   `lazy`, or any custom name) and invoked by
//!   [`PluginRegistry::run`](crate::plugin::PluginRegistry::run).
//!
//! Exports are looked up by name and checked for presence before every call.
//!
//! ```rust,ignore
//! let module = Module::new()
//!     .entry(|args| async move {
//!         if let Some(block) = &args.target {
//!             block.add_class("decorated");
//!         }
//!         Ok(())
//!     })
//!     .export("lazy", |args| async move {
//!         args.capabilities.telemetry().sample("lazy-plugin", Value::Null);
//!         Ok(())
//!     });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tessera_core::{BoxError, Document, Element};

use crate::capabilities::Capabilities;

// ─── ModuleArgs ──────────────────────────────────────────────────────────────

/// Arguments handed to entry points, phase exports and conditions.
#[derive(Clone)]
pub struct ModuleArgs {
    /// The page document.
    pub document: Document,
    /// The unit being decorated, for block modules.
    pub target: Option<Element>,
    /// The plugin's options (an empty object for blocks).
    pub options: Arc<Value>,
    /// Read-only core utilities.
    pub capabilities: Capabilities,
}

impl ModuleArgs {
    /// Arguments for a block module: the block is the target.
    pub fn for_block(block: Element, capabilities: Capabilities) -> Self {
        Self {
            document: capabilities.document(),
            target: Some(block),
            options: Arc::new(Value::Object(Default::default())),
            capabilities,
        }
    }

    /// Arguments for a plugin module: `(document, options, capabilities)`.
    pub fn for_plugin(options: Arc<Value>, capabilities: Capabilities) -> Self {
        Self {
            document: capabilities.document(),
            target: None,
            options,
            capabilities,
        }
    }

    /// Deserialises the options into `T`.
    ///
    /// Use `#[serde(default)]` on `T` to make every field optional.
    pub fn options<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(self.options.as_ref())
    }
}

// ─── Function types ──────────────────────────────────────────────────────────

/// A named export: `(document, options, capabilities) → Result<()>`.
pub type PhaseFn = Arc<dyn Fn(ModuleArgs) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// A module entry point.  `Ok(Some(api))` contributes extra exports.
pub type EntryFn =
    Arc<dyn Fn(ModuleArgs) -> BoxFuture<'static, Result<Option<ModuleApi>, BoxError>> + Send + Sync>;

fn phase_fn<F, Fut>(f: F) -> PhaseFn
where
    F: Fn(ModuleArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |args| f(args).boxed())
}

// ─── ModuleApi ───────────────────────────────────────────────────────────────

/// Export table of a loaded module.
#[derive(Clone, Default)]
pub struct ModuleApi {
    exports: HashMap<String, PhaseFn>,
}

impl ModuleApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) export `name`.
    pub fn export<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ModuleArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.exports.insert(name.into(), phase_fn(f));
        self
    }

    /// Adds (or replaces) an already boxed export.
    pub fn insert(&mut self, name: impl Into<String>, f: PhaseFn) {
        self.exports.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<PhaseFn> {
        self.exports.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    /// Export names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Copies every export of `other` over this table.
    pub fn merge(&mut self, other: ModuleApi) {
        self.exports.extend(other.exports);
    }
}

impl fmt::Debug for ModuleApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleApi")
            .field("exports", &self.names())
            .finish()
    }
}

// ─── Module ──────────────────────────────────────────────────────────────────

/// A resolved behavior module.
#[derive(Clone, Default)]
pub struct Module {
    entry: Option<EntryFn>,
    exports: ModuleApi,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry point.
    pub fn entry<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ModuleArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.entry = Some(Arc::new(move |args| {
            let fut = f(args);
            async move { fut.await.map(|()| None::<ModuleApi>) }.boxed()
        }));
        self
    }

    /// Sets an entry point that contributes exports of its own.
    pub fn entry_with_api<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ModuleArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ModuleApi, BoxError>> + Send + 'static,
    {
        self.entry = Some(Arc::new(move |args| {
            let fut = f(args);
            async move { fut.await.map(Some) }.boxed()
        }));
        self
    }

    /// Adds export `name`.
    pub fn export<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ModuleArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.exports = self.exports.export(name, f);
        self
    }

    pub fn entry_fn(&self) -> Option<&EntryFn> {
        self.entry.as_ref()
    }

    pub fn exports(&self) -> &ModuleApi {
        &self.exports
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("entry", &self.entry.is_some())
            .field("exports", &self.exports.names())
            .finish()
    }
}

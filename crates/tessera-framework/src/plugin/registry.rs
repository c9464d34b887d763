//! The plugin registry.
//!
//! [`PluginRegistry`] owns an ordered list of entries keyed by id.  Order is
//! registration order; re-registering an id replaces the entry where it
//! stands.  The bootstrap drives it per phase:
//!
//! 1. [`load`](PluginRegistry::load) prunes entries whose condition no longer
//!    holds, then imports every remaining entry of the phase **concurrently**
//!    and merges the exports each module hands back onto its entry.
//! 2. [`run`](PluginRegistry::run) invokes the export named after the phase
//!    on every entry that has one, **sequentially** in registration order.
//!
//! A failing entry is logged by id and never affects its siblings.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future;
use parking_lot::RwLock;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::spec::{Phase, PluginConfig, PluginSpec};
use crate::block::BlockLoader;
use crate::capabilities::Capabilities;
use crate::error::{PluginError, PluginResult};
use crate::loader::ModuleLoader;
use crate::module::{ModuleApi, ModuleArgs};

// =============================================================================
// PluginEntry
// =============================================================================

/// A registered plugin: its configuration plus the exports of its module
/// once loaded.
#[derive(Clone, Debug)]
pub struct PluginEntry {
    id: String,
    config: PluginConfig,
    api: ModuleApi,
    /// Distinguishes an entry from a later one registered under the same id.
    serial: u64,
}

impl PluginEntry {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Exports merged from the loaded module.  Empty until loaded.
    pub fn api(&self) -> &ModuleApi {
        &self.api
    }

    pub fn has_phase(&self, phase: &str) -> bool {
        self.api.has(phase)
    }
}

/// Outcome of [`PluginRegistry::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entries removed because their condition did not hold.
    pub pruned: Vec<String>,
    /// Entries whose module loaded.
    pub loaded: Vec<String>,
    /// Entries whose module failed to import or whose entry point failed.
    pub failed: Vec<String>,
}

/// Outcome of [`PluginRegistry::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Entries whose phase function completed, in invocation order.
    pub ran: Vec<String>,
    /// Entries whose phase function returned an error.
    pub failed: Vec<String>,
}

// =============================================================================
// PluginRegistry
// =============================================================================

pub struct PluginRegistry {
    entries: RwLock<Vec<PluginEntry>>,
    next_serial: AtomicU64,
    modules: ModuleLoader,
    capabilities: Capabilities,
}

impl PluginRegistry {
    /// Creates an empty registry whose modules load through `blocks`.
    pub fn new(blocks: &BlockLoader) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_serial: AtomicU64::new(0),
            modules: blocks.modules().clone(),
            capabilities: blocks.capabilities(),
        }
    }

    /// The capabilities handed to plugin modules.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Registers a plugin and returns its id.
    ///
    /// ```rust,ignore
    /// registry.add("https://example.com/plugins/foo/")?;            // id "foo"
    /// registry.add(("martech", "/plugins/martech"))?;
    /// registry.add(("rum", PluginConfig::new().url("/rum.js").load_phase("lazy")))?;
    /// ```
    pub fn add(&self, spec: impl Into<PluginSpec>) -> PluginResult<String> {
        let (id, config) = spec.into().resolve()?;
        self.insert(id.clone(), config);
        Ok(id)
    }

    pub(crate) fn insert(&self, id: String, config: PluginConfig) {
        debug!(plugin = %id, url = ?config.url, phase = %config.load_phase, "Registering plugin");
        let entry = PluginEntry {
            id,
            config,
            api: ModuleApi::new(),
            serial: self.next_serial.fetch_add(1, Ordering::Relaxed),
        };
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    pub fn get(&self, id: &str) -> Option<PluginEntry> {
        self.entries.read().iter().find(|e| e.id == id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.read().iter().any(|e| e.id == id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn args_for(&self, config: &PluginConfig) -> ModuleArgs {
        ModuleArgs::for_plugin(Arc::new(config.options.clone()), self.capabilities.clone())
    }

    /// Evaluates the entry's condition.  An erroring condition counts as
    /// `false`.
    fn passes(&self, entry: &PluginEntry) -> bool {
        let Some(condition) = &entry.config.condition else {
            return true;
        };
        match condition.evaluate(&self.args_for(&entry.config)) {
            Ok(verdict) => verdict,
            Err(e) => {
                let err = PluginError::ConditionFailed {
                    id: entry.id.clone(),
                    reason: e.to_string(),
                };
                warn!(plugin = %entry.id, error = %err, "Plugin condition failed, treating as false");
                false
            }
        }
    }

    /// Loads every entry of `phase`.
    ///
    /// Entries whose condition does not hold are removed first, whatever
    /// their phase; they do not come back in later phases.  The remaining
    /// entries of `phase` that have a URL are then imported concurrently.
    pub async fn load(&self, phase: impl Into<Phase>) -> LoadReport {
        let phase = phase.into();
        let span = info_span!("plugins_load", phase = %phase);
        self.load_inner(phase).instrument(span).await
    }

    async fn load_inner(&self, phase: Phase) -> LoadReport {
        let snapshot = self.entries.read().clone();

        let mut report = LoadReport::default();
        let mut candidates = Vec::new();
        for entry in snapshot {
            if !self.passes(&entry) {
                report.pruned.push(entry.id);
                continue;
            }
            if entry.config.load_phase != phase {
                continue;
            }
            match entry.config.module_paths(&entry.id) {
                Some((script, style)) => candidates.push((entry, script, style)),
                None => debug!(plugin = %entry.id, "Plugin has no URL, nothing to load"),
            }
        }

        if !report.pruned.is_empty() {
            self.entries
                .write()
                .retain(|e| !report.pruned.contains(&e.id));
            debug!(pruned = ?report.pruned, "Pruned plugins whose condition does not hold");
        }

        let loads = candidates.into_iter().map(|(entry, script, style)| async move {
            let args = self.args_for(&entry.config);
            let api = self
                .modules
                .load(&entry.id, Some(&script), style.as_deref(), args)
                .await;
            (entry.id, entry.serial, api)
        });

        for (id, serial, api) in future::join_all(loads).await {
            match api {
                Some(api) => {
                    self.merge_api(&id, serial, api);
                    report.loaded.push(id);
                }
                None => {
                    let err = PluginError::LoadFailed(id.clone());
                    error!(plugin = %id, error = %err, "Could not load specified plugin");
                    report.failed.push(id);
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            pruned = report.pruned.len(),
            "Plugin phase loaded"
        );
        report
    }

    /// Merges `api` onto the entry that started the load.  An entry
    /// re-registered under the same id in the meantime keeps its own exports.
    fn merge_api(&self, id: &str, serial: u64, api: ModuleApi) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.serial == serial => entry.api.merge(api),
            Some(_) => debug!(plugin = %id, "Plugin was replaced while loading, dropping its exports"),
            None => debug!(plugin = %id, "Plugin left the registry while loading"),
        }
    }

    /// Runs the `phase` export of every entry that has one.
    ///
    /// Conditions are checked for every entry up front; the functions of the
    /// entries that pass then run one after the other in registration order.
    /// An error is logged and the sequence continues.
    pub async fn run(&self, phase: impl Into<Phase>) -> RunReport {
        let phase = phase.into();
        let span = info_span!("plugins_run", phase = %phase);
        self.run_inner(phase).instrument(span).await
    }

    async fn run_inner(&self, phase: Phase) -> RunReport {
        let snapshot = self.entries.read().clone();
        let name = phase.as_str();
        let scheduled: Vec<_> = snapshot
            .into_iter()
            .filter_map(|entry| {
                let f = entry.api.get(name)?;
                self.passes(&entry).then_some((entry, f))
            })
            .collect();

        let mut report = RunReport::default();
        for (entry, f) in scheduled {
            debug!(plugin = %entry.id, "Running plugin phase");
            match f(self.args_for(&entry.config)).await {
                Ok(()) => report.ran.push(entry.id),
                Err(e) => {
                    let err = PluginError::PhaseFailed {
                        id: entry.id.clone(),
                        phase: name.to_string(),
                        reason: e.to_string(),
                    };
                    error!(plugin = %entry.id, error = %err, "Plugin phase failed");
                    report.failed.push(entry.id);
                }
            }
        }
        report
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("ids", &self.ids())
            .finish_non_exhaustive()
    }
}

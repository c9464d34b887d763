//! In-memory module host.
//!
//! [`ModuleCatalog`] implements both [`ResourceHost`] and [`ModuleResolver`]
//! over a fixed table of modules.  It is how Rust-native blocks and plugins
//! are wired into a page, and it records every request so that load order can
//! be inspected afterwards.
//!
//! ```rust,ignore
//! let catalog = ModuleCatalog::new()
//!     .with_module("/blocks/hero/hero.js", hero_module())
//!     .with_failing("/blocks/hero/hero.css");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tessera_core::{LoadError, LoadResult, ResourceHost};

use crate::loader::ModuleResolver;
use crate::module::Module;

/// A request observed by a [`ModuleCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Style(String),
    Script(String),
    Image(String),
    Import(String),
}

#[derive(Default)]
struct CatalogState {
    modules: HashMap<String, Arc<Module>>,
    failing: HashSet<String>,
    requests: Vec<Request>,
}

/// Table of modules keyed by path, plus a set of paths that fail to load.
///
/// Stylesheets, scripts and images load successfully unless their URL was
/// marked failing; imports succeed only for registered modules.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `module` under `path`.
    pub fn insert(&self, path: impl Into<String>, module: Module) {
        self.state
            .write()
            .modules
            .insert(path.into(), Arc::new(module));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_module(self, path: impl Into<String>, module: Module) -> Self {
        self.insert(path, module);
        self
    }

    /// Makes every request for `url` fail.
    pub fn fail(&self, url: impl Into<String>) {
        self.state.write().failing.insert(url.into());
    }

    /// Builder-style [`fail`](Self::fail).
    pub fn with_failing(self, url: impl Into<String>) -> Self {
        self.fail(url);
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.state.read().requests.clone()
    }

    /// Paths of the imports seen so far, in arrival order.
    pub fn imports(&self) -> Vec<String> {
        self.state
            .read()
            .requests
            .iter()
            .filter_map(|r| match r {
                Request::Import(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Request) -> bool {
        let mut state = self.state.write();
        let url = match &request {
            Request::Style(u) | Request::Script(u) | Request::Image(u) | Request::Import(u) => {
                u.clone()
            }
        };
        state.requests.push(request);
        state.failing.contains(&url)
    }
}

#[async_trait]
impl ResourceHost for ModuleCatalog {
    async fn fetch_style(&self, href: &str) -> LoadResult<()> {
        if self.record(Request::Style(href.to_string())) {
            return Err(LoadError::style(href, "request failed"));
        }
        Ok(())
    }

    async fn fetch_script(&self, src: &str) -> LoadResult<()> {
        if self.record(Request::Script(src.to_string())) {
            return Err(LoadError::script(src, "request failed"));
        }
        Ok(())
    }

    async fn fetch_image(&self, src: &str) -> LoadResult<()> {
        if self.record(Request::Image(src.to_string())) {
            return Err(LoadError::NotFound(src.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleResolver for ModuleCatalog {
    async fn import(&self, path: &str) -> LoadResult<Arc<Module>> {
        if self.record(Request::Import(path.to_string())) {
            return Err(LoadError::import(path, "request failed"));
        }
        self.state
            .read()
            .modules
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))
    }
}

//! Paired style + behavior loading.
//!
//! [`ModuleLoader`] starts the stylesheet and the behavior module of a unit
//! together and waits for both.  Failures on either side are logged and
//! contained: a broken stylesheet does not stop the script, and a broken
//! script yields "no API" instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use tessera_core::{Document, LoadError, LoadResult, ResourceHost};
use tracing::{debug, error, warn};

use crate::module::{Module, ModuleApi, ModuleArgs};

/// Resolves module paths to behavior modules.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Imports the module at `path`.
    async fn import(&self, path: &str) -> LoadResult<Arc<Module>>;
}

/// Loads stylesheets, classic scripts and behavior modules into a document.
///
/// Cheap to clone; clones share the host and resolver.
#[derive(Clone)]
pub struct ModuleLoader {
    document: Document,
    host: Arc<dyn ResourceHost>,
    resolver: Arc<dyn ModuleResolver>,
}

impl ModuleLoader {
    pub fn new(
        document: Document,
        host: Arc<dyn ResourceHost>,
        resolver: Arc<dyn ModuleResolver>,
    ) -> Self {
        Self {
            document,
            host,
            resolver,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn host(&self) -> &Arc<dyn ResourceHost> {
        &self.host
    }

    /// Loads a stylesheet.
    ///
    /// Resolves immediately if `head` already holds a `<link>` with this exact
    /// `href`; otherwise inserts one and waits for the host to apply it.
    pub async fn load_css(&self, href: &str) -> LoadResult<()> {
        if !self
            .document
            .insert_head_resource("link", "href", href, &[("rel", "stylesheet")])
        {
            debug!(href, "Stylesheet already present");
            return Ok(());
        }
        self.host.fetch_style(href).await
    }

    /// Loads a classic (non-module) script with optional extra attributes.
    ///
    /// Resolves immediately if `head` already holds a `<script>` with this
    /// exact `src`.
    pub async fn load_script(&self, src: &str, attrs: &[(&str, &str)]) -> LoadResult<()> {
        if !self.document.insert_head_resource("script", "src", src, attrs) {
            debug!(src, "Script already present");
            return Ok(());
        }
        self.host.fetch_script(src).await
    }

    /// Loads the style and behavior of module `name` concurrently.
    ///
    /// The module's entry point runs once with `args`.  Returns the module's
    /// exports (plus any exports its entry point handed back), or `None` when
    /// there is no script or the script failed to import or run.
    pub async fn load(
        &self,
        name: &str,
        script_path: Option<&str>,
        style_path: Option<&str>,
        args: ModuleArgs,
    ) -> Option<ModuleApi> {
        let style = async {
            if let Some(href) = style_path
                && let Err(e) = self.load_css(href).await
            {
                warn!(module = %name, error = %e, "Failed to load stylesheet");
            }
        };
        let script = async {
            let path = script_path?;
            match self.execute(name, path, args).await {
                Ok(api) => Some(api),
                Err(e) => {
                    error!(module = %name, path, error = %e, "Failed to load module");
                    None
                }
            }
        };
        let ((), api) = future::join(style, script).await;
        api
    }

    /// Imports the module at `path` and runs its entry point.
    async fn execute(&self, name: &str, path: &str, args: ModuleArgs) -> LoadResult<ModuleApi> {
        let module = self.resolver.import(path).await?;

        let mut api = module.exports().clone();
        if let Some(entry) = module.entry_fn() {
            let extra = entry(args)
                .await
                .map_err(|e| LoadError::entry(name, e.to_string()))?;
            if let Some(extra) = extra {
                api.merge(extra);
            }
        }
        debug!(module = %name, exports = ?api.names(), "Module loaded");
        Ok(api)
    }
}

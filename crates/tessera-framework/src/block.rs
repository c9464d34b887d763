//! Block loading.
//!
//! A block's resource locations are derived from its short name and the code
//! base path, then passed through every registered [`ConfigPatcher`] in
//! registration order.  Each patcher receives the previous patcher's output
//! together with the unpatched original.

use std::sync::Arc;

use parking_lot::RwLock;
use tessera_core::status::{self, UnitKind};
use tessera_core::{Document, Element, Telemetry};
use tracing::{Instrument, debug, debug_span, warn};

use crate::capabilities::Capabilities;
use crate::loader::ModuleLoader;
use crate::module::ModuleArgs;

/// Resolved resource locations of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockConfig {
    /// Short block name (`hero`, `cards`, …).
    pub name: String,
    /// Behavior module path.
    pub script_path: String,
    /// Stylesheet path.  `None` skips the stylesheet.
    pub style_path: Option<String>,
}

impl BlockConfig {
    /// Default locations: `<base>/blocks/<name>/<name>.{js,css}`.
    pub fn derive(code_base_path: &str, name: &str) -> Self {
        let base = code_base_path.trim_end_matches('/');
        Self {
            name: name.to_string(),
            script_path: format!("{base}/blocks/{name}/{name}.js"),
            style_path: Some(format!("{base}/blocks/{name}/{name}.css")),
        }
    }
}

/// Rewrites a block's configuration: `(current, original) → next`.
pub type ConfigPatcher = Arc<dyn Fn(BlockConfig, &BlockConfig) -> BlockConfig + Send + Sync>;

struct BlockLoaderInner {
    modules: ModuleLoader,
    code_base_path: String,
    patchers: RwLock<Vec<ConfigPatcher>>,
    telemetry: Telemetry,
}

/// Loads block modules and tracks block status.
///
/// Cheap to clone; clones share patchers and the module loader.
#[derive(Clone)]
pub struct BlockLoader {
    inner: Arc<BlockLoaderInner>,
}

impl BlockLoader {
    pub fn new(modules: ModuleLoader, code_base_path: impl Into<String>, telemetry: Telemetry) -> Self {
        Self {
            inner: Arc::new(BlockLoaderInner {
                modules,
                code_base_path: code_base_path.into(),
                patchers: RwLock::new(Vec::new()),
                telemetry,
            }),
        }
    }

    pub fn modules(&self) -> &ModuleLoader {
        &self.inner.modules
    }

    pub fn document(&self) -> &Document {
        self.inner.modules.document()
    }

    pub fn code_base_path(&self) -> &str {
        &self.inner.code_base_path
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.inner.telemetry
    }

    /// The capability surface handed to modules loaded through this loader.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.clone())
    }

    /// Appends a config patcher.
    pub fn add_patcher(&self, patcher: ConfigPatcher) {
        self.inner.patchers.write().push(patcher);
    }

    /// Number of registered patchers.
    pub fn patcher_count(&self) -> usize {
        self.inner.patchers.read().len()
    }

    /// Resolves the configuration of `block`, or `None` if it has no name.
    ///
    /// The name is taken from `data-block-name`, falling back to the block's
    /// first class.
    pub fn block_config(&self, block: &Element) -> Option<BlockConfig> {
        let name = block
            .data("blockName")
            .or_else(|| block.first_class())
            .filter(|n| !n.is_empty())?;
        let original = BlockConfig::derive(&self.inner.code_base_path, &name);
        let patchers = self.inner.patchers.read().clone();
        Some(
            patchers
                .iter()
                .fold(original.clone(), |config, patch| patch(config, &original)),
        )
    }

    /// Loads the style and behavior of `block`.
    ///
    /// A no-op when the block is already `loading` or `loaded`.  Otherwise the
    /// block ends up `loaded` whether or not its module worked.
    pub async fn load_block(&self, block: &Element) -> Element {
        if !status::try_begin_load(block, UnitKind::Block) {
            debug!(block = ?block.data("blockName"), "Block already loading or loaded");
            return block.clone();
        }

        match self.block_config(block) {
            Some(config) => {
                let span = debug_span!("block", name = %config.name);
                let args = ModuleArgs::for_block(block.clone(), self.capabilities());
                let api = self
                    .inner
                    .modules
                    .load(
                        &config.name,
                        Some(&config.script_path),
                        config.style_path.as_deref(),
                        args,
                    )
                    .instrument(span)
                    .await;
                if api.is_none() {
                    warn!(block = %config.name, "Block loaded without behavior");
                }
            }
            None => warn!("Block has no name, nothing to load"),
        }

        status::finish_load(block, UnitKind::Block);
        block.clone()
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{Document, UnitStatus};

    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::module::Module;
    use crate::testing::{block_loader, decorated_section};

    fn first_block(section: &Element) -> Element {
        section
            .find(|e| e.has_class("block"))
            .expect("decorated block")
    }

    #[test]
    fn test_block_config_derivation() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let modules = crate::testing::module_loader(&doc, &catalog);
        let blocks = BlockLoader::new(modules, "/code/", Telemetry::disabled(doc.clone()));
        let block = doc.create_element("div").with_class("cards");

        assert_eq!(
            blocks.block_config(&block),
            Some(BlockConfig {
                name: "cards".to_string(),
                script_path: "/code/blocks/cards/cards.js".to_string(),
                style_path: Some("/code/blocks/cards/cards.css".to_string()),
            })
        );
        assert_eq!(blocks.block_config(&doc.create_element("div")), None);
    }

    #[test]
    fn test_patchers_fold_in_registration_order() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let blocks = block_loader(&doc, &catalog);
        blocks.add_patcher(Arc::new(|mut config: BlockConfig, _: &BlockConfig| {
            config.script_path = format!("/v2{}", config.script_path);
            config
        }));
        blocks.add_patcher(Arc::new(|mut config: BlockConfig, original: &BlockConfig| {
            config.style_path = None;
            config.script_path = format!("{}?from={}", config.script_path, original.script_path);
            config
        }));
        let block = doc.create_element("div").with_class("hero");

        let config = blocks.block_config(&block).unwrap();
        assert_eq!(blocks.patcher_count(), 2);
        assert_eq!(config.script_path, "/v2/blocks/hero/hero.js?from=/blocks/hero/hero.js");
        assert_eq!(config.style_path, None);
    }

    #[tokio::test]
    async fn test_throwing_block_still_loads() {
        let catalog = ModuleCatalog::new()
            .with_module(
                "/blocks/broken/broken.js",
                Module::new().entry(|_| async { Err("boom".into()) }),
            )
            .with_module(
                "/blocks/fine/fine.js",
                Module::new().entry(|args| async move {
                    if let Some(block) = &args.target {
                        block.add_class("decorated");
                    }
                    Ok(())
                }),
            );
        let doc = Document::new();
        let blocks = block_loader(&doc, &catalog);
        let section = decorated_section(&doc, &["broken", "fine"]);
        let all = section.find_all(|e| e.has_class("block"));

        for block in &all {
            let returned = blocks.load_block(block).await;
            assert_eq!(&returned, block);
        }

        assert_eq!(status::status(&all[0], UnitKind::Block), UnitStatus::Loaded);
        assert_eq!(status::status(&all[1], UnitKind::Block), UnitStatus::Loaded);
        assert!(all[1].has_class("decorated"));
    }

    #[tokio::test]
    async fn test_loading_block_is_noop() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let blocks = block_loader(&doc, &catalog);
        let section = decorated_section(&doc, &["hero"]);
        let block = first_block(&section);

        for state in ["loading", "loaded"] {
            block.set_attr("data-block-status", state);
            let before = doc.root().to_html();
            blocks.load_block(&block).await;
            assert_eq!(doc.root().to_html(), before);
        }
        assert!(catalog.requests().is_empty());
    }

    #[tokio::test]
    async fn test_block_without_name_finishes() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let blocks = block_loader(&doc, &catalog);
        let block = doc.create_element("div");

        blocks.load_block(&block).await;

        assert_eq!(status::status(&block, UnitKind::Block), UnitStatus::Loaded);
        assert!(catalog.requests().is_empty());
    }

    #[tokio::test]
    async fn test_block_module_sees_capabilities() {
        let catalog = ModuleCatalog::new().with_module(
            "/blocks/nested/nested.js",
            Module::new().entry(|args| async move {
                let caps = args.capabilities.clone();
                let Some(block) = args.target else {
                    return Ok(());
                };
                let inner = caps.build_block("inner", vec![vec!["x".into()]]);
                block.append(&inner);
                caps.decorate_block(&inner);
                caps.load_block(&inner).await;
                Ok(())
            }),
        );
        let doc = Document::new();
        let blocks = block_loader(&doc, &catalog);
        let section = decorated_section(&doc, &["nested"]);

        blocks.load_block(&first_block(&section)).await;

        let inner = section.find(|e| e.has_class("inner")).unwrap();
        assert_eq!(status::status(&inner, UnitKind::Block), UnitStatus::Loaded);
        assert!(catalog.imports().contains(&"/blocks/inner/inner.js".to_string()));
    }
}

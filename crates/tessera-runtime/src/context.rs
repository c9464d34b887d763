//! Page context construction.
//!
//! A [`PageContext`] owns every runtime object of one page.  The builder
//! wires them in a fixed order: page location, code base path, sampling,
//! then the loader chain from the module loader up to the page loader, and
//! finally the plugin and template registries with the experimentation
//! plugin (when enabled) and the entries declared in the configuration.

use std::fmt;
use std::sync::Arc;

use tessera_core::{BeaconSink, Document, PageLocation, ResourceHost, Telemetry};
use tessera_framework::{
    BlockLoader, ModuleCatalog, ModuleLoader, ModuleResolver, PageLoader, PluginRegistry,
    SectionLoader, TemplateRegistry, experimentation_plugin,
};
use tracing::{debug, info};
use url::Url;

use crate::config::TesseraConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Suffix of the bundle's main script, used to detect the code base path.
const MAIN_SCRIPT_SUFFIX: &str = "/scripts/scripts.js";

/// Everything the runtime knows about one page.
///
/// Cheap to clone; clones share the document, the loaders and the
/// registries.
#[derive(Clone)]
pub struct PageContext {
    document: Document,
    location: Option<PageLocation>,
    config: Arc<TesseraConfig>,
    lighthouse: bool,
    telemetry: Telemetry,
    blocks: BlockLoader,
    page: PageLoader,
    plugins: Arc<PluginRegistry>,
    templates: TemplateRegistry,
}

impl PageContext {
    pub fn builder(document: Document) -> PageContextBuilder {
        PageContextBuilder::new(document)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The page URL, when one was configured.
    pub fn location(&self) -> Option<&PageLocation> {
        self.location.as_ref()
    }

    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    /// Base path of the code bundle, without a trailing `/`.
    pub fn code_base_path(&self) -> &str {
        self.blocks.code_base_path()
    }

    /// `true` when the page URL carries `lighthouse=on`.
    pub fn is_lighthouse(&self) -> bool {
        self.lighthouse
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn modules(&self) -> &ModuleLoader {
        self.blocks.modules()
    }

    pub fn blocks(&self) -> &BlockLoader {
        &self.blocks
    }

    pub fn sections(&self) -> &SectionLoader {
        self.page.sections()
    }

    pub fn page(&self) -> &PageLoader {
        &self.page
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }
}

impl fmt::Debug for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("location", &self.location.as_ref().map(PageLocation::href))
            .field("code_base_path", &self.code_base_path())
            .field("lighthouse", &self.lighthouse)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// PageContextBuilder
// =============================================================================

/// Builder for [`PageContext`].
///
/// ```rust,ignore
/// let catalog = ModuleCatalog::new().with_module("/blocks/hero/hero.js", hero());
/// let ctx = PageContext::builder(doc)
///     .catalog(catalog)
///     .config(config)
///     .build()?;
/// ```
pub struct PageContextBuilder {
    document: Document,
    host: Option<Arc<dyn ResourceHost>>,
    resolver: Option<Arc<dyn ModuleResolver>>,
    beacon: Option<Arc<dyn BeaconSink>>,
    config: TesseraConfig,
}

impl PageContextBuilder {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            host: None,
            resolver: None,
            beacon: None,
            config: TesseraConfig::default(),
        }
    }

    /// Replaces the page document.
    pub fn document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }

    /// Host that fetches stylesheets, scripts and images.
    pub fn host(mut self, host: Arc<dyn ResourceHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Resolver that imports behavior modules.
    pub fn resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Uses `catalog` as both host and resolver.
    pub fn catalog(self, catalog: ModuleCatalog) -> Self {
        let catalog = Arc::new(catalog);
        self.host(catalog.clone()).resolver(catalog)
    }

    /// Sink for telemetry beacons.  Without one nothing is sent.
    pub fn beacon(mut self, sink: Arc<dyn BeaconSink>) -> Self {
        self.beacon = Some(sink);
        self
    }

    pub fn config(mut self, config: TesseraConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> RuntimeResult<PageContext> {
        let host = self.host.ok_or(RuntimeError::MissingHost("resource host"))?;
        let resolver = self
            .resolver
            .ok_or(RuntimeError::MissingHost("module resolver"))?;
        let document = self.document;
        let config = self.config;

        let location = match &config.page.url {
            Some(url) => Some(PageLocation::parse(url).map_err(|e| {
                RuntimeError::InvalidPageUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let code_base_path = match &config.page.code_base_path {
            Some(path) => path.clone(),
            None => detect_code_base_path(&document, location.as_ref()).unwrap_or_default(),
        };
        let lighthouse = location.as_ref().is_some_and(|l| l.flag("lighthouse"));

        let origin = location.as_ref().map(PageLocation::origin);
        let settings = config.telemetry.to_settings(origin.as_deref());
        let telemetry = Telemetry::new(document.clone(), location.clone(), settings, self.beacon);

        let modules = ModuleLoader::new(document.clone(), host, resolver);
        let blocks = BlockLoader::new(modules, code_base_path, telemetry.clone());
        let page = PageLoader::new(SectionLoader::new(blocks.clone()));
        let plugins = Arc::new(PluginRegistry::new(&blocks));
        let templates = TemplateRegistry::new(plugins.clone());

        if config.experimentation.enabled {
            let options = config.experimentation.to_options();
            let id = plugins.add(experimentation_plugin(blocks.code_base_path(), &options))?;
            debug!(plugin = %id, "Registered experimentation plugin");
        }
        for entry in &config.plugins {
            let id = plugins.add(entry.to_spec()?)?;
            debug!(plugin = %id, "Registered configured plugin");
        }
        for entry in &config.templates {
            let id = templates.add(entry.to_spec()?)?;
            debug!(template = %id, "Registered configured template");
        }

        info!(
            url = ?location.as_ref().map(PageLocation::href),
            code_base_path = %blocks.code_base_path(),
            lighthouse,
            plugins = plugins.len(),
            "Page context ready"
        );

        Ok(PageContext {
            document,
            location,
            config: Arc::new(config),
            lighthouse,
            telemetry,
            blocks,
            page,
            plugins,
            templates,
        })
    }
}

/// Reads the code base path off the `<script>` in `head` that loads the
/// bundle's main script, e.g. `/code` for `/code/scripts/scripts.js`.
fn detect_code_base_path(doc: &Document, location: Option<&PageLocation>) -> Option<String> {
    let script = doc.head().find(|e| {
        e.is("script")
            && e
                .attr("src")
                .is_some_and(|src| src.ends_with(MAIN_SCRIPT_SUFFIX))
    })?;
    let src = script.attr("src")?;

    let path = match location {
        Some(location) => location.join(&src).ok()?.path().to_string(),
        None => match Url::parse(&src) {
            Ok(url) => url.path().to_string(),
            Err(_) => src,
        },
    };

    path.find(MAIN_SCRIPT_SUFFIX)
        .map(|end| path[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginEntryConfig;
    use serde_json::json;
    use tessera_framework::Phase;

    fn head_script(doc: &Document, src: &str) {
        doc.head()
            .append(&doc.create_element("script").with_attr("src", src));
    }

    #[test]
    fn test_missing_host() {
        let result = PageContext::builder(Document::new()).build();
        assert!(matches!(result, Err(RuntimeError::MissingHost(_))));
    }

    #[test]
    fn test_invalid_page_url() {
        let config = TesseraConfig {
            page: crate::config::PageConfig {
                url: Some("not a url".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = PageContext::builder(Document::new())
            .catalog(ModuleCatalog::new())
            .config(config)
            .build();
        assert!(matches!(result, Err(RuntimeError::InvalidPageUrl { .. })));
    }

    #[test]
    fn test_code_base_path_detected_from_head() {
        let doc = Document::new();
        head_script(&doc, "/code/scripts/scripts.js");
        let mut config = TesseraConfig::default();
        config.page.url = Some("https://www.example.com/page?lighthouse=on".to_string());

        let ctx = PageContext::builder(doc)
            .catalog(ModuleCatalog::new())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(ctx.code_base_path(), "/code");
        assert!(ctx.is_lighthouse());
    }

    #[test]
    fn test_code_base_path_absolute_script_without_location() {
        let doc = Document::new();
        head_script(&doc, "https://cdn.example.com/scripts/scripts.js");
        let ctx = PageContext::builder(doc)
            .catalog(ModuleCatalog::new())
            .build()
            .unwrap();
        assert_eq!(ctx.code_base_path(), "");
        assert!(!ctx.is_lighthouse());
    }

    #[test]
    fn test_configured_code_base_path_wins() {
        let doc = Document::new();
        head_script(&doc, "/code/scripts/scripts.js");
        let mut config = TesseraConfig::default();
        config.page.code_base_path = Some("/bundle".to_string());

        let ctx = PageContext::builder(doc)
            .catalog(ModuleCatalog::new())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(ctx.code_base_path(), "/bundle");
    }

    #[test]
    fn test_declared_plugins_and_templates_registered() {
        let config = TesseraConfig {
            plugins: vec![PluginEntryConfig {
                id: None,
                url: "/plugins/experimentation/".to_string(),
                load_phase: Phase::Lazy,
                options: json!({ "audiences": ["mobile"] }),
            }],
            templates: vec![PluginEntryConfig {
                id: Some("blog".to_string()),
                url: "/templates/blog".to_string(),
                load_phase: Phase::Eager,
                options: json!({}),
            }],
            ..Default::default()
        };

        let ctx = PageContext::builder(Document::new())
            .catalog(ModuleCatalog::new())
            .config(config)
            .build()
            .unwrap();

        assert_eq!(ctx.plugins().ids(), vec!["experimentation", "blog"]);
        let entry = ctx.plugins().get("experimentation").unwrap();
        assert_eq!(entry.config().load_phase, Phase::Lazy);
        assert!(entry.config().condition.is_none());
        assert!(ctx.templates().get("blog").unwrap().config().condition.is_some());
    }

    #[test]
    fn test_experimentation_plugin_registered_first_when_enabled() {
        let doc = Document::new();
        head_script(&doc, "/code/scripts/scripts.js");
        let mut config = TesseraConfig {
            plugins: vec![PluginEntryConfig {
                id: Some("martech".to_string()),
                url: "/plugins/martech".to_string(),
                load_phase: Phase::Lazy,
                options: json!({}),
            }],
            ..Default::default()
        };
        config.experimentation.enabled = true;

        let ctx = PageContext::builder(doc)
            .catalog(ModuleCatalog::new())
            .config(config)
            .build()
            .unwrap();

        assert_eq!(ctx.plugins().ids(), vec!["experimentation", "martech"]);
        let entry = ctx.plugins().get("experimentation").unwrap();
        assert_eq!(
            entry.config().url.as_deref(),
            Some("/code/plugins/experimentation/src/index.js")
        );
        assert_eq!(entry.config().load_phase, Phase::Eager);
        assert!(entry.config().condition.is_some());
        assert_eq!(entry.config().options["prod_host"], "www.my-site.com");
    }
}

//! Page bootstrap.
//!
//! [`PageRuntime`] drives one page through its three stages:
//!
//! 1. **eager**: template/theme classes, eager plugins, decoration of
//!    `main`, then the first section (waiting for its first image).
//! 2. **lazy**: the remaining sections, lazy plugins, header and footer,
//!    then the sidekick integration of the experimentation plugin.
//! 3. **delayed**: after `page.delayed_ms`, the `delayed` plugin phase.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tessera_runtime::PageRuntime;
//!
//! let runtime = PageRuntime::builder()
//!     .document(doc)
//!     .catalog(catalog)
//!     .config_file("tessera.toml")
//!     .build()?;
//!
//! let stats = runtime.load_page().await;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tessera_core::status::{self, UnitKind, UnitStatus};
use tessera_core::{BeaconSink, Document, Element, ResourceHost};
use tessera_framework::{
    EXPERIMENTATION_ID, LoadReport, ModuleCatalog, ModuleResolver, Phase, RunReport,
    decorate_blocks, decorate_sections, decorate_template_and_theme, load_footer, load_header,
    load_sidekick_handler,
};
use tracing::{Instrument, debug, info, info_span};

use crate::config::{ConfigLoader, TesseraConfig, validate_config};
use crate::context::{PageContext, PageContextBuilder};
use crate::error::RuntimeResult;
use crate::logging;

/// Name of the phase run by [`PageRuntime::load_delayed`].
pub const DELAYED_PHASE: &str = "delayed";

/// Outcome of one plugin phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub phase: Phase,
    pub load: LoadReport,
    pub run: RunReport,
}

/// Summary of a full page load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageStats {
    /// One report per plugin phase, in the order they ran.
    pub stages: Vec<StageReport>,
    /// Sections found in `main`.
    pub sections: usize,
    /// Sections that reached `loaded`.
    pub sections_loaded: usize,
    /// Blocks anywhere in `body` that reached `loaded`.
    pub blocks_loaded: usize,
}

/// Bootstraps one page.
///
/// Cheap to clone; clones share the [`PageContext`].
#[derive(Debug, Clone)]
pub struct PageRuntime {
    context: PageContext,
}

impl PageRuntime {
    /// Creates a runtime builder that loads configuration from files and
    /// the environment.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Wraps an already built context.  Logging is left untouched.
    pub fn new(context: PageContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    pub fn config(&self) -> &TesseraConfig {
        self.context.config()
    }

    fn main(&self) -> Option<Element> {
        self.context.document().main()
    }

    /// Runs the eager stage.
    pub async fn load_eager(&self) -> StageReport {
        let span = info_span!("load_eager");
        async {
            let doc = self.context.document();
            decorate_template_and_theme(doc);

            let plugins = self.context.plugins();
            let load = plugins.load(Phase::Eager).await;

            let main = self.main();
            if let Some(main) = &main {
                decorate_sections(main);
                decorate_blocks(main);
                doc.body().add_class("appear");
            } else {
                debug!("Document has no <main>, nothing to decorate");
            }

            let run = plugins.run(Phase::Eager).await;

            if let Some(first) = main
                .as_ref()
                .and_then(|m| m.find(|e| e.is_div_with_class("section")))
            {
                let page = self.context.page().clone();
                self.context
                    .sections()
                    .load_section_with(&first, move |section| async move {
                        page.wait_for_first_image(section).await;
                    })
                    .await;
            }

            StageReport {
                phase: Phase::Eager,
                load,
                run,
            }
        }
        .instrument(span)
        .await
    }

    /// Runs the lazy stage.
    pub async fn load_lazy(&self) -> StageReport {
        let span = info_span!("load_lazy");
        async {
            if let Some(main) = self.main() {
                self.context.page().load_sections(&main).await;
            }

            let plugins = self.context.plugins();
            let load = plugins.load(Phase::Lazy).await;

            let page_config = &self.config().page;
            let body = self.context.document().body();
            if page_config.header
                && let Some(header) = body.find(|e| e.is("header"))
            {
                load_header(self.context.blocks(), &header).await;
            }
            if page_config.footer
                && let Some(footer) = body.find(|e| e.is("footer"))
            {
                load_footer(self.context.blocks(), &footer).await;
            }

            let run = plugins.run(Phase::Lazy).await;
            if plugins.has(EXPERIMENTATION_ID) {
                load_sidekick_handler(self.context.blocks()).await;
            }
            self.context.telemetry().sample("lazy", json!({}));

            StageReport {
                phase: Phase::Lazy,
                load,
                run,
            }
        }
        .instrument(span)
        .await
    }

    /// Waits `page.delayed_ms`, then loads and runs the `delayed` phase.
    pub async fn load_delayed(&self) -> StageReport {
        let delay = self.config().page.delayed_ms;
        if delay > 0 {
            debug!(delay_ms = delay, "Waiting before the delayed stage");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.run_phase(DELAYED_PHASE).await
    }

    /// Loads and runs an arbitrary plugin phase.
    pub async fn run_phase(&self, phase: impl Into<Phase>) -> StageReport {
        let phase = phase.into();
        let span = info_span!("stage", phase = %phase);
        async {
            let plugins = self.context.plugins();
            let load = plugins.load(phase.clone()).await;
            let run = plugins.run(phase.clone()).await;
            StageReport { phase, load, run }
        }
        .instrument(span)
        .await
    }

    /// Runs all three stages and summarises the result.
    pub async fn load_page(&self) -> PageStats {
        self.context.telemetry().sample("top", json!({}));

        let stages = vec![
            self.load_eager().await,
            self.load_lazy().await,
            self.load_delayed().await,
        ];

        let sections = self
            .main()
            .map(|m| m.find_all(|e| e.is_div_with_class("section")))
            .unwrap_or_default();
        let sections_loaded = sections
            .iter()
            .filter(|s| status::status(s, UnitKind::Section) == UnitStatus::Loaded)
            .count();
        let blocks_loaded = self
            .context
            .document()
            .body()
            .find_all(|e| {
                e.has_class("block") && status::status(e, UnitKind::Block) == UnitStatus::Loaded
            })
            .len();

        let stats = PageStats {
            stages,
            sections: sections.len(),
            sections_loaded,
            blocks_loaded,
        };
        info!(
            sections = stats.sections,
            sections_loaded = stats.sections_loaded,
            blocks_loaded = stats.blocks_loaded,
            "Page loaded"
        );
        stats
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`PageRuntime`] with loaded, validated configuration.
///
/// Logging is initialised from the configuration on [`build`](Self::build).
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    context: PageContextBuilder,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            context: PageContextBuilder::new(Document::new()),
        }
    }

    /// The page document.  Defaults to an empty document.
    pub fn document(mut self, document: Document) -> Self {
        self.context = self.context.document(document);
        self
    }

    pub fn host(mut self, host: Arc<dyn ResourceHost>) -> Self {
        self.context = self.context.host(host);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.context = self.context.resolver(resolver);
        self
    }

    pub fn catalog(mut self, catalog: ModuleCatalog) -> Self {
        self.context = self.context.catalog(catalog);
        self
    }

    pub fn beacon(mut self, sink: Arc<dyn BeaconSink>) -> Self {
        self.context = self.context.beacon(sink);
        self
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables `TESSERA_*` environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically.
    pub fn merge(mut self, config: TesseraConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<PageRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Runtime initialized from configuration"
        );

        let context = self.context.config(config).build()?;
        Ok(PageRuntime::new(context))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

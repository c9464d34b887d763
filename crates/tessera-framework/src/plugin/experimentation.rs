//! The experimentation plugin.
//!
//! Experiments, campaigns and audiences are authored as page metadata
//! (`<meta name="experiment">`, `<meta property="campaign:…">`, …) or inside
//! a section metadata table.  [`experimentation_plugin`] builds the eager
//! plugin entry that loads the experimentation engine only on pages that
//! carry such metadata.  Once the lazy phase has run,
//! [`load_sidekick_handler`] adds the authoring-tool integration when an
//! authoring sidekick is present on the page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_core::Document;
use tracing::{debug, warn};

use super::condition::Condition;
use super::spec::{Phase, PluginConfig, PluginSpec};
use crate::block::BlockLoader;
use crate::decorate::SECTION_METADATA;

/// Registry id of the experimentation plugin.
pub const EXPERIMENTATION_ID: &str = "experimentation";

/// Engine entry point, relative to the code base path.
pub const EXPERIMENTATION_SCRIPT: &str = "/plugins/experimentation/src/index.js";

/// Authoring-tool integration, relative to the code base path.
pub const SIDEKICK_SCRIPT: &str = "/tools/sidekick/aem-experimentation.js";

const META_NAME_PREFIXES: &[&str] = &["experiment", "campaign-", "audience-"];
const META_PROPERTY_PREFIXES: &[&str] = &["campaign:", "audience:"];
const SECTION_KEYWORDS: &[&str] = &["experiment", "campaign", "audience"];
const SIDEKICK_TAGS: &[&str] = &["helix-sidekick", "aem-sidekick"];

/// Viewport width range selecting an audience.  Both bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
}

impl Audience {
    pub fn matches(&self, viewport_width: u32) -> bool {
        self.min_width.is_none_or(|min| viewport_width >= min)
            && self.max_width.is_none_or(|max| viewport_width <= max)
    }
}

/// Options handed to the experimentation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentationOptions {
    /// Production host; experiments only report from here.
    pub prod_host: String,
    /// Named audiences.
    pub audiences: BTreeMap<String, Audience>,
}

impl Default for ExperimentationOptions {
    fn default() -> Self {
        let audiences = BTreeMap::from([
            (
                "mobile".to_string(),
                Audience {
                    min_width: None,
                    max_width: Some(599),
                },
            ),
            (
                "desktop".to_string(),
                Audience {
                    min_width: Some(600),
                    max_width: None,
                },
            ),
        ]);
        Self {
            prod_host: "www.my-site.com".to_string(),
            audiences,
        }
    }
}

impl ExperimentationOptions {
    /// Names of the audiences a viewport of `width` pixels belongs to.
    pub fn resolve_audiences(&self, width: u32) -> Vec<&str> {
        self.audiences
            .iter()
            .filter(|(_, audience)| audience.matches(width))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Returns `true` if the page carries experiment, campaign or audience
/// metadata, either in `head` or in a section metadata table.
pub fn is_experimentation_enabled(doc: &Document) -> bool {
    let in_head = doc.head().find(|e| {
        e.is("meta")
            && (has_prefix(e.attr("name"), META_NAME_PREFIXES)
                || has_prefix(e.attr("property"), META_PROPERTY_PREFIXES))
    });
    if in_head.is_some() {
        return true;
    }

    doc.root()
        .find_all(|e| e.has_class(SECTION_METADATA))
        .iter()
        .flat_map(|table| table.find_all(|e| e.is("div")))
        .any(|cell| {
            let text = cell.text().to_lowercase();
            SECTION_KEYWORDS.iter().any(|k| text.contains(k))
        })
}

fn has_prefix(value: Option<String>, prefixes: &[&str]) -> bool {
    value.is_some_and(|v| prefixes.iter().any(|p| v.starts_with(p)))
}

/// Condition holding on pages with experimentation metadata.
pub fn experimentation_condition() -> Condition {
    Condition::new(|args| is_experimentation_enabled(&args.document))
}

/// The eager experimentation plugin, loading the engine from the code base.
pub fn experimentation_plugin(code_base_path: &str, options: &ExperimentationOptions) -> PluginSpec {
    let options = serde_json::to_value(options).unwrap_or_default();
    PluginSpec::with_config(
        EXPERIMENTATION_ID,
        PluginConfig::new()
            .url(format!("{code_base_path}{EXPERIMENTATION_SCRIPT}"))
            .load_phase(Phase::Eager)
            .condition(experimentation_condition())
            .options(options),
    )
}

/// Loads the sidekick integration script when an authoring sidekick element
/// is on the page.  Returns `true` if the script was loaded.
pub async fn load_sidekick_handler(blocks: &BlockLoader) -> bool {
    let doc = blocks.document();
    if doc
        .root()
        .find(|e| SIDEKICK_TAGS.iter().any(|tag| e.is(tag)))
        .is_none()
    {
        debug!("No sidekick on the page");
        return false;
    }

    let src = format!("{}{SIDEKICK_SCRIPT}", blocks.code_base_path());
    match blocks.modules().load_script(&src, &[("type", "module")]).await {
        Ok(()) => true,
        Err(e) => {
            warn!(src = %src, error = %e, "Failed to load the sidekick experimentation handler");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::Element;

    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::module::Module;
    use crate::plugin::PluginRegistry;
    use crate::testing::block_loader;

    fn meta(doc: &Document, attr: &str, value: &str) {
        doc.head().append(
            &doc.create_element("meta")
                .with_attr(attr, value)
                .with_attr("content", "on"),
        );
    }

    fn section_metadata(doc: &Document, key: &str) -> Element {
        let table = doc.create_element("div").with_class(SECTION_METADATA).with_child(
            &doc.create_element("div")
                .with_child(&doc.create_element("div").with_text(key))
                .with_child(&doc.create_element("div").with_text("value")),
        );
        doc.body().append(&doc.create_element("div").with_child(&table));
        table
    }

    #[test]
    fn test_enabled_by_head_metadata() {
        for (attr, value) in [
            ("name", "experiment"),
            ("name", "experiment-variants"),
            ("name", "campaign-summer"),
            ("name", "audience-mobile"),
            ("property", "campaign:summer"),
            ("property", "audience:mobile"),
        ] {
            let doc = Document::new();
            meta(&doc, attr, value);
            assert!(is_experimentation_enabled(&doc), "{attr}={value}");
        }
    }

    #[test]
    fn test_unrelated_metadata_does_not_enable() {
        let doc = Document::new();
        meta(&doc, "name", "template");
        meta(&doc, "name", "campaign");
        meta(&doc, "property", "og:title");
        section_metadata(&doc, "Style");
        assert!(!is_experimentation_enabled(&doc));
    }

    #[test]
    fn test_enabled_by_section_metadata() {
        let doc = Document::new();
        section_metadata(&doc, "Audience");
        assert!(is_experimentation_enabled(&doc));

        let doc = Document::new();
        section_metadata(&doc, "CAMPAIGN");
        assert!(is_experimentation_enabled(&doc));
    }

    #[test]
    fn test_default_audiences() {
        let options = ExperimentationOptions::default();
        assert_eq!(options.resolve_audiences(375), vec!["mobile"]);
        assert_eq!(options.resolve_audiences(600), vec!["desktop"]);
        assert_eq!(options.prod_host, "www.my-site.com");
    }

    #[tokio::test]
    async fn test_plugin_loads_only_with_metadata() {
        let script = "/code/plugins/experimentation/src/index.js";
        let catalog = ModuleCatalog::new().with_module(script, Module::new());

        let plain = Document::new();
        let plugins = PluginRegistry::new(&block_loader(&plain, &catalog));
        plugins
            .add(experimentation_plugin("/code", &ExperimentationOptions::default()))
            .unwrap();
        let report = plugins.load(Phase::Eager).await;
        assert_eq!(report.pruned, vec![EXPERIMENTATION_ID]);
        assert!(catalog.imports().is_empty());

        let doc = Document::new();
        meta(&doc, "name", "experiment");
        let plugins = PluginRegistry::new(&block_loader(&doc, &catalog));
        plugins
            .add(experimentation_plugin("/code", &ExperimentationOptions::default()))
            .unwrap();
        let report = plugins.load(Phase::Eager).await;
        assert_eq!(report.loaded, vec![EXPERIMENTATION_ID]);
        assert_eq!(catalog.imports(), vec![script]);

        let entry = plugins.get(EXPERIMENTATION_ID).unwrap();
        assert_eq!(entry.config().options["audiences"]["mobile"]["max_width"], 599);
    }

    #[tokio::test]
    async fn test_sidekick_handler_needs_sidekick() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let blocks = block_loader(&doc, &catalog);
        assert!(!load_sidekick_handler(&blocks).await);
        assert!(!doc.has_head_resource("script", "src", SIDEKICK_SCRIPT));

        doc.body().append(&doc.create_element("aem-sidekick"));
        assert!(load_sidekick_handler(&blocks).await);
        assert!(doc.has_head_resource("script", "src", SIDEKICK_SCRIPT));
    }
}

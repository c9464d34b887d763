//! Section loading.

use std::future::Future;

use futures::future;
use tessera_core::Element;
use tessera_core::status::{self, UnitKind};
use tracing::{Instrument, debug, debug_span};

use crate::block::BlockLoader;

/// Loads the blocks of a section, one after the other.
#[derive(Clone)]
pub struct SectionLoader {
    blocks: BlockLoader,
}

impl SectionLoader {
    pub fn new(blocks: BlockLoader) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &BlockLoader {
        &self.blocks
    }

    /// Loads `section` with no post-load callback.
    pub async fn load_section(&self, section: &Element) {
        self.load_section_with(section, |_| future::ready(())).await;
    }

    /// Loads `section`, awaiting `on_loaded` after its blocks.
    ///
    /// A no-op unless the section's status is absent or `initialized`.
    /// Blocks (`div.block` descendants) load strictly in document order,
    /// each one only after the previous has finished.  The section is then
    /// marked `loaded` and made visible.
    pub async fn load_section_with<F, Fut>(&self, section: &Element, on_loaded: F)
    where
        F: FnOnce(Element) -> Fut,
        Fut: Future<Output = ()>,
    {
        if !status::try_begin_load(section, UnitKind::Section) {
            debug!("Section already loading or loaded");
            return;
        }

        let blocks = section.find_all(|e| e.is_div_with_class("block"));
        let span = debug_span!("section", blocks = blocks.len());
        async {
            for block in &blocks {
                self.blocks.load_block(block).await;
            }
            on_loaded(section.clone()).await;
        }
        .instrument(span)
        .await;

        status::finish_load(section, UnitKind::Section);
        section.show();
        debug!(blocks = blocks.len(), "Section loaded");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tessera_core::{Document, UnitStatus};

    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::module::Module;
    use crate::testing::{block_loader, decorated_section};

    fn recording_module(log: Arc<Mutex<Vec<String>>>, name: &'static str, delay: u64) -> Module {
        Module::new().entry(move |_| {
            let log = log.clone();
            async move {
                log.lock().push(format!("start {name}"));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().push(format!("end {name}"));
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_blocks_load_sequentially_in_document_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = ModuleCatalog::new()
            .with_module("/blocks/a/a.js", recording_module(log.clone(), "a", 20))
            .with_module("/blocks/b/b.js", recording_module(log.clone(), "b", 1))
            .with_module("/blocks/c/c.js", recording_module(log.clone(), "c", 5));
        let doc = Document::new();
        let loader = SectionLoader::new(block_loader(&doc, &catalog));
        let section = decorated_section(&doc, &["a", "b", "c"]);

        loader.load_section(&section).await;

        assert_eq!(
            *log.lock(),
            vec!["start a", "end a", "start b", "end b", "start c", "end c"]
        );
        assert_eq!(status::status(&section, UnitKind::Section), UnitStatus::Loaded);
        assert!(!section.is_hidden());
    }

    #[tokio::test]
    async fn test_on_loaded_runs_after_blocks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog =
            ModuleCatalog::new().with_module("/blocks/a/a.js", recording_module(log.clone(), "a", 1));
        let doc = Document::new();
        let loader = SectionLoader::new(block_loader(&doc, &catalog));
        let section = decorated_section(&doc, &["a"]);

        let callback_log = log.clone();
        loader
            .load_section_with(&section, |s| async move {
                assert_eq!(status::status(&s, UnitKind::Section), UnitStatus::Loading);
                callback_log.lock().push("loaded".to_string());
            })
            .await;

        assert_eq!(*log.lock(), vec!["start a", "end a", "loaded"]);
    }

    #[tokio::test]
    async fn test_loaded_section_is_noop() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let loader = SectionLoader::new(block_loader(&doc, &catalog));
        let section = decorated_section(&doc, &["a"]);
        section.set_attr("data-section-status", "loaded");
        let before = section.to_html();

        loader.load_section(&section).await;

        assert_eq!(section.to_html(), before);
        assert!(catalog.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_section_status_is_noop() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let loader = SectionLoader::new(block_loader(&doc, &catalog));
        let section = decorated_section(&doc, &["a"]);
        section.set_attr("data-section-status", "pending");

        loader.load_section(&section).await;

        assert!(catalog.requests().is_empty());
        assert!(section.is_hidden());
    }
}

//! Page loading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tessera_core::Element;
use tracing::{Instrument, debug, info_span};

use crate::section::SectionLoader;

/// Loads every section of a page, top to bottom.
///
/// Owns the page's one-shot enhancement point: after the first section
/// finishes, the telemetry enhancement hook fires if a handler is installed
/// at that moment.  The point is consumed on first use, so the hook fires at
/// most once per page however many times [`load_sections`] runs.
///
/// [`load_sections`]: PageLoader::load_sections
#[derive(Clone)]
pub struct PageLoader {
    sections: SectionLoader,
    enhanced: Arc<AtomicBool>,
}

impl PageLoader {
    pub fn new(sections: SectionLoader) -> Self {
        Self {
            sections,
            enhanced: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sections(&self) -> &SectionLoader {
        &self.sections
    }

    /// Loads every `div.section` under `root` sequentially.
    ///
    /// Sections already loading or loaded are skipped by the section loader
    /// but still count for the enhancement point.
    pub async fn load_sections(&self, root: &Element) {
        let sections = root.find_all(|e| e.is_div_with_class("section"));
        let span = info_span!("sections", count = sections.len());
        async {
            for (i, section) in sections.iter().enumerate() {
                self.sections.load_section(section).await;
                if i == 0 {
                    self.fire_enhancement();
                }
            }
        }
        .instrument(span)
        .await;
    }

    /// Readies the first image of `section` for the largest contentful paint.
    ///
    /// Marks it `loading="eager"` and waits for the host to fetch it.  Images
    /// without a source, or already marked `complete`, resolve immediately.
    /// Fetch failures are ignored.
    pub async fn wait_for_first_image(&self, section: Element) {
        let Some(image) = section.find(|e| e.is("img")) else {
            return;
        };
        let Some(src) = image.attr("src").filter(|_| !image.has_attr("complete")) else {
            return;
        };
        image.set_attr("loading", "eager");
        let host = self.sections.blocks().modules().host().clone();
        if let Err(e) = host.fetch_image(&src).await {
            debug!(src = %src, error = %e, "First image failed to load");
        }
    }

    fn fire_enhancement(&self) {
        if self.enhanced.swap(true, Ordering::AcqRel) {
            return;
        }
        let fired = self.sections.blocks().telemetry().enhance();
        debug!(fired, "Enhancement point reached");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;
    use tessera_core::Document;
    use tessera_core::status::{self, UnitKind};

    use super::*;
    use crate::catalog::{ModuleCatalog, Request};
    use crate::module::Module;
    use crate::testing::{block_loader, decorated_section};

    fn page_loader(doc: &Document, catalog: &ModuleCatalog) -> PageLoader {
        PageLoader::new(SectionLoader::new(block_loader(doc, catalog)))
    }

    #[tokio::test]
    async fn test_sections_load_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut catalog = ModuleCatalog::new();
        for name in ["one", "two", "three"] {
            let order = order.clone();
            catalog = catalog.with_module(
                format!("/blocks/{name}/{name}.js"),
                Module::new().entry(move |_| {
                    let order = order.clone();
                    async move {
                        order.lock().push(name);
                        Ok(())
                    }
                }),
            );
        }
        let doc = Document::new();
        let sections: Vec<_> = ["one", "two", "three"]
            .iter()
            .map(|name| decorated_section(&doc, &[*name]))
            .collect();

        page_loader(&doc, &catalog).load_sections(&doc.body()).await;

        assert_eq!(*order.lock(), vec!["one", "two", "three"]);
        for section in &sections {
            assert!(status::status(section, UnitKind::Section).is_started());
            assert!(!section.is_hidden());
        }
    }

    #[tokio::test]
    async fn test_enhancement_fires_once_after_first_section() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        let first = decorated_section(&doc, &[]);
        decorated_section(&doc, &[]);
        let loader = page_loader(&doc, &catalog);

        let calls = Arc::new(AtomicUsize::new(0));
        let observed = calls.clone();
        let first_section = first.clone();
        loader
            .sections()
            .blocks()
            .telemetry()
            .set_enhancer(Arc::new(move || {
                assert!(!first_section.is_hidden());
                observed.fetch_add(1, Ordering::SeqCst);
            }));

        loader.load_sections(&doc.body()).await;
        loader.load_sections(&doc.body()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enhancement_without_handler_is_skipped() {
        let catalog = ModuleCatalog::new();
        let doc = Document::new();
        decorated_section(&doc, &[]);
        let loader = page_loader(&doc, &catalog);

        loader.load_sections(&doc.body()).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let observed = calls.clone();
        loader
            .sections()
            .blocks()
            .telemetry()
            .set_enhancer(Arc::new(move || {
                observed.fetch_add(1, Ordering::SeqCst);
            }));
        loader.load_sections(&doc.body()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_for_first_image() {
        let catalog = ModuleCatalog::new().with_failing("/media/broken.png");
        let doc = Document::new();
        let section = decorated_section(&doc, &[]);
        let image = doc.create_element("img").with_attr("src", "/media/hero.png");
        section.append(&image);
        let loader = page_loader(&doc, &catalog);

        loader.wait_for_first_image(section.clone()).await;
        assert_eq!(image.attr("loading").as_deref(), Some("eager"));
        assert_eq!(
            catalog.requests(),
            vec![Request::Image("/media/hero.png".to_string())]
        );

        image.set_attr("src", "/media/broken.png");
        loader.wait_for_first_image(section).await;
    }
}

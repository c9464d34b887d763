//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use tessera_core::{Document, Element, Telemetry};

use crate::block::BlockLoader;
use crate::catalog::ModuleCatalog;
use crate::decorate::{decorate_blocks, decorate_sections};
use crate::loader::ModuleLoader;

pub(crate) fn module_loader(doc: &Document, catalog: &ModuleCatalog) -> ModuleLoader {
    ModuleLoader::new(doc.clone(), Arc::new(catalog.clone()), Arc::new(catalog.clone()))
}

/// A block loader with an empty code base path, so block `x` resolves to
/// `/blocks/x/x.js`.
pub(crate) fn block_loader(doc: &Document, catalog: &ModuleCatalog) -> BlockLoader {
    BlockLoader::new(module_loader(doc, catalog), "", Telemetry::disabled(doc.clone()))
}

/// Appends a decorated section holding one block per name to the document's
/// `main` (created on first use).
pub(crate) fn decorated_section(doc: &Document, blocks: &[&str]) -> Element {
    let main = doc.main().unwrap_or_else(|| {
        let main = doc.create_element("main");
        doc.body().append(&main);
        main
    });
    let staging = doc.create_element("main");
    let section = doc.create_element("div");
    for name in blocks {
        section.append(&doc.create_element("div").with_class(name));
    }
    staging.append(&section);
    decorate_sections(&staging);
    decorate_blocks(&staging);
    main.append(&section);
    section
}

//! The capability surface handed to externally loaded code.
//!
//! Block modules, plugins and templates never reach the runtime through
//! globals.  They receive a [`Capabilities`] value in their [`ModuleArgs`]
//! and call back into the core through it.
//!
//! [`ModuleArgs`]: crate::module::ModuleArgs

use std::fmt;

use serde_json::{Map, Value};
use tessera_core::{Document, Element, LoadResult, Telemetry};

use crate::block::BlockLoader;
use crate::decorate::{self, BlockCell};

/// Read-only core utilities.  Cheap to clone.
#[derive(Clone)]
pub struct Capabilities {
    blocks: BlockLoader,
}

impl Capabilities {
    pub(crate) fn new(blocks: BlockLoader) -> Self {
        Self { blocks }
    }

    /// The page document.
    pub fn document(&self) -> Document {
        self.blocks.document().clone()
    }

    /// Content of the `<meta>` tags named `name`.
    pub fn get_metadata(&self, name: &str) -> String {
        tessera_core::get_metadata(self.blocks.document(), name)
    }

    pub fn decorate_block(&self, block: &Element) {
        decorate::decorate_block(block);
    }

    pub async fn load_block(&self, block: &Element) -> Element {
        self.blocks.load_block(block).await
    }

    pub async fn load_css(&self, href: &str) -> LoadResult<()> {
        self.blocks.modules().load_css(href).await
    }

    pub async fn load_script(&self, src: &str, attrs: &[(&str, &str)]) -> LoadResult<()> {
        self.blocks.modules().load_script(src, attrs).await
    }

    /// The page's telemetry sampler.
    pub fn telemetry(&self) -> &Telemetry {
        self.blocks.telemetry()
    }

    pub fn to_class_name(&self, name: &str) -> String {
        tessera_core::to_class_name(name)
    }

    pub fn to_camel_case(&self, name: &str) -> String {
        tessera_core::to_camel_case(name)
    }

    pub fn read_block_config(&self, block: &Element) -> Map<String, Value> {
        decorate::read_block_config(block)
    }

    pub fn build_block(&self, name: &str, rows: Vec<Vec<BlockCell>>) -> Element {
        decorate::build_block(self.blocks.document(), name, rows)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("code_base_path", &self.blocks.code_base_path())
            .finish_non_exhaustive()
    }
}

//! Content decoration.
//!
//! Turns authored markup into units the loaders understand: top-level `div`s
//! of `main` become sections, `div`s nested two levels below a section
//! become blocks.  Both end up `initialized`; sections are hidden until
//! their [`SectionLoader`](crate::section::SectionLoader) reveals them.

use serde_json::{Map, Value};
use tessera_core::status::{self, UnitKind};
use tessera_core::{Document, Element, get_metadata, to_camel_case, to_class_name};
use tracing::{debug, trace};

use crate::block::BlockLoader;

/// Class of the wrapper holding non-`div` content of a section.
pub const DEFAULT_CONTENT_WRAPPER: &str = "default-content-wrapper";

/// Class of the block holding section metadata.
pub const SECTION_METADATA: &str = "section-metadata";

/// Tags that already give a block cell a structural wrapper.
const CELL_WRAPPERS: &[&str] = &[
    "p", "pre", "ul", "ol", "picture", "table", "h1", "h2", "h3", "h4", "h5", "h6",
];

// ─── Block configuration tables ──────────────────────────────────────────────

/// Reads a two-column key/value block.
///
/// Every row with at least two columns contributes one entry.  The key is
/// the class-name form of the first column's text.  The value is taken from
/// the second column, in order of preference: link targets, image sources,
/// paragraph texts, or its plain text.  Several links (images, paragraphs)
/// produce an array.
pub fn read_block_config(block: &Element) -> Map<String, Value> {
    let mut config = Map::new();
    for row in block.children_where(|e| e.is("div")) {
        let cols = row.children();
        let (Some(key_col), Some(value_col)) = (cols.first(), cols.get(1)) else {
            continue;
        };
        let key = to_class_name(&key_col.text());
        let value = column_value(value_col);
        trace!(key = %key, value = %value, "Block config entry");
        config.insert(key, value);
    }
    config
}

fn column_value(col: &Element) -> Value {
    let links: Vec<String> = col
        .find_all(|e| e.is("a"))
        .iter()
        .map(|a| a.attr("href").unwrap_or_default())
        .collect();
    if !links.is_empty() {
        return one_or_many(links);
    }

    let images: Vec<String> = col
        .find_all(|e| e.is("img"))
        .iter()
        .map(|img| img.attr("src").unwrap_or_default())
        .collect();
    if !images.is_empty() {
        return one_or_many(images);
    }

    let paragraphs: Vec<String> = col
        .find_all(|e| e.is("p"))
        .iter()
        .map(Element::text)
        .collect();
    if !paragraphs.is_empty() {
        return one_or_many(paragraphs);
    }

    Value::String(col.text())
}

fn one_or_many(mut values: Vec<String>) -> Value {
    if values.len() == 1 {
        Value::String(values.remove(0))
    } else {
        Value::Array(values.into_iter().map(Value::String).collect())
    }
}

/// Flattens a config value into text; arrays are joined with `", "`.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// Decorates every direct `div` child of `main` as a section.
pub fn decorate_sections(main: &Element) {
    let doc = main.document();
    for section in main.children_where(|e| e.is("div")) {
        wrap_section_content(&doc, &section);

        section.add_class("section");
        status::mark_initialized(&section, UnitKind::Section);
        section.hide();

        if let Some(meta) = section.find(|e| e.is_div_with_class(SECTION_METADATA)) {
            apply_section_metadata(&section, &read_block_config(&meta));
            match meta.parent() {
                Some(wrapper) if wrapper != section => wrapper.remove(),
                _ => meta.remove(),
            }
        }
    }
}

/// Wraps each `div` child in its own wrapper and every run of non-`div`
/// children in one default-content wrapper.
fn wrap_section_content(doc: &Document, section: &Element) {
    let mut wrappers: Vec<Element> = Vec::new();
    let mut in_default_content = false;
    for child in section.children() {
        let is_div = child.is("div");
        if is_div || !in_default_content || wrappers.is_empty() {
            let wrapper = doc.create_element("div");
            in_default_content = !is_div;
            if in_default_content {
                wrapper.add_class(DEFAULT_CONTENT_WRAPPER);
            }
            wrappers.push(wrapper);
        }
        if let Some(wrapper) = wrappers.last() {
            wrapper.append(&child);
        }
    }
    for wrapper in &wrappers {
        section.append(wrapper);
    }
}

/// Applies a section metadata table: `style` adds classes, every other key
/// becomes a camel-cased data attribute.
pub fn apply_section_metadata(section: &Element, meta: &Map<String, Value>) {
    for (key, value) in meta {
        let text = value_text(value);
        if key == "style" {
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(to_class_name)
                .for_each(|class| section.add_class(&class));
        } else {
            section.set_data(&to_camel_case(key), text);
        }
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────────────

/// Decorates `block`: its first class becomes its short name.
///
/// Adds the `block` class, the `data-block-name` attribute and the
/// `initialized` status, wraps bare cell content (see [`wrap_text_nodes`]),
/// then marks the parent with `<name>-wrapper` and the enclosing section
/// with `<name>-container`.  Elements without a class are left alone.
pub fn decorate_block(block: &Element) {
    let Some(name) = block.first_class().filter(|n| !n.is_empty()) else {
        return;
    };
    block.add_class("block");
    block.set_data("blockName", name.as_str());
    status::mark_initialized(block, UnitKind::Block);
    wrap_text_nodes(block);

    if let Some(wrapper) = block.parent() {
        wrapper.add_class(&format!("{name}-wrapper"));
    }
    if let Some(section) = block.closest(|e| e.has_class("section")) {
        section.add_class(&format!("{name}-container"));
    }
    debug!(block = %name, "Block decorated");
}

/// Wraps the content of each block cell (`block > div > div`) in a `<p>`
/// unless it already starts with a structural element.
///
/// A cell starting with a `<picture>` is still wrapped when anything else
/// follows the picture.  Empty cells are left alone.
pub fn wrap_text_nodes(block: &Element) {
    let doc = block.document();
    for row in block.children_where(|e| e.is("div")) {
        for cell in row.children_where(|e| e.is("div")) {
            let own_text = cell.own_text();
            let children = cell.children();
            let Some(first) = children.first() else {
                if !own_text.is_empty() {
                    wrap_cell(&doc, &cell, own_text, &children);
                }
                continue;
            };

            let has_wrapper = CELL_WRAPPERS.iter().any(|tag| first.is(tag));
            let picture_with_more = first.is("picture")
                && (children.len() > 1 || !cell.text().trim().is_empty());
            if !has_wrapper || picture_with_more {
                wrap_cell(&doc, &cell, own_text, &children);
            }
        }
    }
}

/// Moves everything in `cell` into a new `<p>` child.
fn wrap_cell(doc: &Document, cell: &Element, own_text: String, children: &[Element]) {
    let wrapper = doc.create_element("p").with_text(own_text);
    cell.set_text("");
    for child in children {
        wrapper.append(child);
    }
    cell.append(&wrapper);
    trace!("Wrapped bare block cell content");
}

/// Decorates every `div` two levels below a `div.section` of `main`.
pub fn decorate_blocks(main: &Element) {
    for section in main.find_all(|e| e.is_div_with_class("section")) {
        for wrapper in section.children_where(|e| e.is("div")) {
            for block in wrapper.children_where(|e| e.is("div")) {
                decorate_block(&block);
            }
        }
    }
}

/// Adds the `template` and `theme` metadata values as classes on `body`.
pub fn decorate_template_and_theme(doc: &Document) {
    let body = doc.body();
    for name in ["template", "theme"] {
        get_metadata(doc, name)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(to_class_name)
            .for_each(|class| body.add_class(&class));
    }
}

// ─── Building blocks ─────────────────────────────────────────────────────────

/// Content of one cell of a built block.
#[derive(Debug, Clone)]
pub enum BlockCell {
    Text(String),
    Elements(Vec<Element>),
}

impl From<&str> for BlockCell {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for BlockCell {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Element> for BlockCell {
    fn from(el: Element) -> Self {
        Self::Elements(vec![el])
    }
}

impl From<Vec<Element>> for BlockCell {
    fn from(els: Vec<Element>) -> Self {
        Self::Elements(els)
    }
}

/// Builds an undecorated block `div.<name>` from rows of cells.
pub fn build_block(doc: &Document, name: &str, rows: Vec<Vec<BlockCell>>) -> Element {
    let block = doc.create_element("div").with_class(name);
    for cells in rows {
        let row = doc.create_element("div");
        for cell in cells {
            let col = doc.create_element("div");
            match cell {
                BlockCell::Text(text) => col.set_text(text),
                BlockCell::Elements(els) => els.iter().for_each(|el| col.append(el)),
            }
            row.append(&col);
        }
        block.append(&row);
    }
    block
}

async fn load_chrome(blocks: &BlockLoader, container: &Element, name: &str) -> Element {
    let doc = container.document();
    let block = build_block(&doc, name, vec![vec![BlockCell::from("")]]);
    container.append(&block);
    decorate_block(&block);
    blocks.load_block(&block).await
}

/// Builds, decorates and loads the `header` block inside `header`.
pub async fn load_header(blocks: &BlockLoader, header: &Element) -> Element {
    load_chrome(blocks, header, "header").await
}

/// Builds, decorates and loads the `footer` block inside `footer`.
pub async fn load_footer(blocks: &BlockLoader, footer: &Element) -> Element {
    load_chrome(blocks, footer, "footer").await
}

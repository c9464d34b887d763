//! In-memory document tree.
//!
//! [`Document`] is the single shared mutable resource of a page.  It is a cheap
//! handle around an arena of nodes guarded by a [`parking_lot::RwLock`];
//! [`Element`] is a handle to one node of that arena.
//!
//! Every operation takes the lock for the duration of one call only, so no
//! guard is ever held across an `.await`.  Loaders and plugins can therefore
//! interleave document reads and writes freely between suspension points.
//!
//! ```rust,ignore
//! let doc = Document::new();
//! let section = doc.create_element("div");
//! section.add_class("section");
//! doc.body().append(&section);
//! assert_eq!(doc.body().find_all(|e| e.has_class("section")).len(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::naming::{attribute_to_dataset_key, dataset_key_to_attribute};

const ROOT: NodeId = NodeId(0);
const HEAD: NodeId = NodeId(1);
const BODY: NodeId = NodeId(2);

/// `display` value of units that stay hidden until their content is ready.
const HIDDEN_DISPLAY: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Debug, Default)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
}

/// Node arena.  Removed nodes are detached, never reclaimed.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn new() -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let root = tree.push("html");
        let head = tree.push("head");
        let body = tree.push("body");
        tree.attach(root, head);
        tree.attach(root, body);
        tree
    }

    fn push(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != id);
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    fn descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.node(id).children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push_str(&node.text);
        for &child in &node.children {
            self.text_content(child, out);
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push('<');
        out.push_str(&node.tag);
        if !node.classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&node.classes.join(" "));
            out.push('"');
        }
        for (name, value) in &node.attributes {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        out.push('>');
        out.push_str(&node.text);
        for &child in &node.children {
            self.write_html(child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

// =============================================================================
// Document
// =============================================================================

/// Shared handle to a page's element tree.
///
/// Cloning a `Document` yields another handle to the same tree.
#[derive(Clone)]
pub struct Document {
    tree: Arc<RwLock<Tree>>,
}

impl Document {
    /// Creates an empty document with `head` and `body` elements.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
        }
    }

    fn handle(&self, id: NodeId) -> Element {
        Element {
            tree: Arc::clone(&self.tree),
            id,
        }
    }

    /// The `<html>` element.
    pub fn root(&self) -> Element {
        self.handle(ROOT)
    }

    /// The `<head>` element.
    pub fn head(&self) -> Element {
        self.handle(HEAD)
    }

    /// The `<body>` element.
    pub fn body(&self) -> Element {
        self.handle(BODY)
    }

    /// Returns the first `<main>` element under `body`, if any.
    pub fn main(&self) -> Option<Element> {
        self.body().find(|e| e.is("main"))
    }

    /// Creates a detached element.
    pub fn create_element(&self, tag: &str) -> Element {
        let id = self.tree.write().push(tag);
        self.handle(id)
    }

    /// Returns `true` if `head` contains a `tag` element whose `url_attr`
    /// attribute equals `url` exactly.
    pub fn has_head_resource(&self, tag: &str, url_attr: &str, url: &str) -> bool {
        let tree = self.tree.read();
        Self::find_head_resource(&tree, tag, url_attr, url).is_some()
    }

    fn find_head_resource(tree: &Tree, tag: &str, url_attr: &str, url: &str) -> Option<NodeId> {
        tree.node(HEAD).children.iter().copied().find(|&id| {
            let node = tree.node(id);
            node.tag == tag && node.attributes.get(url_attr).map(String::as_str) == Some(url)
        })
    }

    /// Appends a `tag` element with `url_attr = url` (and `extra` attributes)
    /// to `head`, unless one with that exact URL already exists.
    ///
    /// The check and the insertion happen under a single write lock.  Returns
    /// `true` when a new element was inserted.
    pub fn insert_head_resource(
        &self,
        tag: &str,
        url_attr: &str,
        url: &str,
        extra: &[(&str, &str)],
    ) -> bool {
        let mut tree = self.tree.write();
        if Self::find_head_resource(&tree, tag, url_attr, url).is_some() {
            return false;
        }
        let id = tree.push(tag);
        let node = tree.node_mut(id);
        node.attributes.insert(url_attr.to_string(), url.to_string());
        for (name, value) in extra {
            node.attributes.insert((*name).to_string(), (*value).to_string());
        }
        tree.attach(HEAD, id);
        true
    }

    /// Serialises the whole document.  Intended for diagnostics and tests.
    pub fn to_html(&self) -> String {
        self.root().to_html()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.tree.read().nodes.len();
        f.debug_struct("Document").field("nodes", &nodes).finish()
    }
}

// =============================================================================
// Element
// =============================================================================

/// Handle to one element of a [`Document`].
#[derive(Clone)]
pub struct Element {
    tree: Arc<RwLock<Tree>>,
    id: NodeId,
}

impl Element {
    fn handle(&self, id: NodeId) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            id,
        }
    }

    /// The document this element belongs to.
    pub fn document(&self) -> Document {
        Document {
            tree: Arc::clone(&self.tree),
        }
    }

    /// Lower-case tag name.
    pub fn tag(&self) -> String {
        self.tree.read().node(self.id).tag.clone()
    }

    /// Returns `true` if the tag name equals `tag` (case-insensitive).
    pub fn is(&self, tag: &str) -> bool {
        self.tree.read().node(self.id).tag.eq_ignore_ascii_case(tag)
    }

    // ─── Classes ─────────────────────────────────────────────────────────────

    /// Class list in insertion order.
    pub fn classes(&self) -> Vec<String> {
        self.tree.read().node(self.id).classes.clone()
    }

    /// First class of the class list.
    pub fn first_class(&self) -> Option<String> {
        self.tree.read().node(self.id).classes.first().cloned()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.tree
            .read()
            .node(self.id)
            .classes
            .iter()
            .any(|c| c == class)
    }

    /// Adds `class` unless it is empty or already present.
    pub fn add_class(&self, class: &str) {
        if class.is_empty() {
            return;
        }
        let mut tree = self.tree.write();
        let classes = &mut tree.node_mut(self.id).classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, class: &str) {
        self.tree
            .write()
            .node_mut(self.id)
            .classes
            .retain(|c| c != class);
    }

    /// Builder-style [`add_class`](Self::add_class).
    pub fn with_class(self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    // ─── Attributes ──────────────────────────────────────────────────────────

    pub fn attr(&self, name: &str) -> Option<String> {
        self.tree.read().node(self.id).attributes.get(name).cloned()
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.tree
            .read()
            .node(self.id)
            .attributes
            .contains_key(name)
    }

    pub fn set_attr(&self, name: &str, value: impl Into<String>) {
        self.tree
            .write()
            .node_mut(self.id)
            .attributes
            .insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&self, name: &str) {
        self.tree.write().node_mut(self.id).attributes.remove(name);
    }

    /// Builder-style [`set_attr`](Self::set_attr).
    pub fn with_attr(self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Reads and rewrites one attribute under a single write lock.
    ///
    /// `f` receives the current value and may replace or clear it.  This is
    /// what makes status transitions check-and-set atomic.
    pub fn update_attr<R>(&self, name: &str, f: impl FnOnce(&mut Option<String>) -> R) -> R {
        let mut tree = self.tree.write();
        let attributes = &mut tree.node_mut(self.id).attributes;
        let mut value = attributes.remove(name);
        let result = f(&mut value);
        if let Some(value) = value {
            attributes.insert(name.to_string(), value);
        }
        result
    }

    /// Reads a `data-*` attribute through its camel-cased dataset key.
    pub fn data(&self, key: &str) -> Option<String> {
        self.attr(&dataset_key_to_attribute(key))
    }

    /// Writes a `data-*` attribute through its camel-cased dataset key.
    pub fn set_data(&self, key: &str, value: impl Into<String>) {
        self.set_attr(&dataset_key_to_attribute(key), value);
    }

    /// All `data-*` attributes keyed by camel-cased dataset key.
    pub fn dataset(&self) -> BTreeMap<String, String> {
        self.tree
            .read()
            .node(self.id)
            .attributes
            .iter()
            .filter_map(|(name, value)| {
                attribute_to_dataset_key(name).map(|key| (key, value.clone()))
            })
            .collect()
    }

    // ─── Visibility ──────────────────────────────────────────────────────────

    /// Hides the element with an inline `display: none` declaration.  Other
    /// inline declarations are kept.
    pub fn hide(&self) {
        self.set_display(Some(HIDDEN_DISPLAY));
    }

    /// Drops the inline `display` declaration.  Removes `style` once it has
    /// no declarations left.
    pub fn show(&self) {
        self.set_display(None);
    }

    pub fn is_hidden(&self) -> bool {
        self.attr("style")
            .is_some_and(|style| display_of(&style).as_deref() == Some(HIDDEN_DISPLAY))
    }

    fn set_display(&self, display: Option<&str>) {
        self.update_attr("style", |style| {
            let mut declarations: Vec<String> = style
                .as_deref()
                .unwrap_or_default()
                .split(';')
                .map(str::trim)
                .filter(|d| {
                    !d.is_empty()
                        && !declaration_name(d).is_some_and(|n| n.eq_ignore_ascii_case("display"))
                })
                .map(str::to_string)
                .collect();
            if let Some(value) = display {
                declarations.push(format!("display: {value}"));
            }
            *style = (!declarations.is_empty()).then(|| format!("{};", declarations.join("; ")));
        });
    }

    // ─── Text ────────────────────────────────────────────────────────────────

    /// Concatenated text of this element and all descendants.
    pub fn text(&self) -> String {
        let tree = self.tree.read();
        let mut out = String::new();
        tree.text_content(self.id, &mut out);
        out
    }

    /// Text held by the element itself, without its descendants.
    pub fn own_text(&self) -> String {
        self.tree.read().node(self.id).text.clone()
    }

    /// Replaces the element's own text (children are kept).
    pub fn set_text(&self, text: impl Into<String>) {
        self.tree.write().node_mut(self.id).text = text.into();
    }

    /// Builder-style [`set_text`](Self::set_text).
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    // ─── Tree structure ──────────────────────────────────────────────────────

    /// Moves `child` to the end of this element's children.
    ///
    /// Appending an ancestor of `self` (or `self`) is ignored.
    pub fn append(&self, child: &Element) {
        let mut tree = self.tree.write();
        if tree.is_ancestor_or_self(child.id, self.id) {
            return;
        }
        tree.attach(self.id, child.id);
    }

    /// Builder-style [`append`](Self::append).
    pub fn with_child(self, child: &Element) -> Self {
        self.append(child);
        self
    }

    /// Detaches the element from its parent.
    pub fn remove(&self) {
        self.tree.write().detach(self.id);
    }

    pub fn parent(&self) -> Option<Element> {
        let parent = self.tree.read().node(self.id).parent;
        parent.map(|id| self.handle(id))
    }

    pub fn children(&self) -> Vec<Element> {
        let ids = self.tree.read().node(self.id).children.clone();
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    pub fn first_child(&self) -> Option<Element> {
        let first = self.tree.read().node(self.id).children.first().copied();
        first.map(|id| self.handle(id))
    }

    /// All descendants in document (pre-)order, excluding `self`.
    pub fn descendants(&self) -> Vec<Element> {
        let mut ids = Vec::new();
        self.tree.read().descendants(self.id, &mut ids);
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    /// Descendants matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<Element> {
        self.descendants().into_iter().filter(|e| pred(e)).collect()
    }

    /// First descendant matching `pred`.
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<Element> {
        self.descendants().into_iter().find(|e| pred(e))
    }

    /// Children matching `pred`.
    pub fn children_where(&self, pred: impl Fn(&Element) -> bool) -> Vec<Element> {
        self.children().into_iter().filter(|e| pred(e)).collect()
    }

    /// Nearest inclusive ancestor matching `pred`.
    pub fn closest(&self, pred: impl Fn(&Element) -> bool) -> Option<Element> {
        let mut current = Some(self.clone());
        while let Some(el) = current {
            if pred(&el) {
                return Some(el);
            }
            current = el.parent();
        }
        None
    }

    /// Returns `true` if the element is a `<div>` carrying `class`.
    pub fn is_div_with_class(&self, class: &str) -> bool {
        self.is("div") && self.has_class(class)
    }

    /// Serialises the element subtree.  Intended for diagnostics and tests.
    pub fn to_html(&self) -> String {
        let tree = self.tree.read();
        let mut out = String::new();
        tree.write_html(self.id, &mut out);
        out
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        let node = tree.node(self.id);
        f.debug_struct("Element")
            .field("tag", &node.tag)
            .field("classes", &node.classes)
            .field("attributes", &node.attributes)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

fn declaration_name(declaration: &str) -> Option<&str> {
    declaration.split_once(':').map(|(name, _)| name.trim())
}

/// Last `display` value of an inline style, lowercased.
fn display_of(style: &str) -> Option<String> {
    style
        .split(';')
        .filter_map(|d| d.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("display"))
        .map(|(_, value)| value.trim().to_ascii_lowercase())
        .last()
}

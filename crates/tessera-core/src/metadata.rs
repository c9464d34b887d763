//! Page metadata lookup.

use crate::dom::Document;

/// Returns the content of the `<meta>` tags named `name`.
///
/// Names containing `:` are matched against the `property` attribute, all
/// others against `name`.  Several matches are joined with `", "`; no match
/// yields an empty string.
pub fn get_metadata(doc: &Document, name: &str) -> String {
    let attr = if name.contains(':') { "property" } else { "name" };
    doc.head()
        .find_all(|e| e.is("meta") && e.attr(attr).as_deref() == Some(name))
        .iter()
        .filter_map(|m| m.attr("content"))
        .collect::<Vec<_>>()
        .join(", ")
}

//! Name normalisation helpers.
//!
//! These are the two string helpers exposed to plugins through the capability
//! surface, plus the dataset key ↔ `data-*` attribute mapping used by
//! [`Element::data`](crate::dom::Element::data).

/// Sanitises a string for use as a class name.
///
/// Lower-cases, replaces every character outside `[0-9a-z]` with `-`,
/// collapses dash runs and trims leading/trailing dashes.
pub fn to_class_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '-'
        };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('-').to_string()
}

/// Sanitises a string for use as a property name (camel case).
pub fn to_camel_case(name: &str) -> String {
    let class_name = to_class_name(name);
    let mut out = String::with_capacity(class_name.len());
    let mut chars = class_name.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('-', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Maps a camel-cased dataset key to its `data-*` attribute name.
///
/// `blockStatus` → `data-block-status`.
pub fn dataset_key_to_attribute(key: &str) -> String {
    let mut out = String::from("data-");
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Maps a `data-*` attribute name back to its dataset key, or `None` for
/// attributes outside the `data-` namespace.
pub fn attribute_to_dataset_key(attribute: &str) -> Option<String> {
    let rest = attribute.strip_prefix("data-")?;
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('-', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    Some(out)
}

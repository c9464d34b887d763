//! Unit status tracking.
//!
//! Blocks and sections ("units") carry their load status in a `data-*`
//! attribute.  The state machine is:
//!
//! ```text
//! (absent) ──► uninitialized ──► initialized ──► loading ──► loaded
//!                    └──────────────────────────────┘
//! ```
//!
//! Transitions only move forward.  [`try_begin_load`] is the single entry
//! point into `loading`: it inspects and rewrites the attribute under one
//! lock, so a second load request on the same unit is a silent no-op.

use std::fmt;
use std::str::FromStr;

use crate::dom::Element;

/// Load status of a block or section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitStatus {
    /// No status recorded yet.
    #[default]
    Uninitialized,
    /// Decorated and waiting to be loaded.
    Initialized,
    /// A load is in flight.
    Loading,
    /// The load attempt finished (successfully or not).
    Loaded,
}

impl UnitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        }
    }

    /// Returns `true` for `loading` and `loaded`.
    pub fn is_started(self) -> bool {
        matches!(self, Self::Loading | Self::Loaded)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for UnitStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uninitialized" => Ok(Self::Uninitialized),
            "initialized" => Ok(Self::Initialized),
            "loading" => Ok(Self::Loading),
            "loaded" => Ok(Self::Loaded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Which kind of unit an element is tracked as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Block,
    Section,
}

impl UnitKind {
    /// The attribute that stores this kind's status.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Block => "data-block-status",
            Self::Section => "data-section-status",
        }
    }

    /// Whether a load may start from `raw` (the attribute's current value).
    ///
    /// Blocks load from anything that is not `loading`/`loaded`; sections
    /// only from an absent status or `initialized`.
    fn may_begin(self, raw: Option<&str>) -> bool {
        match (self, raw.map(str::parse::<UnitStatus>)) {
            (_, None) => true,
            (_, Some(Ok(status))) => !status.is_started(),
            (Self::Block, Some(Err(_))) => true,
            (Self::Section, Some(Err(_))) => false,
        }
    }
}

/// Reads the status of `el`.  Absent or unknown values read as
/// [`UnitStatus::Uninitialized`].
pub fn status(el: &Element, kind: UnitKind) -> UnitStatus {
    el.attr(kind.attribute())
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

/// Moves `el` to `to` if that is a forward transition.  Returns `true` when
/// the attribute changed.
pub fn advance(el: &Element, kind: UnitKind, to: UnitStatus) -> bool {
    el.update_attr(kind.attribute(), |value| {
        let current: UnitStatus = value
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        if to > current || value.is_none() {
            *value = Some(to.as_str().to_string());
            true
        } else {
            false
        }
    })
}

/// Marks `el` as decorated and ready to load.
pub fn mark_initialized(el: &Element, kind: UnitKind) -> bool {
    advance(el, kind, UnitStatus::Initialized)
}

/// Atomically moves `el` into `loading`.
///
/// Returns `false` without touching the element if a load already started.
pub fn try_begin_load(el: &Element, kind: UnitKind) -> bool {
    el.update_attr(kind.attribute(), |value| {
        if kind.may_begin(value.as_deref()) {
            *value = Some(UnitStatus::Loading.as_str().to_string());
            true
        } else {
            false
        }
    })
}

/// Marks `el` as `loaded`.
pub fn finish_load(el: &Element, kind: UnitKind) {
    advance(el, kind, UnitStatus::Loaded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_status_defaults_to_uninitialized() {
        let doc = Document::new();
        let el = doc.create_element("div");
        assert_eq!(status(&el, UnitKind::Block), UnitStatus::Uninitialized);
    }

    #[test]
    fn test_begin_load_once() {
        let doc = Document::new();
        let el = doc.create_element("div");
        assert!(mark_initialized(&el, UnitKind::Block));
        assert!(try_begin_load(&el, UnitKind::Block));
        assert!(!try_begin_load(&el, UnitKind::Block));
        finish_load(&el, UnitKind::Block);
        assert!(!try_begin_load(&el, UnitKind::Block));
        assert_eq!(status(&el, UnitKind::Block), UnitStatus::Loaded);
    }

    #[test]
    fn test_status_never_regresses() {
        let doc = Document::new();
        let el = doc.create_element("div");
        finish_load(&el, UnitKind::Section);
        assert!(!mark_initialized(&el, UnitKind::Section));
        assert!(!advance(&el, UnitKind::Section, UnitStatus::Loading));
        assert_eq!(status(&el, UnitKind::Section), UnitStatus::Loaded);
    }

    #[test]
    fn test_unknown_status_per_kind() {
        let doc = Document::new();
        let block = doc.create_element("div").with_attr("data-block-status", "bogus");
        let section = doc
            .create_element("div")
            .with_attr("data-section-status", "bogus");
        assert!(try_begin_load(&block, UnitKind::Block));
        assert!(!try_begin_load(&section, UnitKind::Section));
        assert_eq!(section.attr("data-section-status").as_deref(), Some("bogus"));
    }

    #[test]
    fn test_parse_round_trip() {
        for s in [
            UnitStatus::Uninitialized,
            UnitStatus::Initialized,
            UnitStatus::Loading,
            UnitStatus::Loaded,
        ] {
            assert_eq!(s.as_str().parse::<UnitStatus>(), Ok(s));
        }
        assert!("nope".parse::<UnitStatus>().is_err());
    }
}

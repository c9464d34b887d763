//! Host abstractions.
//!
//! The runtime never performs network I/O itself.  Fetching stylesheets,
//! classic scripts and images, and delivering telemetry beacons, are
//! delegated to the embedding host through these traits.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::{BoxError, LoadResult};

/// Fetches page resources on behalf of the loaders.
///
/// Implementations resolve once the resource is applied (stylesheet parsed,
/// script evaluated) or fail with a [`LoadError`](crate::LoadError).  No
/// timeout is imposed by the caller.
#[async_trait]
pub trait ResourceHost: Send + Sync {
    /// Fetches and applies a stylesheet.
    async fn fetch_style(&self, href: &str) -> LoadResult<()>;

    /// Fetches and evaluates a classic (non-module) script.
    async fn fetch_script(&self, src: &str) -> LoadResult<()>;

    /// Waits for an image to finish loading.
    ///
    /// Defaults to resolving immediately.
    async fn fetch_image(&self, _src: &str) -> LoadResult<()> {
        Ok(())
    }
}

/// Delivers telemetry beacons.
///
/// Sending is fire-and-forget; errors are swallowed by the caller.
pub trait BeaconSink: Send + Sync {
    fn send(&self, url: &str, body: &Value) -> Result<(), BoxError>;
}

/// The address of the page being composed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    /// Parses an absolute page URL.
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(href)?,
        })
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    /// Scheme, host and port, e.g. `https://example.com`.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// First value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Returns `true` if query parameter `name` equals `on`.
    pub fn flag(&self, name: &str) -> bool {
        self.query_param(name).as_deref() == Some("on")
    }

    /// Resolves `reference` against the page URL.
    pub fn join(&self, reference: &str) -> Result<Url, url::ParseError> {
        self.url.join(reference)
    }
}

impl From<Url> for PageLocation {
    fn from(url: Url) -> Self {
        Self { url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_query_flags() {
        let loc = PageLocation::parse("https://example.com/page?rum=on&lighthouse=off").unwrap();
        assert!(loc.flag("rum"));
        assert!(!loc.flag("lighthouse"));
        assert!(!loc.flag("missing"));
        assert_eq!(loc.origin(), "https://example.com");
    }

    #[test]
    fn test_location_join() {
        let loc = PageLocation::parse("https://example.com/a/b").unwrap();
        assert_eq!(
            loc.join("/scripts/scripts.js").unwrap().as_str(),
            "https://example.com/scripts/scripts.js"
        );
    }
}

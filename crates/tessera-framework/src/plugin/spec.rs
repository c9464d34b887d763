//! Plugin registration inputs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::Condition;
use crate::error::{PluginError, PluginResult};

// =============================================================================
// Phase
// =============================================================================

/// A named load/run stage.
///
/// Serialises as its name, so configuration files can say `load_phase =
/// "lazy"` or name any custom phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    #[default]
    Eager,
    Lazy,
    Custom(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for Phase {
    fn from(name: &str) -> Self {
        match name {
            "eager" => Self::Eager,
            "lazy" => Self::Lazy,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for Phase {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.as_str().to_string()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PluginConfig
// =============================================================================

/// Registration-time description of a plugin.
#[derive(Clone)]
pub struct PluginConfig {
    /// Module location: a directory (`<url>/<id>.js` + `<url>/<id>.css`) or
    /// a `.js` file.  Entries without a URL are never loaded.
    pub url: Option<String>,
    /// Phase in which the module is loaded.
    pub load_phase: Phase,
    /// Activation condition; `None` always passes.
    pub condition: Option<Condition>,
    /// Options handed to the module, its exports and its condition.
    pub options: Value,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            url: None,
            load_phase: Phase::Eager,
            condition: None,
            options: Value::Object(Default::default()),
        }
    }
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn load_phase(mut self, phase: impl Into<Phase>) -> Self {
        self.load_phase = phase.into();
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the options.  `null` is normalised to `{}`.
    pub fn options(mut self, options: Value) -> Self {
        self.options = match options {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        self
    }

    /// Script and stylesheet paths for plugin `id`.
    pub fn module_paths(&self, id: &str) -> Option<(String, Option<String>)> {
        let url = self.url.as_deref()?;
        if url.ends_with(".js") {
            Some((url.to_string(), None))
        } else {
            Some((format!("{url}/{id}.js"), Some(format!("{url}/{id}.css"))))
        }
    }
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("url", &self.url)
            .field("load_phase", &self.load_phase)
            .field("condition", &self.condition.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// =============================================================================
// PluginSpec
// =============================================================================

/// The accepted registration shapes.
#[derive(Debug, Clone)]
pub enum PluginSpec {
    /// A bare URL; the id is derived from its last path segment.
    Url(String),
    /// An explicit id and URL.
    IdUrl { id: String, url: String },
    /// An explicit id and full configuration.
    Config { id: String, config: PluginConfig },
}

impl PluginSpec {
    pub fn with_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::IdUrl {
            id: id.into(),
            url: url.into(),
        }
    }

    pub fn with_config(id: impl Into<String>, config: PluginConfig) -> Self {
        Self::Config {
            id: id.into(),
            config,
        }
    }

    /// Normalises the spec into an id and a configuration.
    pub fn resolve(self) -> PluginResult<(String, PluginConfig)> {
        let (id, config) = match self {
            Self::Url(url) => {
                let id = id_from_url(&url)
                    .ok_or_else(|| PluginError::InvalidSpec(format!("no plugin id in '{url}'")))?;
                (id, PluginConfig::new().url(strip_trailing_slash(&url)))
            }
            Self::IdUrl { id, url } => (id, PluginConfig::new().url(strip_trailing_slash(&url))),
            Self::Config { id, config } => (id, config),
        };
        if id.is_empty() {
            return Err(PluginError::InvalidSpec("empty plugin id".to_string()));
        }
        Ok((id, config))
    }
}

impl From<&str> for PluginSpec {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for PluginSpec {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<(&str, &str)> for PluginSpec {
    fn from((id, url): (&str, &str)) -> Self {
        Self::with_url(id, url)
    }
}

impl From<(&str, PluginConfig)> for PluginSpec {
    fn from((id, config): (&str, PluginConfig)) -> Self {
        Self::with_config(id, config)
    }
}

/// Last non-empty path segment, without a `.js` extension.
fn id_from_url(url: &str) -> Option<String> {
    let segment = url.split('/').rev().find(|s| !s.is_empty())?;
    let id = segment.strip_suffix(".js").unwrap_or(segment);
    (!id.is_empty()).then(|| id.to_string())
}

fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bare_directory_url() {
        let (id, config) = PluginSpec::from("https://example.com/plugins/foo/")
            .resolve()
            .unwrap();
        assert_eq!(id, "foo");
        assert_eq!(config.load_phase, Phase::Eager);
        assert_eq!(config.url.as_deref(), Some("https://example.com/plugins/foo"));
        assert_eq!(config.options, json!({}));
        assert_eq!(
            config.module_paths(&id),
            Some((
                "https://example.com/plugins/foo/foo.js".to_string(),
                Some("https://example.com/plugins/foo/foo.css".to_string())
            ))
        );
    }

    #[test]
    fn test_bare_script_url() {
        let (id, config) = PluginSpec::from("/plugins/experimentation/index.js")
            .resolve()
            .unwrap();
        assert_eq!(id, "index");
        assert_eq!(
            config.module_paths(&id),
            Some(("/plugins/experimentation/index.js".to_string(), None))
        );
    }

    #[test]
    fn test_id_and_url() {
        let (id, config) = PluginSpec::from(("martech", "/plugins/martech/"))
            .resolve()
            .unwrap();
        assert_eq!(id, "martech");
        assert_eq!(config.url.as_deref(), Some("/plugins/martech"));
    }

    #[test]
    fn test_id_and_config() {
        let config = PluginConfig::new()
            .url("/plugins/rum.js")
            .load_phase("lazy")
            .options(json!({ "sample": 10 }));
        let (id, config) = PluginSpec::with_config("rum", config).resolve().unwrap();
        assert_eq!(id, "rum");
        assert_eq!(config.load_phase, Phase::Lazy);
        assert_eq!(config.options["sample"], 10);
    }

    #[test]
    fn test_config_without_url_has_no_paths() {
        let config = PluginConfig::new().options(Value::Null);
        assert_eq!(config.options, json!({}));
        assert_eq!(config.module_paths("inline"), None);
    }

    #[test]
    fn test_invalid_specs() {
        assert!(PluginSpec::from("///").resolve().is_err());
        assert!(PluginSpec::with_url("", "/x").resolve().is_err());
    }

    #[test]
    fn test_phase_serde() {
        assert_eq!(serde_json::to_value(Phase::Lazy).unwrap(), json!("lazy"));
        let phase: Phase = serde_json::from_value(json!("delayed")).unwrap();
        assert_eq!(phase, Phase::Custom("delayed".to_string()));
        assert_eq!(phase.to_string(), "delayed");
    }
}

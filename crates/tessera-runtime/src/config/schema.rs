//! Configuration schema definitions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::SamplingSettings;
use tessera_framework::plugin::experimentation::Audience;
use tessera_framework::{ExperimentationOptions, Phase, PluginConfig, PluginResult, PluginSpec};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TesseraConfig {
    /// Page bootstrap settings.
    #[serde(default)]
    pub page: PageConfig,

    /// Telemetry sampling settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugins registered at startup, in order.
    #[serde(default)]
    pub plugins: Vec<PluginEntryConfig>,

    /// Templates registered at startup, in order.
    #[serde(default)]
    pub templates: Vec<PluginEntryConfig>,

    /// The built-in experimentation plugin.
    #[serde(default)]
    pub experimentation: ExperimentationConfig,
}

// =============================================================================
// Page
// =============================================================================

/// Page bootstrap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Base path of the code bundle.  When unset it is detected from the
    /// `/scripts/scripts.js` script in `head`, or left empty.
    #[serde(default)]
    pub code_base_path: Option<String>,

    /// URL of the page, used for query flags and as the default beacon
    /// origin.
    #[serde(default)]
    pub url: Option<String>,

    /// Delay before the `delayed` phase starts, in milliseconds.
    #[serde(default = "default_delayed_ms")]
    pub delayed_ms: u64,

    /// Load the `header` block into `<header>` during the lazy stage.
    #[serde(default = "default_true")]
    pub header: bool,

    /// Load the `footer` block into `<footer>` during the lazy stage.
    #[serde(default = "default_true")]
    pub footer: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            code_base_path: None,
            url: None,
            delayed_ms: default_delayed_ms(),
            header: true,
            footer: true,
        }
    }
}

fn default_delayed_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Telemetry
// =============================================================================

/// Telemetry sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Master switch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sampling weight when the page URL does not carry `rum=on`.
    #[serde(default = "default_weight")]
    pub default_weight: u32,

    /// Beacon base URL.  Defaults to the page origin, or the built-in
    /// collector when the page URL is unknown.
    #[serde(default)]
    pub collect_base_url: Option<String>,

    /// Enhancer script inserted on the `lazy` checkpoint of sampled pages.
    #[serde(default)]
    pub enhancer_url: Option<String>,

    /// Generation tag attached to every beacon.
    #[serde(default)]
    pub generation: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_weight: default_weight(),
            collect_base_url: None,
            enhancer_url: None,
            generation: None,
        }
    }
}

fn default_weight() -> u32 {
    100
}

impl TelemetryConfig {
    /// Sampling settings for a page whose origin is `origin`.
    pub fn to_settings(&self, origin: Option<&str>) -> SamplingSettings {
        let defaults = SamplingSettings::default();
        let collect_base_url = self
            .collect_base_url
            .clone()
            .or_else(|| origin.map(str::to_string))
            .unwrap_or(defaults.collect_base_url);
        SamplingSettings {
            enabled: self.enabled,
            default_weight: self.default_weight,
            collect_base_url,
            enhancer_url: self.enhancer_url.clone(),
            generation: self.generation.clone(),
        }
    }
}

// =============================================================================
// Experimentation
// =============================================================================

/// Settings of the built-in experimentation plugin.
///
/// ```toml
/// [experimentation]
/// enabled = true
/// prod_host = "www.example.com"
/// audiences = { narrow = { max_width = 799 }, wide = { min_width = 800 } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentationConfig {
    /// Registers the plugin.  It still only loads on pages carrying
    /// experiment, campaign or audience metadata.
    #[serde(default)]
    pub enabled: bool,

    /// Production host.  Defaults to the engine's built-in one.
    #[serde(default)]
    pub prod_host: Option<String>,

    /// Named audiences.  The built-in `mobile`/`desktop` split when empty.
    #[serde(default)]
    pub audiences: BTreeMap<String, Audience>,
}

impl ExperimentationConfig {
    /// Engine options with defaults filled in.
    pub fn to_options(&self) -> ExperimentationOptions {
        let defaults = ExperimentationOptions::default();
        ExperimentationOptions {
            prod_host: self.prod_host.clone().unwrap_or(defaults.prod_host),
            audiences: if self.audiences.is_empty() {
                defaults.audiences
            } else {
                self.audiences.clone()
            },
        }
    }
}

// =============================================================================
// Plugins
// =============================================================================

/// A plugin or template declared in the configuration file.
///
/// ```toml
/// [[plugins]]
/// url = "/plugins/experimentation/"
///
/// [[plugins]]
/// id = "martech"
/// url = "/plugins/martech/index.js"
/// load_phase = "lazy"
/// options = { consent = true }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEntryConfig {
    /// Explicit id.  Derived from the URL when unset.
    #[serde(default)]
    pub id: Option<String>,

    /// Module location.
    pub url: String,

    /// Phase in which the module loads.
    #[serde(default)]
    pub load_phase: Phase,

    /// Options handed to the module.
    #[serde(default = "empty_options")]
    pub options: Value,
}

fn empty_options() -> Value {
    Value::Object(Default::default())
}

impl PluginEntryConfig {
    /// Resolves the entry into a registration spec with an explicit id.
    pub fn to_spec(&self) -> PluginResult<PluginSpec> {
        let (derived_id, config) = match &self.id {
            Some(id) => PluginSpec::with_url(id.clone(), self.url.clone()).resolve()?,
            None => PluginSpec::from(self.url.as_str()).resolve()?,
        };
        let config = PluginConfig {
            load_phase: self.load_phase.clone(),
            ..config
        }
        .options(self.options.clone());
        Ok(PluginSpec::with_config(derived_id, config))
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_max_files")]
    pub max_files: u32,

    /// Per-target levels, e.g. `tessera_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_plugin_entry_without_id() {
        let entry = PluginEntryConfig {
            id: None,
            url: "/plugins/experimentation/".to_string(),
            load_phase: Phase::Lazy,
            options: json!({ "prod_host": "www.example.com" }),
        };
        let (id, config) = entry.to_spec().unwrap().resolve().unwrap();
        assert_eq!(id, "experimentation");
        assert_eq!(config.url.as_deref(), Some("/plugins/experimentation"));
        assert_eq!(config.load_phase, Phase::Lazy);
        assert_eq!(config.options["prod_host"], "www.example.com");
    }

    #[test]
    fn test_experimentation_options_fill_defaults() {
        let config = ExperimentationConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.to_options(), ExperimentationOptions::default());

        let config = ExperimentationConfig {
            enabled: true,
            prod_host: Some("www.example.com".to_string()),
            audiences: BTreeMap::from([(
                "wide".to_string(),
                Audience {
                    min_width: Some(1200),
                    max_width: None,
                },
            )]),
        };
        let options = config.to_options();
        assert_eq!(options.prod_host, "www.example.com");
        assert_eq!(options.resolve_audiences(1400), vec!["wide"]);
        assert!(options.resolve_audiences(800).is_empty());
    }

    #[test]
    fn test_telemetry_settings_prefer_explicit_base() {
        let mut config = TelemetryConfig::default();
        assert_eq!(
            config.to_settings(Some("https://www.example.com")).collect_base_url,
            "https://www.example.com"
        );
        assert_eq!(
            config.to_settings(None).collect_base_url,
            SamplingSettings::default().collect_base_url
        );
        config.collect_base_url = Some("https://collector.example".to_string());
        assert_eq!(
            config.to_settings(Some("https://www.example.com")).collect_base_url,
            "https://collector.example"
        );
    }
}

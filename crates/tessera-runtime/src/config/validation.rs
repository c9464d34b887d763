//! Configuration validation utilities.

use std::collections::HashSet;

use url::Url;

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    ExperimentationConfig, PageConfig, PluginEntryConfig, TelemetryConfig, TesseraConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &TesseraConfig) -> ConfigResult<()> {
    validate_page_config(&config.page)?;
    validate_telemetry_config(&config.telemetry)?;
    validate_plugin_entries(&config.plugins, &config.templates)?;
    validate_experimentation_config(&config.experimentation)?;
    Ok(())
}

/// Validates page settings.
fn validate_page_config(page: &PageConfig) -> ConfigResult<()> {
    if let Some(path) = &page.code_base_path
        && path.ends_with('/')
    {
        return Err(ConfigError::validation(format!(
            "Code base path must not end with '/': {path}"
        )));
    }

    if let Some(url) = &page.url {
        validate_absolute_url(url)?;
    }

    Ok(())
}

/// Validates telemetry settings.
fn validate_telemetry_config(telemetry: &TelemetryConfig) -> ConfigResult<()> {
    if telemetry.default_weight == 0 {
        return Err(ConfigError::validation(
            "Telemetry default weight must be greater than 0",
        ));
    }

    if let Some(url) = &telemetry.collect_base_url {
        validate_absolute_url(url)?;
    }

    Ok(())
}

/// Validates declared plugins and templates.  Templates share the plugin
/// id space.
fn validate_plugin_entries(
    plugins: &[PluginEntryConfig],
    templates: &[PluginEntryConfig],
) -> ConfigResult<()> {
    let mut seen_ids = HashSet::new();

    for entry in plugins.iter().chain(templates) {
        if entry.url.trim().is_empty() {
            return Err(ConfigError::missing_field("plugins.url"));
        }
        if !entry.options.is_object() {
            return Err(ConfigError::validation(format!(
                "Options of plugin '{}' must be a table",
                entry.url
            )));
        }

        let spec = entry
            .to_spec()
            .map_err(|e| ConfigError::validation(e.to_string()))?;
        let (id, _) = spec
            .resolve()
            .map_err(|e| ConfigError::validation(e.to_string()))?;
        if !seen_ids.insert(id.clone()) {
            return Err(ConfigError::DuplicatePluginId(id));
        }
    }

    Ok(())
}

/// Validates the experimentation plugin settings.
fn validate_experimentation_config(experimentation: &ExperimentationConfig) -> ConfigResult<()> {
    if experimentation
        .prod_host
        .as_deref()
        .is_some_and(|host| host.trim().is_empty())
    {
        return Err(ConfigError::validation(
            "Experimentation production host must not be empty",
        ));
    }

    for (name, audience) in &experimentation.audiences {
        if let (Some(min), Some(max)) = (audience.min_width, audience.max_width)
            && min > max
        {
            return Err(ConfigError::validation(format!(
                "Audience '{name}' has min_width {min} above max_width {max}"
            )));
        }
    }

    Ok(())
}

fn validate_absolute_url(url: &str) -> ConfigResult<()> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::invalid_url(url, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_url(
            url,
            "URL must start with http:// or https://",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessera_framework::Phase;
    use tessera_framework::plugin::experimentation::Audience;

    use super::*;

    fn entry(id: Option<&str>, url: &str) -> PluginEntryConfig {
        PluginEntryConfig {
            id: id.map(str::to_string),
            url: url.to_string(),
            load_phase: Phase::Eager,
            options: json!({}),
        }
    }

    #[test]
    fn test_validate_empty_config() {
        let config = TesseraConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_trailing_slash_base_path() {
        let mut config = TesseraConfig::default();
        config.page.code_base_path = Some("/code/".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_weight() {
        let mut config = TesseraConfig::default();
        config.telemetry.default_weight = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_urls() {
        let mut config = TesseraConfig::default();
        config.page.url = Some("not a url".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let mut config = TesseraConfig::default();
        config.telemetry.collect_base_url = Some("ftp://example.com".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_plugin_id() {
        let config = TesseraConfig {
            plugins: vec![entry(None, "/plugins/foo/")],
            templates: vec![entry(Some("foo"), "/templates/foo")],
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::DuplicatePluginId(id)) if id == "foo"));
    }

    #[test]
    fn test_validate_plugin_options_must_be_table() {
        let mut bad = entry(None, "/plugins/foo");
        bad.options = json!([1, 2]);
        let config = TesseraConfig {
            plugins: vec![bad],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_experimentation_audiences() {
        let mut config = TesseraConfig::default();
        config.experimentation.audiences.insert(
            "tablet".to_string(),
            Audience {
                min_width: Some(1024),
                max_width: Some(600),
            },
        );
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { message }) if message.contains("tablet")
        ));

        let mut config = TesseraConfig::default();
        config.experimentation.prod_host = Some(" ".to_string());
        assert!(validate_config(&config).is_err());
    }
}

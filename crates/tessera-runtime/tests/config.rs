//! Configuration as seen through the runtime builder.

use figment::Jail;
use tessera_core::Document;
use tessera_framework::{ModuleCatalog, Phase};
use tessera_runtime::{ConfigError, PageRuntime, RuntimeError};

fn builder() -> tessera_runtime::RuntimeBuilder {
    PageRuntime::builder()
        .document(Document::new())
        .catalog(ModuleCatalog::new())
}

#[test]
fn test_defaults_without_files() {
    Jail::expect_with(|_jail| {
        let rt = builder().build().unwrap();
        let config = rt.config();
        assert_eq!(config.page.delayed_ms, 3000);
        assert!(config.page.header && config.page.footer);
        assert_eq!(config.telemetry.default_weight, 100);
        assert!(config.plugins.is_empty());
        assert_eq!(rt.context().code_base_path(), "");
        Ok(())
    });
}

#[test]
fn test_env_overrides_code_base_path() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "tessera.toml",
            r#"
            [page]
            code_base_path = "/from-file"
            "#,
        )?;
        jail.set_env("TESSERA_PAGE__CODE_BASE_PATH", "/code");

        let rt = builder().build().unwrap();
        assert_eq!(rt.context().code_base_path(), "/code");
        Ok(())
    });
}

#[test]
fn test_env_ignored_when_disabled() {
    Jail::expect_with(|jail| {
        jail.set_env("TESSERA_PAGE__CODE_BASE_PATH", "/code");
        let rt = builder().without_env().build().unwrap();
        assert_eq!(rt.context().code_base_path(), "");
        Ok(())
    });
}

#[test]
fn test_declared_plugins_registered() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "tessera.toml",
            r#"
            [page]
            url = "https://www.example.com/blog/post"

            [[plugins]]
            url = "/plugins/experimentation/"

            [[plugins]]
            id = "martech"
            url = "/plugins/martech/index.js"
            load_phase = "lazy"
            options = { consent = true }

            [[templates]]
            id = "blog"
            url = "/templates/blog"
            "#,
        )?;

        let rt = builder().build().unwrap();
        let plugins = rt.context().plugins();
        assert_eq!(plugins.ids(), vec!["experimentation", "martech", "blog"]);

        let martech = plugins.get("martech").unwrap();
        assert_eq!(martech.config().load_phase, Phase::Lazy);
        assert_eq!(martech.config().options["consent"], true);
        assert!(rt.context().templates().has("blog"));
        assert_eq!(
            rt.context().location().map(|l| l.origin()).as_deref(),
            Some("https://www.example.com")
        );
        Ok(())
    });
}

#[test]
fn test_invalid_config_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "tessera.toml",
            r#"
            [[plugins]]
            url = "/plugins/foo"

            [[templates]]
            id = "foo"
            url = "/templates/foo"
            "#,
        )?;

        let result = builder().build();
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::DuplicatePluginId(id))) if id == "foo"
        ));
        Ok(())
    });
}

#[test]
fn test_missing_config_file() {
    Jail::expect_with(|_jail| {
        let result = builder().config_file("missing.toml").build();
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::FileNotFound(_)))
        ));
        Ok(())
    });
}

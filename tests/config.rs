// ABOUTME: Integration tests for configuration parsing and discovery.
// ABOUTME: Tests YAML parsing, package rules, env var interpolation and file lookup.

use chartpilot::config::*;
use chartpilot::deploy::Archetype;
use chartpilot::error::Error;
use chartpilot::types::Environment;
use std::fs;
use std::time::Duration;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let yaml = r#"
packages:
  - name: api
    path: charts/api
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.packages.len(), 1);
        assert_eq!(config.packages.first().name, "api");
        assert!(config.environments.is_empty());
        assert!(config.namespace_prefix.is_none());
    }

    #[test]
    fn parse_full_package() {
        let yaml = r#"
packages:
  - name: importer
    path: charts/importer
    namespace: jobs
    supports_image_override: true
    archetype: batch-job
    timeout: 1h 30m
    required_secrets: [importer-db]
    required_volumes: [importer-scratch]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let package = config.package("importer").unwrap();

        assert_eq!(package.namespace.as_deref(), Some("jobs"));
        assert!(package.supports_image_override);
        assert_eq!(package.profile.archetype, Archetype::BatchJob);
        assert_eq!(package.profile.timeout, Some(Duration::from_secs(90 * 60)));
        assert_eq!(package.required_secrets, vec!["importer-db"]);
        assert_eq!(package.required_volumes, vec!["importer-scratch"]);
    }

    #[test]
    fn archetype_defaults_to_lookup_table() {
        let yaml = r#"
packages:
  - name: clickhouse
    path: charts/clickhouse
"#;
        let package = Config::from_yaml(yaml).unwrap().package("clickhouse").unwrap();
        assert_eq!(package.profile.archetype, Archetype::StatefulStore);
    }

    #[test]
    fn missing_packages_returns_error() {
        let result = Config::from_yaml("namespace_prefix: team-\n");
        assert!(result.is_err());
    }

    #[test]
    fn empty_packages_returns_error() {
        let err = Config::from_yaml("packages: []\n").unwrap_err();
        assert!(err.to_string().contains("at least one package"));
    }

    #[test]
    fn duplicate_package_returns_error() {
        let yaml = r#"
packages:
  - name: api
    path: charts/api
  - name: api
    path: charts/api-v2
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate package: api"));
    }

    #[test]
    fn empty_package_name_returns_error() {
        let yaml = r#"
packages:
  - name: ""
    path: charts/api
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn namespace_and_namespaces_conflict() {
        let yaml = r#"
packages:
  - name: edge-proxy
    path: charts/edge-proxy
    namespace: edge
    namespaces: [team-a, team-b]
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("both namespace and namespaces"));
    }

    #[test]
    fn malformed_timeout_returns_error() {
        let yaml = r#"
packages:
  - name: api
    path: charts/api
    timeout: eventually
"#;
        assert!(matches!(Config::from_yaml(yaml), Err(Error::Yaml(_))));
    }
}

mod env_vars {
    use super::*;

    const YAML: &str = r#"
packages:
  - name: api
    path: charts/api
environments:
  production:
    namespace: prod
    image_repository:
      env: CHARTPILOT_TEST_REGISTRY
  staging:
    image_repository:
      env: CHARTPILOT_TEST_STAGING_REGISTRY
      default: registry.local/staging
"#;

    #[test]
    fn literal_value() {
        let value: EnvValue = serde_yaml::from_str("registry.local").unwrap();
        assert_eq!(value, EnvValue::Literal("registry.local".to_string()));
        assert_eq!(value.resolve().unwrap(), "registry.local");
    }

    #[test]
    fn image_repository_from_environment() {
        let config = Config::from_yaml(YAML).unwrap();
        temp_env::with_var("CHARTPILOT_TEST_REGISTRY", Some("ghcr.io/acme"), || {
            let options = config.options_for(Environment::Production).unwrap();
            assert_eq!(options.image_repository.as_deref(), Some("ghcr.io/acme"));
            assert_eq!(options.default_namespace.as_deref(), Some("prod"));
        });
    }

    #[test]
    fn unset_variable_without_default_errors() {
        let config = Config::from_yaml(YAML).unwrap();
        temp_env::with_var_unset("CHARTPILOT_TEST_REGISTRY", || {
            let result = config.options_for(Environment::Production);
            assert!(matches!(
                result,
                Err(Error::MissingEnvVar(var)) if var == "CHARTPILOT_TEST_REGISTRY"
            ));
        });
    }

    #[test]
    fn empty_variable_uses_default() {
        let config = Config::from_yaml(YAML).unwrap();
        temp_env::with_var("CHARTPILOT_TEST_STAGING_REGISTRY", Some(""), || {
            let options = config.options_for(Environment::Staging).unwrap();
            assert_eq!(
                options.image_repository.as_deref(),
                Some("registry.local/staging")
            );
        });
    }

    #[test]
    fn unconfigured_environment_has_no_defaults() {
        let config = Config::from_yaml(YAML).unwrap();
        let options = config.options_for(Environment::Development).unwrap();
        assert_eq!(options.environment, Environment::Development);
        assert!(options.image_repository.is_none());
        assert!(options.default_namespace.is_none());
    }
}

mod discovery {
    use super::*;

    const MINIMAL: &str = "packages:\n  - name: api\n    path: charts/api\n";

    #[test]
    fn finds_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), MINIMAL).unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.packages.first().name, "api");
    }

    #[test]
    fn finds_config_in_dot_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".chartpilot")).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_DIR), MINIMAL).unwrap();

        assert!(Config::discover(dir.path()).is_ok());
    }

    #[test]
    fn primary_file_wins_over_alternatives() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), MINIMAL).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME_ALT),
            "packages:\n  - name: other\n    path: charts/other\n",
        )
        .unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.packages.first().name, "api");
    }

    #[test]
    fn missing_config_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(path) if path == dir.path()));
    }
}

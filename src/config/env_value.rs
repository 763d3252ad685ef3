// ABOUTME: Environment variable value types with interpolation support.
// ABOUTME: A config string given literally or read from an environment variable.

use crate::error::{Error, Result};
use serde::Deserialize;

/// `registry.local` or `{ env: REGISTRY, default: registry.local }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) if !val.is_empty() => Ok(val),
                _ => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_reference_falls_back_to_default() {
        let value = EnvValue::FromEnv {
            var: "CHARTPILOT_TEST_UNSET_REGISTRY".to_string(),
            default: Some("registry.local".to_string()),
        };
        temp_env::with_var_unset("CHARTPILOT_TEST_UNSET_REGISTRY", || {
            assert_eq!(value.resolve().unwrap(), "registry.local");
        });
    }

    #[test]
    fn env_reference_without_default_errors() {
        let value = EnvValue::FromEnv {
            var: "CHARTPILOT_TEST_MISSING_REGISTRY".to_string(),
            default: None,
        };
        temp_env::with_var_unset("CHARTPILOT_TEST_MISSING_REGISTRY", || {
            assert!(matches!(value.resolve(), Err(Error::MissingEnvVar(_))));
        });
    }
}

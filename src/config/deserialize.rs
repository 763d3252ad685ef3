// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Enforces a non-empty package list with unique names.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;

use super::PackageConfig;

pub fn deserialize_packages<'de, D>(deserializer: D) -> Result<NonEmpty<PackageConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let packages: Vec<PackageConfig> = Vec::deserialize(deserializer)?;

    let mut seen = HashSet::new();
    for package in &packages {
        if package.name.is_empty() {
            return Err(serde::de::Error::custom("package name cannot be empty"));
        }
        if !seen.insert(package.name.as_str()) {
            return Err(serde::de::Error::custom(format!(
                "duplicate package: {}",
                package.name
            )));
        }
        if package.namespace.is_some() && !package.namespaces.is_empty() {
            return Err(serde::de::Error::custom(format!(
                "package {} sets both namespace and namespaces",
                package.name
            )));
        }
    }

    NonEmpty::from_vec(packages)
        .ok_or_else(|| serde::de::Error::custom("at least one package is required"))
}

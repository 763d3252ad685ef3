// ABOUTME: Data model exchanged with the release port.
// ABOUTME: Release info, revisions, pending operations and upgrade directives.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle status of a release revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ReleaseStatus {
    Deployed,
    Failed,
    Superseded,
    Uninstalling,
    Uninstalled,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    Unknown(String),
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::Superseded => "superseded",
            ReleaseStatus::Uninstalling => "uninstalling",
            ReleaseStatus::Uninstalled => "uninstalled",
            ReleaseStatus::PendingInstall => "pending-install",
            ReleaseStatus::PendingUpgrade => "pending-upgrade",
            ReleaseStatus::PendingRollback => "pending-rollback",
            ReleaseStatus::Unknown(s) => s,
        }
    }

    /// The operation a pending status is waiting on.
    pub fn pending_operation(&self) -> Option<OperationType> {
        match self {
            ReleaseStatus::PendingInstall => Some(OperationType::Install),
            ReleaseStatus::PendingUpgrade => Some(OperationType::Upgrade),
            ReleaseStatus::PendingRollback => Some(OperationType::Rollback),
            _ => None,
        }
    }

    /// Whether a revision in this status is a safe rollback target.
    pub fn is_rollback_target(&self) -> bool {
        matches!(self, ReleaseStatus::Deployed | ReleaseStatus::Superseded)
    }
}

impl From<&str> for ReleaseStatus {
    fn from(s: &str) -> Self {
        match s {
            "deployed" => ReleaseStatus::Deployed,
            "failed" => ReleaseStatus::Failed,
            "superseded" => ReleaseStatus::Superseded,
            "uninstalling" => ReleaseStatus::Uninstalling,
            "uninstalled" => ReleaseStatus::Uninstalled,
            "pending-install" => ReleaseStatus::PendingInstall,
            "pending-upgrade" => ReleaseStatus::PendingUpgrade,
            "pending-rollback" => ReleaseStatus::PendingRollback,
            other => ReleaseStatus::Unknown(other.to_string()),
        }
    }
}

impl From<ReleaseStatus> for String {
    fn from(status: ReleaseStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployed release as reported by the package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub status: ReleaseStatus,
    /// Chart reference, e.g. `edge-proxy-1.4.2`.
    pub chart: String,
    pub app_version: String,
    pub updated: Option<DateTime<Utc>>,
}

/// One entry of a release's revision history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub revision: u32,
    pub status: ReleaseStatus,
    pub chart: String,
    pub app_version: String,
    pub updated: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Kind of operation holding a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Install,
    Upgrade,
    Rollback,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationType::Install => "install",
            OperationType::Upgrade => "upgrade",
            OperationType::Rollback => "rollback",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingStatus {
    InProgress,
    /// Pending for longer than any live operation plausibly could be.
    Stuck,
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PendingStatus::InProgress => "in-progress",
            PendingStatus::Stuck => "stuck",
        })
    }
}

/// An in-flight operation observed on a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingOperation {
    pub operation: OperationType,
    pub status: PendingStatus,
    pub started_at: Option<DateTime<Utc>>,
    /// Identifier of whoever started the operation, when the backend records it.
    pub owner: Option<String>,
}

impl PendingOperation {
    pub fn is_stuck(&self) -> bool {
        self.status == PendingStatus::Stuck
    }
}

/// Image repository and tag injected into a chart's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOverride {
    pub repository: String,
    pub tag: String,
}

/// Rendering options for a local template run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOptions {
    pub namespace: String,
    pub values_file: PathBuf,
    pub image: Option<ImageOverride>,
    pub set_values: BTreeMap<String, String>,
}

impl TemplateOptions {
    /// Flattened `key=value` pairs for `--set`.
    pub fn set_args(&self) -> Vec<String> {
        set_args(self.image.as_ref(), &self.set_values)
    }
}

/// Fully-resolved instruction for a single upgrade-install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeDirective {
    pub values_file: PathBuf,
    pub namespace: String,
    pub create_namespace: bool,
    pub wait: bool,
    pub wait_for_jobs: bool,
    pub timeout: Duration,
    pub force: bool,
    pub atomic: bool,
    pub dry_run: bool,
    pub image: Option<ImageOverride>,
    pub set_values: BTreeMap<String, String>,
}

impl UpgradeDirective {
    /// Flattened `key=value` pairs for `--set`.
    pub fn set_args(&self) -> Vec<String> {
        set_args(self.image.as_ref(), &self.set_values)
    }
}

fn set_args(image: Option<&ImageOverride>, extra: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = Vec::with_capacity(extra.len() + 2);
    if let Some(image) = image {
        args.push(format!("image.repository={}", image.repository));
        args.push(format!("image.tag={}", image.tag));
    }
    args.extend(extra.iter().map(|(k, v)| format!("{k}={v}")));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_helm_strings() {
        for s in ["deployed", "pending-upgrade", "superseded", "weird"] {
            assert_eq!(ReleaseStatus::from(s).as_str(), s);
        }
        assert_eq!(
            ReleaseStatus::from("pending-rollback").pending_operation(),
            Some(OperationType::Rollback)
        );
        assert_eq!(ReleaseStatus::Deployed.pending_operation(), None);
    }

    #[test]
    fn set_args_put_image_first() {
        let mut set_values = BTreeMap::new();
        set_values.insert("forceUpdate".to_string(), "true".to_string());
        let options = TemplateOptions {
            namespace: "team-a".to_string(),
            values_file: PathBuf::from("values.yaml"),
            image: Some(ImageOverride {
                repository: "registry.local/edge-proxy".to_string(),
                tag: "v2".to_string(),
            }),
            set_values,
        };

        assert_eq!(
            options.set_args(),
            vec![
                "image.repository=registry.local/edge-proxy",
                "image.tag=v2",
                "forceUpdate=true",
            ]
        );
    }
}

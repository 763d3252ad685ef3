// ABOUTME: ClusterProbe implementation backed by kubectl.
// ABOUTME: Presence checks use `kubectl get` and its exit status.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::{ClusterError, ClusterProbe};

#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: PathBuf,
    context: Option<String>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

impl Kubectl {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("kubectl"),
            context: None,
        }
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    async fn exists(&self, kind: &str, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        let mut cmd = Command::new(&self.binary);
        if let Some(ref context) = self.context {
            cmd.arg("--context").arg(context);
        }
        let output = cmd
            .args(["get", kind, name, "--namespace", namespace, "-o", "name"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(ClusterError::Spawn)?;

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("NotFound") || stderr.contains("not found") {
            Ok(false)
        } else {
            Err(ClusterError::Query(stderr.trim().to_string()))
        }
    }
}

#[async_trait]
impl ClusterProbe for Kubectl {
    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool, ClusterError> {
        self.exists("secret", namespace, name).await
    }

    async fn volume_claim_exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, ClusterError> {
        self.exists("persistentvolumeclaim", namespace, name).await
    }
}

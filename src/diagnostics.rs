// ABOUTME: Advisory findings collected during a deployment.
// ABOUTME: Advisories never abort a deployment; hard failures are ValidationError instead.

/// Collects non-blocking findings during one deployment call.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    advisories: Vec<Advisory>,
}

impl Diagnostics {
    /// Record an advisory, auto-logging it via tracing.
    pub fn warn(&mut self, advisory: Advisory) {
        tracing::warn!(kind = ?advisory.kind, "{}", advisory.message);
        self.advisories.push(advisory);
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn has_warnings(&self) -> bool {
        !self.advisories.is_empty()
    }

    pub fn contains(&self, kind: AdvisoryKind) -> bool {
        self.advisories.iter().any(|a| a.kind == kind)
    }
}

/// A non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn default_values_file(message: impl Into<String>) -> Self {
        Self::new(AdvisoryKind::DefaultValuesFile, message)
    }

    pub fn missing_secret(message: impl Into<String>) -> Self {
        Self::new(AdvisoryKind::MissingSecret, message)
    }

    pub fn missing_volume(message: impl Into<String>) -> Self {
        Self::new(AdvisoryKind::MissingVolumeClaim, message)
    }

    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::new(AdvisoryKind::ClusterProbe, message)
    }

    pub fn legacy_cleanup(message: impl Into<String>) -> Self {
        Self::new(AdvisoryKind::LegacyReleaseCleanup, message)
    }

    pub fn pending_operation(message: impl Into<String>) -> Self {
        Self::new(AdvisoryKind::PendingOperation, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryKind {
    /// Environment-specific values file absent; the default was used.
    DefaultValuesFile,
    /// A secret the package expects is not present yet.
    MissingSecret,
    /// A volume claim the package expects is not present yet.
    MissingVolumeClaim,
    /// The cluster could not be queried for a presence check.
    ClusterProbe,
    /// Removing a plain-named release before a multi-namespace deploy failed.
    LegacyReleaseCleanup,
    /// Another operation was in flight or had to be cleared.
    PendingOperation,
}

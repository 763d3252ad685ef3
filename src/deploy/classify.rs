// ABOUTME: Classifies release-operation failures into a retry taxonomy.
// ABOUTME: Derives retriability, backoff delay and alert severity from the error kind.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

/// Failure categories, in matching precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    OwnershipConflict,
    LockConflict,
    Timeout,
    Network,
    ResourceNotFound,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::OwnershipConflict => "ownership-conflict",
            ErrorKind::LockConflict => "lock-conflict",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::ResourceNotFound => "resource-not-found",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Backoff before the attempt following `attempt`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let (base, step) = match self {
            ErrorKind::LockConflict => (15, 5),
            ErrorKind::Timeout => (10, 3),
            ErrorKind::Network => (5, 2),
            _ => (8, 4),
        };
        Duration::from_secs(base + step * u64::from(attempt))
    }

    pub fn alert_level(&self, attempt: u32) -> AlertLevel {
        match self {
            ErrorKind::OwnershipConflict => AlertLevel::Critical,
            ErrorKind::Timeout if attempt >= 3 => AlertLevel::Critical,
            ErrorKind::Timeout => AlertLevel::High,
            ErrorKind::LockConflict if attempt >= 2 => AlertLevel::High,
            ErrorKind::LockConflict => AlertLevel::Medium,
            ErrorKind::Network => AlertLevel::Medium,
            _ if attempt >= 2 => AlertLevel::High,
            _ => AlertLevel::Low,
        }
    }

    pub fn is_critical_failure(&self, attempt: u32) -> bool {
        *self == ErrorKind::OwnershipConflict
            || attempt >= 3
            || (*self == ErrorKind::Timeout && attempt >= 2)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    /// The message matched a known transient phrase.
    pub transient: bool,
}

impl Classification {
    pub fn is_retriable(&self) -> bool {
        match self.kind {
            ErrorKind::OwnershipConflict => false,
            ErrorKind::LockConflict | ErrorKind::Timeout | ErrorKind::Network => true,
            ErrorKind::Unknown => self.transient,
            ErrorKind::ResourceNotFound => false,
        }
    }
}

/// Maps failure messages to a [`Classification`].
///
/// The retry loop only depends on this trait, so a structured error-code
/// scheme can replace phrase matching without touching backoff logic.
pub trait Classifier: Send + Sync {
    fn classify(&self, message: &str) -> Classification;
}

const OWNERSHIP_PHRASES: &[&str] = &[
    "invalid ownership metadata",
    "cannot be imported into the current release",
    "exists and cannot be imported",
    "already owned by",
    "meta.helm.sh/release-name",
    "meta.helm.sh/release-namespace",
];

const LOCK_PHRASES: &[&str] = &[
    "another operation (install/upgrade/rollback) is in progress",
    "another operation in progress",
    "operation in progress",
    "pending-install",
    "pending-upgrade",
    "pending-rollback",
    "resource busy",
];

const TIMEOUT_PHRASES: &[&str] = &["context deadline exceeded", "i/o timeout"];

const NETWORK_PHRASES: &[&str] = &[
    "connection refused",
    "connection reset",
    "no such host",
    "bad response",
];

const NOT_FOUND_PHRASES: &[&str] = &["not found"];

const TRANSIENT_PHRASES: &[&str] = &[
    "temporary failure",
    "resource temporarily unavailable",
    "server is currently unable to handle the request",
];

static TIMEOUT_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time(d)?\s?out after \d+").expect("timeout pattern is a valid regex")
});

/// Case-insensitive substring matching over static phrase tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseClassifier;

impl Classifier for PhraseClassifier {
    fn classify(&self, message: &str) -> Classification {
        let message = message.to_lowercase();
        let matches = |phrases: &[&str]| phrases.iter().any(|p| message.contains(p));

        let kind = if matches(OWNERSHIP_PHRASES) {
            ErrorKind::OwnershipConflict
        } else if matches(LOCK_PHRASES) {
            ErrorKind::LockConflict
        } else if matches(TIMEOUT_PHRASES) || TIMEOUT_AFTER.is_match(&message) {
            ErrorKind::Timeout
        } else if matches(NETWORK_PHRASES) {
            ErrorKind::Network
        } else if matches(NOT_FOUND_PHRASES) {
            ErrorKind::ResourceNotFound
        } else {
            ErrorKind::Unknown
        };

        Classification {
            kind,
            transient: kind == ErrorKind::Unknown && matches(TRANSIENT_PHRASES),
        }
    }
}

/// Classify with the default phrase tables.
pub fn classify(message: &str) -> Classification {
    PhraseClassifier.classify(message)
}

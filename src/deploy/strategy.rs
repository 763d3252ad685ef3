// ABOUTME: Deployment archetypes and the timeout/wait policy derived from them.
// ABOUTME: Packages are classified through static name tables, not branching logic.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Runtime shape of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    /// Relational, columnar and search data stores.
    StatefulStore,
    /// One-shot migration and backup workloads.
    BatchJob,
    /// User-facing web applications.
    Frontend,
    /// APIs and log pipelines.
    BackendService,
    /// Ingress and auth edge services.
    Infrastructure,
    Unknown,
}

impl Archetype {
    /// Look up a package name in the static profile table.
    pub fn classify(package: &str) -> Self {
        profile_row(package)
            .map(|row| row.archetype)
            .unwrap_or(Archetype::Unknown)
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            Archetype::StatefulStore => minutes(12),
            Archetype::BatchJob => minutes(8),
            Archetype::Frontend => minutes(3),
            Archetype::BackendService => minutes(5),
            Archetype::Infrastructure => minutes(4),
            Archetype::Unknown => minutes(6),
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        match self {
            Archetype::BatchJob => WaitPolicy {
                wait: true,
                wait_for_jobs: true,
                atomic: true,
            },
            _ => WaitPolicy {
                wait: true,
                wait_for_jobs: false,
                atomic: true,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::StatefulStore => "stateful-store",
            Archetype::BatchJob => "batch-job",
            Archetype::Frontend => "frontend",
            Archetype::BackendService => "backend-service",
            Archetype::Infrastructure => "infrastructure",
            Archetype::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How helm should wait on an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Wait for workloads to become ready.
    pub wait: bool,
    /// Also wait for jobs to complete.
    pub wait_for_jobs: bool,
    /// Roll back automatically on failure. Always set.
    pub atomic: bool,
}

/// Timeout for an archetype; an explicit caller override always wins.
pub fn compute_timeout(archetype: Archetype, explicit: Option<Duration>) -> Duration {
    explicit.unwrap_or_else(|| archetype.default_timeout())
}

struct ProfileRow {
    name: &'static str,
    archetype: Archetype,
    timeout: Option<Duration>,
    home_namespace: Option<&'static str>,
}

const fn row(name: &'static str, archetype: Archetype) -> ProfileRow {
    ProfileRow {
        name,
        archetype,
        timeout: None,
        home_namespace: None,
    }
}

/// Well-known packages. Onboarding a package is a table edit.
const PROFILES: &[ProfileRow] = &[
    // Primary relational store: WAL replay and index rebuilds need extra time.
    ProfileRow {
        name: "postgres",
        archetype: Archetype::StatefulStore,
        timeout: Some(minutes(15)),
        home_namespace: None,
    },
    // Primary columnar store.
    ProfileRow {
        name: "clickhouse",
        archetype: Archetype::StatefulStore,
        timeout: None,
        home_namespace: Some("databases"),
    },
    row("postgresql", Archetype::StatefulStore),
    row("mysql", Archetype::StatefulStore),
    row("elasticsearch", Archetype::StatefulStore),
    row("opensearch", Archetype::StatefulStore),
    row("redis", Archetype::StatefulStore),
    row("cache-store", Archetype::StatefulStore),
    ProfileRow {
        name: "migrations",
        archetype: Archetype::BatchJob,
        timeout: Some(minutes(10)),
        home_namespace: None,
    },
    ProfileRow {
        name: "db-migrate",
        archetype: Archetype::BatchJob,
        timeout: Some(minutes(10)),
        home_namespace: None,
    },
    row("backup", Archetype::BatchJob),
    row("importer-job", Archetype::BatchJob),
    row("frontend", Archetype::Frontend),
    row("web", Archetype::Frontend),
    row("dashboard", Archetype::Frontend),
    row("admin-ui", Archetype::Frontend),
    row("api", Archetype::BackendService),
    row("worker", Archetype::BackendService),
    row("vector", Archetype::BackendService),
    row("fluent-bit", Archetype::BackendService),
    row("ingress-nginx", Archetype::Infrastructure),
    row("traefik", Archetype::Infrastructure),
    row("oauth2-proxy", Archetype::Infrastructure),
    row("edge-proxy", Archetype::Infrastructure),
];

fn profile_row(package: &str) -> Option<&'static ProfileRow> {
    PROFILES.iter().find(|row| row.name == package)
}

/// Everything the strategist knows about one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageProfile {
    pub archetype: Archetype,
    /// Package-specific timeout replacing the archetype default.
    pub timeout: Option<Duration>,
    /// Namespace a stateful store must be deployed into.
    pub home_namespace: Option<String>,
}

impl PackageProfile {
    /// Profile from the static table, or an unknown profile.
    pub fn lookup(package: &str) -> Self {
        match profile_row(package) {
            Some(row) => PackageProfile {
                archetype: row.archetype,
                timeout: row.timeout,
                home_namespace: row.home_namespace.map(str::to_string),
            },
            None => PackageProfile {
                archetype: Archetype::Unknown,
                timeout: None,
                home_namespace: None,
            },
        }
    }

    /// Timeout for one deployment call.
    ///
    /// Priority:
    /// 1. Explicit caller override
    /// 2. Package-specific timeout
    /// 3. Archetype default
    pub fn compute_timeout(&self, explicit: Option<Duration>) -> Duration {
        explicit
            .or(self.timeout)
            .unwrap_or_else(|| self.archetype.default_timeout())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.archetype.wait_policy()
    }
}

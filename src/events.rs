// ABOUTME: Structured deployment events consumed by downstream monitoring.
// ABOUTME: EventSink port with tracing, JSON-lines and in-memory implementations.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Event names are part of the monitoring contract; do not rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeploymentSuccess,
    SlowSuccess,
    DeploymentFailure,
    CriticalFailure,
    LockDetected,
    RetryAttempt,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DeploymentSuccess => "DEPLOYMENT_SUCCESS_METRIC",
            EventKind::SlowSuccess => "DEPLOYMENT_SLOW_SUCCESS",
            EventKind::DeploymentFailure => "DEPLOYMENT_FAILURE_METRIC",
            EventKind::CriticalFailure => "CRITICAL_DEPLOYMENT_FAILURE",
            EventKind::LockDetected => "HELM_LOCK_DETECTED",
            EventKind::RetryAttempt => "DEPLOYMENT_RETRY_METRIC",
        }
    }

    fn default_severity(&self) -> Severity {
        match self {
            EventKind::DeploymentSuccess | EventKind::RetryAttempt => Severity::Info,
            EventKind::SlowSuccess | EventKind::DeploymentFailure | EventKind::LockDetected => {
                Severity::Warn
            }
            EventKind::CriticalFailure => Severity::Error,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One structured event with its key-value context.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployEvent {
    pub kind: EventKind,
    pub severity: Severity,
    pub fields: Map<String, Value>,
}

impl DeployEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            fields: Map::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Event name plus fields as a single JSON object.
    pub fn to_json(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("event".to_string(), Value::from(self.kind.as_str()));
        Value::Object(object)
    }
}

/// Destination for deployment events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DeployEvent);
}

/// Emits events through `tracing` on the `chartpilot::metrics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: DeployEvent) {
        let name = event.kind.as_str();
        let fields = Value::Object(event.fields).to_string();
        match event.severity {
            Severity::Info => tracing::info!(target: "chartpilot::metrics", event = name, %fields),
            Severity::Warn => tracing::warn!(target: "chartpilot::metrics", event = name, %fields),
            Severity::Error => {
                tracing::error!(target: "chartpilot::metrics", event = name, %fields)
            }
        }
    }
}

/// Writes one JSON object per event to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: DeployEvent) {
        let mut stdout = std::io::stdout().lock();
        // Monitoring output is best effort; a closed pipe must not fail a deployment.
        let _ = writeln!(stdout, "{}", event.to_json());
    }
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<DeployEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeployEvent> {
        self.events.lock().clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<DeployEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: DeployEvent) {
        self.events.lock().push(event);
    }
}

// ABOUTME: Errors surfaced by the release port.
// ABOUTME: Messages carry the package manager's own wording so they can be classified.

/// Errors from release operations.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("release not found: {name} in namespace {namespace}")]
    NotFound { name: String, namespace: String },

    #[error("helm {operation} failed: {message}")]
    Command {
        operation: &'static str,
        message: String,
    },

    #[error("failed to run helm: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to parse helm output: {0}")]
    Parse(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ReleaseError {
    /// Build a command failure from a free-form message.
    pub fn command(operation: &'static str, message: impl Into<String>) -> Self {
        ReleaseError::Command {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReleaseError::NotFound { .. })
    }
}

// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: States carry the data that only exists once they are reached.

use super::deployment::{DeployPlan, DeployReport};
use super::lock::LockCheck;

/// Initial state: package and options captured, nothing checked yet.
/// Available actions: `validate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Validated: preconditions hold and the plan is resolved.
/// Available actions: `clear_conflicts()`, `plan()`
#[derive(Debug, Clone)]
pub struct Validated {
    pub(crate) plan: DeployPlan,
}

/// Cleared: legacy releases removed and the lock state inspected.
/// Available actions: attempt loop in the orchestrator
#[derive(Debug, Clone)]
pub struct Cleared {
    pub(crate) plan: DeployPlan,
    pub(crate) lock: LockCheck,
}

/// Completed: an attempt succeeded.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) report: DeployReport,
}

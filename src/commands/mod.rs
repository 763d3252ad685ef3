// ABOUTME: Command module aggregator for the chartpilot CLI.
// ABOUTME: Builds the orchestrator once and re-exports the command handlers.

mod deploy;
mod inspect;
mod rollback;

pub use deploy::{DeployRequest, deploy};
pub use inspect::{history, list, status, template, validate};
pub use rollback::{emergency_cleanup, rollback};

use chartpilot::cluster::Kubectl;
use chartpilot::deploy::Orchestrator;
use chartpilot::events::{EventSink, JsonLinesSink, TracingSink};
use chartpilot::output::OutputMode;
use chartpilot::release::HelmCli;
use std::sync::Arc;

/// Orchestrator wired to the real helm and kubectl binaries.
pub struct Clients {
    pub orchestrator: Orchestrator<HelmCli>,
}

impl Clients {
    pub fn new(kube_context: Option<&str>, mode: OutputMode) -> Self {
        let mut helm = HelmCli::new();
        let mut kubectl = Kubectl::new();
        if let Some(context) = kube_context {
            helm = helm.kube_context(context);
            kubectl = kubectl.context(context);
        }

        let events: Arc<dyn EventSink> = match mode {
            OutputMode::Json => Arc::new(JsonLinesSink),
            OutputMode::Normal | OutputMode::Quiet => Arc::new(TracingSink),
        };

        Self {
            orchestrator: Orchestrator::new(helm)
                .with_events(events)
                .with_probe(Arc::new(kubectl)),
        }
    }
}

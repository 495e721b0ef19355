//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use ctilink_config::Config;
use ctilink_esl::{RunOutcome, SessionError};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The switch client was started.
    ClientStarting,
    /// The switch client ended cleanly.
    ClientFinished(RunOutcome),
    /// The switch client failed with an error description.
    ClientFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn client_starting(&self, _config: &Config) {
        self.record(HealthEvent::ClientStarting);
    }

    fn client_finished(&self, outcome: RunOutcome) {
        self.record(HealthEvent::ClientFinished(outcome));
    }

    fn client_failed(&self, error: &SessionError) {
        self.record(HealthEvent::ClientFailed(error.to_string()));
    }
}

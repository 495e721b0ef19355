//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use ctilink_config::Config;
use ctilink_esl::{RunOutcome, SessionError};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when the switch client is started.
    fn client_starting(&self, config: &Config);

    /// Invoked when the client run loop ends cleanly.
    fn client_finished(&self, outcome: RunOutcome);

    /// Invoked when the client run loop fails.
    fn client_failed(&self, error: &SessionError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn client_starting(&self, config: &Config) {
        (**self).client_starting(config);
    }

    fn client_finished(&self, outcome: RunOutcome) {
        (**self).client_finished(outcome);
    }

    fn client_failed(&self, error: &SessionError) {
        (**self).client_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            switch = %config.switch_endpoint(),
            command_store = %config.command_store(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn client_starting(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "client_starting",
            switch = %config.switch_endpoint(),
            switch_id = config.switch_id(),
            poll_interval_secs = config.poll_interval().as_secs(),
            "starting switch client"
        );
    }

    fn client_finished(&self, outcome: RunOutcome) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "client_finished",
            outcome = ?outcome,
            "switch client finished"
        );
    }

    fn client_failed(&self, error: &SessionError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "client_failed",
            error = %error,
            "switch client failed"
        );
    }
}

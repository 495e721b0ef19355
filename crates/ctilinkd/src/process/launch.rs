//! Supervises the daemon from bootstrap through client shutdown.

use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use ctilink_esl::{RunOutcome, StopHandle};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::HealthReporter;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails or the client ends with an
/// error.
pub fn run_daemon() -> Result<RunOutcome, LaunchError> {
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        SystemShutdownSignal::new(),
    )
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: S,
) -> Result<RunOutcome, LaunchError>
where
    S: ShutdownSignal + 'static,
{
    let daemon = bootstrap_with(loader, reporter)?;
    let reporter = daemon.reporter();
    let mut client = daemon.client();

    reporter.client_starting(daemon.config());
    if let Err(error) = client.start() {
        reporter.client_failed(&error);
        return Err(error.into());
    }
    watch_for_shutdown(shutdown, client.stop_handle());

    match client.join() {
        Ok(outcome) => {
            reporter.client_finished(outcome);
            info!(target: PROCESS_TARGET, ?outcome, "shutdown sequence completed");
            Ok(outcome)
        }
        Err(error) => {
            reporter.client_failed(&error);
            Err(error.into())
        }
    }
}

// The watcher is detached: it either fires once or lives until process exit.
fn watch_for_shutdown<S>(shutdown: S, stop: StopHandle)
where
    S: ShutdownSignal + 'static,
{
    let spawned = thread::Builder::new()
        .name(String::from("ctilinkd-shutdown"))
        .spawn(move || match shutdown.wait() {
            Ok(()) => stop.request_stop(),
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "shutdown listener unavailable");
            }
        });
    if let Err(error) = spawned {
        warn!(target: PROCESS_TARGET, %error, "failed to spawn shutdown watcher");
    }
}

/// Maps the daemon result onto a process exit code.
///
/// A lost connection is a failure so that a supervisor restarts the daemon.
#[must_use]
pub fn exit_code(result: &Result<RunOutcome, LaunchError>) -> ExitCode {
    match result {
        Ok(RunOutcome::NoTarget | RunOutcome::Disconnected | RunOutcome::Stopped) => {
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::ConnectionLost) | Err(_) => ExitCode::FAILURE,
    }
}

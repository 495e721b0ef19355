//! The cooperative run loop for one connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::codec::BlockAssembler;
use crate::connection::{Connection, ReadOutcome};
use crate::error::SessionError;
use crate::events::EventRegistry;
use crate::ports::{CommandStore, RegistryProvider};
use crate::session::{BlockFlow, PendingBody, Session};
use crate::settings::ClientSettings;

const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

/// Why a run loop finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The registry had no active switch.
    NoTarget,
    /// The switch sent a disconnect notice.
    Disconnected,
    /// The switch closed the stream without notice.
    ConnectionLost,
    /// A stop was requested.
    Stopped,
}

/// Cloneable request to end a run loop.
///
/// The loop notices the request on its next idle tick or after its next
/// block; an in-progress read is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// A handle with no stop requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to finish.
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Connects to the registry's active switch and runs until the connection
/// ends or a stop is requested.
///
/// # Errors
///
/// Returns [`SessionError`] when the registry, the store or the connection
/// fails. The session is torn down before the error is returned.
pub fn run_session(
    registry: &mut dyn RegistryProvider,
    store: &mut dyn CommandStore,
    events: EventRegistry,
    settings: &ClientSettings,
    stop: &StopHandle,
) -> Result<RunOutcome, SessionError> {
    let Some(target) = registry.active_target()? else {
        info!(target: RUNNER_TARGET, "no active switch configured");
        return Ok(RunOutcome::NoTarget);
    };

    info!(
        target: RUNNER_TARGET,
        switch = %target.id,
        host = %target.host,
        port = target.port,
        "connecting to switch"
    );
    let mut connection = Connection::connect(&target.host, target.port, settings.connect_timeout)?;
    let mut session = Session::new(target, settings.clone(), events);

    let result = drive(&mut session, &mut connection, registry, store, stop);

    session.teardown();
    connection.close();
    match &result {
        Ok(outcome) => info!(
            target: RUNNER_TARGET,
            switch = %session.target().id,
            outcome = ?outcome,
            "session finished"
        ),
        Err(error) => warn!(
            target: RUNNER_TARGET,
            switch = %session.target().id,
            %error,
            "session failed"
        ),
    }
    result
}

fn drive(
    session: &mut Session,
    connection: &mut Connection,
    registry: &mut dyn RegistryProvider,
    store: &mut dyn CommandStore,
    stop: &StopHandle,
) -> Result<RunOutcome, SessionError> {
    let poll_interval = session.settings().poll_interval;
    let mut assembler = BlockAssembler::new();

    loop {
        if stop.is_stop_requested() {
            debug!(target: RUNNER_TARGET, "stop requested");
            return Ok(RunOutcome::Stopped);
        }

        let line = match connection.read_line(poll_interval)? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Idle => {
                session.poll_commands(connection, store)?;
                continue;
            }
            ReadOutcome::Closed => {
                warn!(
                    target: RUNNER_TARGET,
                    state = %session.state(),
                    "switch closed the connection"
                );
                return Ok(RunOutcome::ConnectionLost);
            }
        };

        let Some(mut block) = assembler.push_line(&line) else {
            continue;
        };
        if session.is_meta(&block) {
            assembler.hold(block);
            continue;
        }
        match session.pending_body(&block) {
            PendingBody::Absent => {}
            PendingBody::Length(length) => block.attach_body(connection.read_body(length)?),
            PendingBody::Unreadable => assembler.discard_through_blank_line(),
        }

        if session.handle_block(&block, connection, registry, store)? == BlockFlow::Disconnect {
            return Ok(RunOutcome::Disconnected);
        }
        session.poll_commands(connection, store)?;
    }
}

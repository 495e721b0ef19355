//! Event handler registry.
//!
//! Maps `Event-Name` values to plain handler functions. The defaults cover
//! heartbeats, background job completions and API notifications; callers may
//! register more before the client starts.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::codec::HeaderBlock;
use crate::correlator::Correlator;
use crate::error::SessionError;
use crate::ports::{CommandStore, RegistryProvider, SwitchTarget};

const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

/// Heartbeat emitted periodically by the switch.
pub const HEARTBEAT: &str = "HEARTBEAT";
/// Result of a `bgapi` command.
pub const BACKGROUND_JOB: &str = "BACKGROUND_JOB";
/// Notification that an API command ran.
pub const API: &str = "API";
/// Scheduler housekeeping, ignored by default.
pub const RE_SCHEDULE: &str = "RE_SCHEDULE";

/// Per-connection state a handler may touch.
pub struct EventContext<'a> {
    /// Job correlation for the connection.
    pub correlator: &'a mut Correlator,
    /// Switch registry.
    pub registry: &'a mut dyn RegistryProvider,
    /// Command store.
    pub store: &'a mut dyn CommandStore,
    /// The switch the connection talks to.
    pub target: &'a SwitchTarget,
}

/// Signature of an event handler.
pub type EventHandler = fn(&mut EventContext<'_>, &HeaderBlock) -> Result<(), SessionError>;

/// What happened to an event handed to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDispatch {
    /// A handler ran.
    Handled,
    /// No handler is registered for the event name.
    Unhandled,
    /// The block carried no event name.
    Unnamed,
}

/// Lookup table from event name to handler.
#[derive(Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<String, EventHandler>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        formatter
            .debug_struct("EventRegistry")
            .field("events", &names)
            .finish()
    }
}

impl EventRegistry {
    /// Registry with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers installed.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(HEARTBEAT, on_heartbeat);
        registry.register(BACKGROUND_JOB, on_background_job);
        registry.register(API, on_api);
        registry
    }

    /// Installs `handler` for `event_name`, replacing any previous one.
    pub fn register(&mut self, event_name: &str, handler: EventHandler) {
        self.handlers
            .insert(event_name.to_ascii_uppercase(), handler);
    }

    /// Returns `true` when a handler exists for `event_name`.
    #[must_use]
    pub fn handles(&self, event_name: &str) -> bool {
        self.handlers
            .contains_key(&event_name.to_ascii_uppercase())
    }

    /// Runs the handler registered for the block's event name.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    pub fn dispatch(
        &self,
        context: &mut EventContext<'_>,
        block: &HeaderBlock,
    ) -> Result<EventDispatch, SessionError> {
        let Some(event_name) = block.event_name() else {
            debug!(
                target: EVENTS_TARGET,
                content_type = block.content_type().unwrap_or_default(),
                headers = block.len(),
                "dropping block without event name"
            );
            return Ok(EventDispatch::Unnamed);
        };

        match self.handlers.get(&event_name.to_ascii_uppercase()) {
            Some(handler) => {
                handler(context, block)?;
                Ok(EventDispatch::Handled)
            }
            None => {
                warn!(target: EVENTS_TARGET, event = event_name, "unhandled event");
                Ok(EventDispatch::Unhandled)
            }
        }
    }
}

fn on_heartbeat(context: &mut EventContext<'_>, _block: &HeaderBlock) -> Result<(), SessionError> {
    context.registry.update_last_seen(&context.target.id)?;
    debug!(target: EVENTS_TARGET, switch = %context.target.id, "heartbeat");
    Ok(())
}

fn on_background_job(context: &mut EventContext<'_>, block: &HeaderBlock) -> Result<(), SessionError> {
    let Some(job_uuid) = block.job_uuid() else {
        warn!(target: EVENTS_TARGET, "background job event without job id");
        return Ok(());
    };
    let result = block.body().unwrap_or_default();
    context
        .correlator
        .on_background_job_complete(job_uuid, result, &mut *context.store)?;
    Ok(())
}

fn on_api(_context: &mut EventContext<'_>, block: &HeaderBlock) -> Result<(), SessionError> {
    info!(
        target: EVENTS_TARGET,
        command = block.get("API-Command").unwrap_or_default(),
        argument = block.get("API-Command-Argument").unwrap_or_default(),
        "api command executed"
    );
    Ok(())
}

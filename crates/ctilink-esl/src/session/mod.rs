//! Per-connection protocol state machine.
//!
//! A [`Session`] owns everything that lives for one connection: the handshake
//! state, the job correlator and the event handlers. The run loop feeds it
//! complete header blocks and idle ticks; the session decides what to write
//! back and when the connection is done.

use tracing::{debug, info, warn};

use crate::codec::{CONTENT_LENGTH, HeaderBlock, inner_body_length};
use crate::connection::CommandWriter;
use crate::correlator::Correlator;
use crate::error::SessionError;
use crate::events::{EventContext, EventRegistry};
use crate::ports::{CommandStore, RegistryProvider, SwitchTarget};
use crate::settings::ClientSettings;
use crate::state::ConnectionState;


const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

const AUTH_REQUEST: &str = "auth/request";
const COMMAND_REPLY: &str = "command/reply";
const DISCONNECT_NOTICE: &str = "text/disconnect-notice";
const EVENT_PLAIN: &str = "text/event-plain";
const AUTH_ACCEPTED: &str = "+OK accepted";
const LISTENER_ENABLED: &str = "+OK event listener enabled plain";
const ERROR_PREFIX: &str = "-ERR";

/// Whether the connection should keep going after a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlow {
    /// Keep reading.
    Continue,
    /// The switch announced it is hanging up.
    Disconnect,
}

/// What the run loop must read after a block before handling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingBody {
    /// Nothing follows the block.
    Absent,
    /// Exactly this many body bytes follow.
    Length(usize),
    /// A body follows but its length is unusable; input up to the next blank
    /// line is dropped so the body is not read as headers.
    Unreadable,
}

/// State of one connection to the switch.
#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    target: SwitchTarget,
    settings: ClientSettings,
    correlator: Correlator,
    events: EventRegistry,
}

impl Session {
    /// Starts a session for `target` in [`ConnectionState::Null`].
    #[must_use]
    pub fn new(target: SwitchTarget, settings: ClientSettings, events: EventRegistry) -> Self {
        Self {
            state: ConnectionState::Null,
            target,
            settings,
            correlator: Correlator::new(),
            events,
        }
    }

    /// Current handshake state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// The switch this session talks to.
    #[must_use]
    pub const fn target(&self) -> &SwitchTarget {
        &self.target
    }

    /// Settings the session was started with.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Job correlation state.
    #[must_use]
    pub const fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    /// Returns `true` for the outer frame of a plain event.
    ///
    /// Such a block carries only the frame's type and length; the event's own
    /// headers follow and belong to the same block.
    #[must_use]
    pub fn is_meta(&self, block: &HeaderBlock) -> bool {
        self.state.is_subscribed()
            && block.len() == 2
            && block.content_type() == Some(EVENT_PLAIN)
            && block
                .get(CONTENT_LENGTH)
                .is_some_and(|length| !length.is_empty())
    }

    /// What to read after `block` before handling it.
    ///
    /// An unparseable or oversized length is logged and the block is still
    /// handled, without its body.
    #[must_use]
    pub fn pending_body(&self, block: &HeaderBlock) -> PendingBody {
        if is_disconnect(block) {
            return PendingBody::Absent;
        }
        match inner_body_length(block, self.state) {
            Ok(Some(length)) => PendingBody::Length(length),
            Ok(None) => PendingBody::Absent,
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    %error,
                    event = block.event_name().unwrap_or_default(),
                    "skipping event body"
                );
                PendingBody::Unreadable
            }
        }
    }

    /// Processes one complete block.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a write to the switch fails or a
    /// collaborator rejects an update.
    pub fn handle_block<W>(
        &mut self,
        block: &HeaderBlock,
        writer: &mut W,
        registry: &mut dyn RegistryProvider,
        store: &mut dyn CommandStore,
    ) -> Result<BlockFlow, SessionError>
    where
        W: CommandWriter + ?Sized,
    {
        if is_disconnect(block) {
            info!(
                target: SESSION_TARGET,
                switch = %self.target.id,
                state = %self.state,
                "switch sent disconnect notice"
            );
            self.transition(ConnectionState::Null);
            self.correlator.clear();
            return Ok(BlockFlow::Disconnect);
        }

        let content_type = block.content_type();
        match (self.state, content_type) {
            (ConnectionState::Null, Some(AUTH_REQUEST)) => {
                debug!(target: SESSION_TARGET, switch = %self.target.id, "sending credentials");
                writer.send_command(&format!("auth {}", self.target.password))?;
                self.transition(ConnectionState::Authing);
                return Ok(BlockFlow::Continue);
            }
            (ConnectionState::Authing, Some(COMMAND_REPLY)) => {
                let reply = block.reply_text().unwrap_or_default();
                if reply == AUTH_ACCEPTED {
                    for subscription in &self.settings.subscriptions {
                        writer.send_command(subscription)?;
                    }
                    self.transition(ConnectionState::Authed);
                    return Ok(BlockFlow::Continue);
                }
                if reply.starts_with(ERROR_PREFIX) {
                    warn!(
                        target: SESSION_TARGET,
                        switch = %self.target.id,
                        reply,
                        "switch rejected authentication"
                    );
                    return Ok(BlockFlow::Continue);
                }
            }
            (ConnectionState::Authed, Some(COMMAND_REPLY))
                if block.reply_text() == Some(LISTENER_ENABLED) =>
            {
                self.transition(ConnectionState::Subscribed);
                return Ok(BlockFlow::Continue);
            }
            _ => {}
        }

        if content_type == Some(COMMAND_REPLY) {
            self.correlator.on_command_reply(block);
            return Ok(BlockFlow::Continue);
        }

        if let Some(event_name) = block.event_name()
            && self.settings.ignores(event_name)
        {
            return Ok(BlockFlow::Continue);
        }

        let mut context = EventContext {
            correlator: &mut self.correlator,
            registry,
            store,
            target: &self.target,
        };
        self.events.dispatch(&mut context, block)?;
        Ok(BlockFlow::Continue)
    }

    /// Sends pending commands when subscribed. Returns how many were sent.
    ///
    /// Called after every handled block and on every idle tick.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the store or the connection fails.
    pub fn poll_commands<W>(
        &mut self,
        writer: &mut W,
        store: &mut dyn CommandStore,
    ) -> Result<usize, SessionError>
    where
        W: CommandWriter + ?Sized,
    {
        if !self.state.is_subscribed() {
            return Ok(0);
        }
        self.correlator.dispatch_pending(writer, store)
    }

    /// Drops all per-connection state and marks the session closed.
    pub fn teardown(&mut self) {
        if self.correlator.pending_len() > 0 || self.correlator.job_count() > 0 {
            debug!(
                target: SESSION_TARGET,
                pending = self.correlator.pending_len(),
                jobs = self.correlator.job_count(),
                "discarding unfinished commands"
            );
        }
        self.correlator.clear();
        self.transition(ConnectionState::Closed);
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(
                target: SESSION_TARGET,
                switch = %self.target.id,
                from = %self.state,
                to = %next,
                "session state changed"
            );
        }
        self.state = next;
    }
}

fn is_disconnect(block: &HeaderBlock) -> bool {
    block.content_type() == Some(DISCONNECT_NOTICE)
}

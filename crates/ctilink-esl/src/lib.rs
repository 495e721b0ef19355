//! Event socket client for a telephony switch.
//!
//! The client holds one TCP connection to the switch, authenticates, subscribes
//! to plain-text events and then serves two directions at once: commands
//! pulled from a [`CommandStore`] are sent as background jobs, and the
//! switch's events are routed through an [`EventRegistry`] that confirms job
//! results and tracks heartbeats. Registry and store are traits so the embedding
//! process decides where switches and commands live.
//!
//! [`EslClient`] runs the loop on its own thread; [`run_session`] runs it on
//! the caller's.

mod client;
mod codec;
mod connection;
mod correlator;
mod error;
mod events;
mod memory;
mod ports;
mod runner;
mod session;
mod settings;
mod state;

#[cfg(test)]
mod tests;

pub use client::{Collaborators, EslClient};
pub use codec::{
    BODY_KEY, BlockAssembler, COMMAND_TERMINATOR, CONTENT_LENGTH, CONTENT_TYPE, EVENT_NAME,
    HeaderBlock, INNER_CONTENT_LENGTH, JOB_UUID, MAX_BODY_LEN, REPLY_TEXT, encode_command,
    inner_body_length, parse_header_line,
};
pub use connection::{CommandWriter, Connection, ReadOutcome};
pub use correlator::{CompletionOutcome, Correlator, Job, PendingCommand, ReplyOutcome};
pub use error::{CodecError, ConnectionError, SessionError, StoreError};
pub use events::{
    API, BACKGROUND_JOB, EventContext, EventDispatch, EventHandler, EventRegistry, HEARTBEAT,
    RE_SCHEDULE,
};
pub use memory::{MemoryCommandStore, StaticRegistry};
pub use ports::{
    CommandId, CommandSource, CommandStatus, CommandStore, OutboundCommand, RegistryProvider,
    StatusSink, SwitchId, SwitchTarget,
};
pub use runner::{RunOutcome, StopHandle, run_session};
pub use session::{BlockFlow, PendingBody, Session};
pub use settings::{ClientSettings, DEFAULT_SUBSCRIPTIONS};
pub use state::ConnectionState;

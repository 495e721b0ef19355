//! Collaborator interfaces the client depends on.
//!
//! The registry tells the client which switch to talk to; the command store
//! feeds it outbound commands and records their progress. Both are supplied
//! by the embedding process.

use std::fmt;

use crate::error::StoreError;

/// Opaque identifier of a stored command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(String);

impl CommandId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<u64> for CommandId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CommandId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a switch in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SwitchId(String);

impl SwitchId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Connection details of the active switch.
#[derive(Clone, PartialEq, Eq)]
pub struct SwitchTarget {
    /// Registry identifier.
    pub id: SwitchId,
    /// Host name or address.
    pub host: String,
    /// Event socket port.
    pub port: u16,
    /// Event socket password.
    pub password: String,
}

impl fmt::Debug for SwitchTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SwitchTarget")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A command waiting to be sent to the switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    /// Store identifier.
    pub id: CommandId,
    /// Command name, e.g. `originate`.
    pub name: String,
    /// Arguments; may be empty.
    pub parameter: String,
}

impl OutboundCommand {
    /// Creates a command record.
    #[must_use]
    pub fn new(id: impl Into<CommandId>, name: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameter: parameter.into(),
        }
    }

    /// Text handed to `bgapi`: the name, then the parameter when present.
    #[must_use]
    pub fn command_text(&self) -> String {
        if self.parameter.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.parameter)
        }
    }
}

/// Progress of a stored command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// Waiting to be dispatched.
    New,
    /// Sent to the switch; result pending.
    Execute,
    /// Result received.
    Confirm,
}

impl CommandStatus {
    /// Name stored alongside the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Execute => "EXECUTE",
            Self::Confirm => "CONFIRM",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Source of switch connection details.
pub trait RegistryProvider {
    /// The switch to connect to, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the registry cannot be queried.
    fn active_target(&self) -> Result<Option<SwitchTarget>, StoreError>;

    /// Records that the switch was heard from.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update cannot be recorded.
    fn update_last_seen(&mut self, id: &SwitchId) -> Result<(), StoreError>;
}

/// Supplies commands awaiting dispatch.
pub trait CommandSource {
    /// Commands in status [`CommandStatus::New`], oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn list_pending(&self) -> Result<Vec<OutboundCommand>, StoreError>;
}

/// Records command progress.
pub trait StatusSink {
    /// Moves a command to [`CommandStatus::Execute`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update cannot be recorded.
    fn mark_executing(&mut self, id: &CommandId) -> Result<(), StoreError>;

    /// Moves a command to [`CommandStatus::Confirm`] with its result text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update cannot be recorded.
    fn mark_confirmed(&mut self, id: &CommandId, result: &str) -> Result<(), StoreError>;
}

/// A store that both supplies and tracks commands.
pub trait CommandStore: CommandSource + StatusSink {}

impl<T: CommandSource + StatusSink + ?Sized> CommandStore for T {}

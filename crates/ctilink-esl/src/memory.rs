//! In-memory collaborators.
//!
//! Handles are cheap to clone and share their state, so a caller can hand one
//! to the client and keep another to observe what happened.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::ports::{
    CommandId, CommandSource, CommandStatus, OutboundCommand, RegistryProvider, StatusSink,
    SwitchId, SwitchTarget,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::new("in-memory store lock poisoned"))
}

#[derive(Debug, Clone)]
struct StoredCommand {
    command: OutboundCommand,
    status: CommandStatus,
    result: Option<String>,
}

/// Command store kept in process memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCommandStore {
    commands: Arc<Mutex<Vec<StoredCommand>>>,
}

impl MemoryCommandStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command in status [`CommandStatus::New`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn push(&self, command: OutboundCommand) -> Result<(), StoreError> {
        lock(&self.commands)?.push(StoredCommand {
            command,
            status: CommandStatus::New,
            result: None,
        });
        Ok(())
    }

    /// Current status of a command.
    #[must_use]
    pub fn status(&self, id: &CommandId) -> Option<CommandStatus> {
        self.with_command(id, |stored| stored.status)
    }

    /// Result text recorded for a command.
    #[must_use]
    pub fn result(&self, id: &CommandId) -> Option<String> {
        self.with_command(id, |stored| stored.result.clone()).flatten()
    }

    fn with_command<R>(&self, id: &CommandId, read: impl FnOnce(&StoredCommand) -> R) -> Option<R> {
        let commands = lock(&self.commands).ok()?;
        commands
            .iter()
            .find(|stored| &stored.command.id == id)
            .map(read)
    }

    fn update(
        &self,
        id: &CommandId,
        status: CommandStatus,
        result: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut commands = lock(&self.commands)?;
        let stored = commands
            .iter_mut()
            .find(|stored| &stored.command.id == id)
            .ok_or_else(|| StoreError::new(format!("unknown command '{id}'")))?;
        stored.status = status;
        if let Some(text) = result {
            stored.result = Some(text.to_owned());
        }
        Ok(())
    }
}

impl CommandSource for MemoryCommandStore {
    fn list_pending(&self) -> Result<Vec<OutboundCommand>, StoreError> {
        Ok(lock(&self.commands)?
            .iter()
            .filter(|stored| stored.status == CommandStatus::New)
            .map(|stored| stored.command.clone())
            .collect())
    }
}

impl StatusSink for MemoryCommandStore {
    fn mark_executing(&mut self, id: &CommandId) -> Result<(), StoreError> {
        self.update(id, CommandStatus::Execute, None)
    }

    fn mark_confirmed(&mut self, id: &CommandId, result: &str) -> Result<(), StoreError> {
        self.update(id, CommandStatus::Confirm, Some(result))
    }
}

/// Registry with a fixed target that counts heartbeats.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    target: Option<SwitchTarget>,
    sightings: Arc<Mutex<Vec<SwitchId>>>,
}

impl StaticRegistry {
    /// Registry answering with `target`.
    #[must_use]
    pub fn new(target: Option<SwitchTarget>) -> Self {
        Self {
            target,
            sightings: Arc::default(),
        }
    }

    /// Number of `update_last_seen` calls recorded so far.
    #[must_use]
    pub fn sightings(&self) -> usize {
        lock(&self.sightings).map_or(0, |seen| seen.len())
    }
}

impl RegistryProvider for StaticRegistry {
    fn active_target(&self) -> Result<Option<SwitchTarget>, StoreError> {
        Ok(self.target.clone())
    }

    fn update_last_seen(&mut self, id: &SwitchId) -> Result<(), StoreError> {
        lock(&self.sightings)?.push(id.clone());
        Ok(())
    }
}

//! Command store kept in a JSON file.
//!
//! The file holds an array of command records. Operators (or other processes)
//! append records in status `NEW`; the daemon reads the file afresh on every
//! poll and rewrites it atomically when a status changes.
//!
//! Every access is serialised through an advisory `flock` on a sidecar file
//! next to the store (see [`JsonCommandStore::lock_path`]). Reads take it
//! shared, read-modify-write cycles take it exclusive. External writers must
//! hold the exclusive lock while they rewrite the file, otherwise their
//! records can be lost.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::debug;

use ctilink_esl::{CommandId, CommandSource, CommandStatus, OutboundCommand, StatusSink, StoreError};

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

#[derive(Debug, Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Persisted status names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    /// Waiting to be dispatched.
    New,
    /// Sent to the switch.
    Execute,
    /// Result recorded.
    Confirm,
}

impl From<RecordStatus> for CommandStatus {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::New => Self::New,
            RecordStatus::Execute => Self::Execute,
            RecordStatus::Confirm => Self::Confirm,
        }
    }
}

/// One command as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Unique identifier.
    pub id: String,
    /// Command name.
    pub name: String,
    /// Command arguments.
    #[serde(default)]
    pub parameter: String,
    /// Progress of the command.
    pub status: RecordStatus,
    /// Result text reported by the switch.
    #[serde(default)]
    pub result: Option<String>,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the command was sent.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub execute_time: Option<OffsetDateTime>,
    /// When the result arrived.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub confirm_time: Option<OffsetDateTime>,
}

impl CommandRecord {
    /// A fresh record in status `NEW`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parameter: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameter: parameter.into(),
            status: RecordStatus::New,
            result: None,
            created_at,
            execute_time: None,
            confirm_time: None,
        }
    }

    /// Progress of the command.
    #[must_use]
    pub fn command_status(&self) -> CommandStatus {
        self.status.into()
    }
}

/// Command source and status sink over a JSON file.
#[derive(Debug, Clone)]
pub struct JsonCommandStore {
    path: Utf8PathBuf,
}

impl JsonCommandStore {
    /// Opens the store at `path`, creating an empty one when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory or file cannot be created.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };
        if let Some(parent) = store.parent() {
            fs::create_dir_all(parent).map_err(|error| store.io_error("create directory for", error))?;
        }
        let _lock = store.lock(LockMode::Exclusive)?;
        if !store.path.exists() {
            store.save(&[])?;
            debug!(target: STORE_TARGET, path = %store.path, "created empty command store");
        }
        Ok(store)
    }

    /// Location of the store file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Sidecar file carrying the advisory lock for the store.
    #[must_use]
    pub fn lock_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.lock", self.path))
    }

    /// Reads every record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be locked, read or parsed.
    pub fn records(&self) -> Result<Vec<CommandRecord>, StoreError> {
        let _lock = self.lock(LockMode::Shared)?;
        self.read_records()
    }

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the id is taken or the file cannot be
    /// rewritten.
    pub fn insert(&self, record: CommandRecord) -> Result<(), StoreError> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let mut records = self.read_records()?;
        if records.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::new(format!("duplicate command '{}'", record.id)));
        }
        records.push(record);
        self.save(&records)
    }

    fn update(
        &self,
        id: &CommandId,
        apply: impl FnOnce(&mut CommandRecord, OffsetDateTime),
    ) -> Result<(), StoreError> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let mut records = self.read_records()?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id.as_str())
            .ok_or_else(|| StoreError::new(format!("unknown command '{id}'")))?;
        apply(record, OffsetDateTime::now_utc());
        self.save(&records)
    }

    // The lock is released when the returned file is dropped.
    fn lock(&self, mode: LockMode) -> Result<File, StoreError> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|error| self.io_error("open lock for", error))?;
        match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        }
        .map_err(|error| self.io_error("lock", error))?;
        Ok(file)
    }

    fn read_records(&self) -> Result<Vec<CommandRecord>, StoreError> {
        let text = fs::read_to_string(&self.path).map_err(|error| self.io_error("read", error))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|error| {
            StoreError::with_source(format!("malformed command store '{}'", self.path), error)
        })
    }

    fn save(&self, records: &[CommandRecord]) -> Result<(), StoreError> {
        let directory = self.parent().unwrap_or_else(|| Utf8Path::new("."));
        let mut file =
            NamedTempFile::new_in(directory).map_err(|error| self.io_error("stage", error))?;
        serde_json::to_writer_pretty(&mut file, records).map_err(|error| {
            StoreError::with_source(format!("failed to encode command store '{}'", self.path), error)
        })?;
        file.write_all(b"\n")
            .and_then(|()| file.as_file().sync_all())
            .map_err(|error| self.io_error("write", error))?;
        file.persist(&self.path)
            .map_err(|error| self.io_error("replace", error.error))?;
        Ok(())
    }

    fn parent(&self) -> Option<&Utf8Path> {
        self.path.parent().filter(|parent| !parent.as_str().is_empty())
    }

    fn io_error(&self, action: &str, error: io::Error) -> StoreError {
        StoreError::with_source(format!("failed to {action} command store '{}'", self.path), error)
    }
}

impl CommandSource for JsonCommandStore {
    fn list_pending(&self) -> Result<Vec<OutboundCommand>, StoreError> {
        let mut pending: Vec<CommandRecord> = self
            .records()?
            .into_iter()
            .filter(|record| record.status == RecordStatus::New)
            .collect();
        pending.sort_by_key(|record| record.created_at);
        Ok(pending
            .into_iter()
            .map(|record| OutboundCommand::new(record.id, record.name, record.parameter))
            .collect())
    }
}

impl StatusSink for JsonCommandStore {
    fn mark_executing(&mut self, id: &CommandId) -> Result<(), StoreError> {
        self.update(id, |record, now| {
            record.status = RecordStatus::Execute;
            record.execute_time = Some(now);
        })
    }

    fn mark_confirmed(&mut self, id: &CommandId, result: &str) -> Result<(), StoreError> {
        self.update(id, |record, now| {
            record.status = RecordStatus::Confirm;
            record.result = Some(result.to_owned());
            record.confirm_time = Some(now);
        })
    }
}

//! Background command dispatch and reply correlation.
//!
//! Commands go out as `bgapi` requests. The switch acknowledges each with a
//! `command/reply` carrying a `Job-UUID`, in the order the requests were
//! written, so acknowledgments are matched positionally against a FIFO. The
//! eventual result arrives later as a `BACKGROUND_JOB` event keyed by the same
//! job id.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info, warn};

use crate::codec::HeaderBlock;
use crate::connection::CommandWriter;
use crate::error::{ConnectionError, SessionError, StoreError};
use crate::ports::{CommandId, CommandStore, StatusSink};

const CORRELATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::correlator");

/// A command written to the switch and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Text sent after `bgapi`.
    pub command_text: String,
    /// Store identifier of the command.
    pub external_id: CommandId,
}

/// An acknowledged command awaiting its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Identifier assigned by the switch.
    pub job_uuid: String,
    /// The command the job runs.
    pub command: PendingCommand,
}

/// How a `command/reply` block was correlated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The oldest pending command became a job.
    Registered {
        /// Identifier assigned by the switch.
        job_uuid: String,
        /// Store identifier of the command.
        external_id: CommandId,
    },
    /// A job id arrived while nothing was pending.
    Unsolicited {
        /// Identifier carried by the reply.
        job_uuid: String,
    },
    /// The reply carried no job id.
    NoJob,
}

/// How a job completion was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The command was confirmed in the store.
    Confirmed(CommandId),
    /// No job was registered under the id.
    UnknownJob,
}

/// FIFO of unacknowledged commands plus the table of running jobs.
#[derive(Debug, Default)]
pub struct Correlator {
    queue: VecDeque<PendingCommand>,
    jobs: HashMap<String, Job>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `command_text` and writes it as a `bgapi` request.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the write fails.
    pub fn submit<W>(
        &mut self,
        writer: &mut W,
        command_text: &str,
        external_id: CommandId,
    ) -> Result<(), ConnectionError>
    where
        W: CommandWriter + ?Sized,
    {
        debug!(
            target: CORRELATOR_TARGET,
            id = %external_id,
            command = command_text,
            "submitting background command"
        );
        self.queue.push_back(PendingCommand {
            command_text: command_text.to_owned(),
            external_id,
        });
        writer.send_command(&format!("bgapi {command_text}"))
    }

    /// Matches a `command/reply` against the oldest pending command.
    pub fn on_command_reply(&mut self, block: &HeaderBlock) -> ReplyOutcome {
        let Some(job_uuid) = block.job_uuid() else {
            debug!(
                target: CORRELATOR_TARGET,
                reply = block.reply_text().unwrap_or_default(),
                "command reply without job id"
            );
            return ReplyOutcome::NoJob;
        };

        let Some(command) = self.queue.pop_front() else {
            warn!(
                target: CORRELATOR_TARGET,
                job_uuid,
                "acknowledgment received with no command pending"
            );
            return ReplyOutcome::Unsolicited {
                job_uuid: job_uuid.to_owned(),
            };
        };

        let external_id = command.external_id.clone();
        debug!(
            target: CORRELATOR_TARGET,
            job_uuid,
            id = %external_id,
            "background job registered"
        );
        self.jobs.insert(
            job_uuid.to_owned(),
            Job {
                job_uuid: job_uuid.to_owned(),
                command,
            },
        );
        ReplyOutcome::Registered {
            job_uuid: job_uuid.to_owned(),
            external_id,
        }
    }

    /// Resolves a finished job and records its result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the sink rejects the confirmation.
    pub fn on_background_job_complete<S>(
        &mut self,
        job_uuid: &str,
        result: &str,
        sink: &mut S,
    ) -> Result<CompletionOutcome, StoreError>
    where
        S: StatusSink + ?Sized,
    {
        let Some(job) = self.jobs.remove(job_uuid) else {
            warn!(
                target: CORRELATOR_TARGET,
                job_uuid,
                "completion for unknown background job"
            );
            return Ok(CompletionOutcome::UnknownJob);
        };

        let id = job.command.external_id;
        sink.mark_confirmed(&id, result)?;
        info!(
            target: CORRELATOR_TARGET,
            job_uuid,
            id = %id,
            "background command confirmed"
        );
        Ok(CompletionOutcome::Confirmed(id))
    }

    /// Sends every pending command from `store`, oldest first.
    ///
    /// Each command is marked executing right after it is written. Returns the
    /// number of commands sent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the store or the connection fails.
    pub fn dispatch_pending<W, S>(
        &mut self,
        writer: &mut W,
        store: &mut S,
    ) -> Result<usize, SessionError>
    where
        W: CommandWriter + ?Sized,
        S: CommandStore + ?Sized,
    {
        let pending = store.list_pending()?;
        for command in &pending {
            self.submit(writer, &command.command_text(), command.id.clone())?;
            store.mark_executing(&command.id)?;
        }
        if !pending.is_empty() {
            debug!(
                target: CORRELATOR_TARGET,
                count = pending.len(),
                "dispatched pending commands"
            );
        }
        Ok(pending.len())
    }

    /// Forgets every pending command and job.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.jobs.clear();
    }

    /// Commands awaiting acknowledgment, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &PendingCommand> {
        self.queue.iter()
    }

    /// Number of commands awaiting acknowledgment.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Looks up a running job.
    #[must_use]
    pub fn job(&self, job_uuid: &str) -> Option<&Job> {
        self.jobs.get(job_uuid)
    }

    /// Number of running jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` when nothing is pending or running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.jobs.is_empty()
    }
}

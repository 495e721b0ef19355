//! Threaded handle around the run loop.

use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::SessionError;
use crate::events::EventRegistry;
use crate::ports::{CommandStore, RegistryProvider};
use crate::runner::{RunOutcome, StopHandle, run_session};
use crate::settings::ClientSettings;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Registry and store handed to the worker thread.
pub struct Collaborators {
    /// Source of the switch to connect to.
    pub registry: Box<dyn RegistryProvider + Send>,
    /// Source and sink of commands.
    pub store: Box<dyn CommandStore + Send>,
}

impl Collaborators {
    /// Boxes a registry and a store.
    #[must_use]
    pub fn new<R, S>(registry: R, store: S) -> Self
    where
        R: RegistryProvider + Send + 'static,
        S: CommandStore + Send + 'static,
    {
        Self {
            registry: Box::new(registry),
            store: Box::new(store),
        }
    }
}

type Worker = JoinHandle<Result<RunOutcome, SessionError>>;

/// Runs one switch connection on a dedicated thread.
pub struct EslClient {
    settings: ClientSettings,
    events: EventRegistry,
    collaborators: Option<Collaborators>,
    stop: StopHandle,
    worker: Option<Worker>,
}

impl EslClient {
    /// Creates a client with the default event handlers.
    #[must_use]
    pub fn new(settings: ClientSettings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            events: EventRegistry::with_defaults(),
            collaborators: Some(collaborators),
            stop: StopHandle::new(),
            worker: None,
        }
    }

    /// Replaces the event handlers used once the client starts.
    #[must_use]
    pub fn with_events(mut self, events: EventRegistry) -> Self {
        self.events = events;
        self
    }

    /// Spawns the run loop. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Spawn`] if the thread cannot be created.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let Some(collaborators) = self.collaborators.take() else {
            debug!(target: CLIENT_TARGET, "client already started");
            return Ok(());
        };

        let settings = self.settings.clone();
        let events = self.events.clone();
        let stop = self.stop.clone();
        let worker = thread::Builder::new()
            .name(String::from("ctilink-esl"))
            .spawn(move || {
                let Collaborators {
                    mut registry,
                    mut store,
                } = collaborators;
                run_session(registry.as_mut(), store.as_mut(), events, &settings, &stop)
            })
            .map_err(|source| SessionError::Spawn { source })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Requests the run loop to stop.
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    /// A handle that can request a stop from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns `true` while the worker thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Waits for the run loop and returns how it ended.
    ///
    /// # Errors
    ///
    /// Returns the loop's [`SessionError`], [`SessionError::NotStarted`] when
    /// the client was never started, or [`SessionError::ThreadPanic`] when the
    /// worker panicked.
    pub fn join(&mut self) -> Result<RunOutcome, SessionError> {
        let worker = self.worker.take().ok_or(SessionError::NotStarted)?;
        worker.join().map_err(|_| SessionError::ThreadPanic)?
    }
}

impl Drop for EslClient {
    fn drop(&mut self) {
        self.stop.request_stop();
    }
}

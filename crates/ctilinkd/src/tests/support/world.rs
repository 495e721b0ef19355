//! BDD test world holding the loader, reporter and daemon results for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ctilink_esl::RunOutcome;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::process::LaunchError;
use crate::process::launch::run_daemon_with;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::greeting_switch::GreetingSwitch;
use super::reporter::RecordingHealthReporter;
use super::shutdown::ScriptedShutdown;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    store_path: Option<Utf8PathBuf>,
    pub reporter: Arc<RecordingHealthReporter>,
    pub shutdown: ScriptedShutdown,
    switch: Option<GreetingSwitch>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    run_result: Option<Result<RunOutcome, LaunchError>>,
    switch_traffic: Option<String>,
}

impl TestWorld {
    /// Builds a world with a successful loader and no switch password.
    #[must_use]
    pub fn new() -> Self {
        let loader = TestConfigLoader::new();
        Self {
            store_path: Some(loader.store_path()),
            loader: Box::new(loader),
            reporter: Arc::new(RecordingHealthReporter::default()),
            shutdown: ScriptedShutdown::Unavailable,
            switch: None,
            daemon: None,
            bootstrap_error: None,
            run_result: None,
            switch_traffic: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.store_path = None;
    }

    /// Installs a loader without a switch password.
    pub fn use_successful_loader(&mut self) {
        let loader = TestConfigLoader::new();
        self.store_path = Some(loader.store_path());
        self.loader = Box::new(loader);
    }

    /// Starts a greeting switch and points a fresh loader at it.
    pub fn use_greeting_switch(&mut self, password: &str) {
        let switch = GreetingSwitch::start();
        let loader = TestConfigLoader::new().with_switch(switch.port(), password);
        self.store_path = Some(loader.store_path());
        self.loader = Box::new(loader);
        self.switch = Some(switch);
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Runs the whole daemon until the client finishes.
    pub fn run(&mut self) {
        let result = run_daemon_with(&*self.loader, self.reporter.clone(), self.shutdown);
        self.run_result = Some(result);
        if let Some(switch) = self.switch.take() {
            self.switch_traffic = Some(switch.finish());
        }
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    #[must_use]
    pub const fn daemon(&self) -> Option<&Daemon> {
        self.daemon.as_ref()
    }

    #[must_use]
    pub fn store_path(&self) -> Option<&Utf8PathBuf> {
        self.store_path.as_ref()
    }

    #[must_use]
    pub fn run_result(&self) -> Option<&Result<RunOutcome, LaunchError>> {
        self.run_result.as_ref()
    }

    /// Everything the greeting switch received from the client.
    #[must_use]
    pub fn switch_traffic(&self) -> Option<&str> {
        self.switch_traffic.as_deref()
    }
}

/// Fresh world for a scenario.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

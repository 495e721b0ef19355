//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use ctilink_config::Config;
use ctilink_esl::{ClientSettings, Collaborators, EslClient, StoreError};

use crate::health::HealthReporter;
use crate::registry::ConfiguredRegistry;
use crate::store::JsonCommandStore;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The command store could not be opened.
    #[error("failed to open command store: {source}")]
    CommandStore {
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    registry: ConfiguredRegistry,
    store: JsonCommandStore,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Subscriber that is active for this process.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Registry shared with every client built by this daemon.
    #[must_use]
    pub const fn registry(&self) -> &ConfiguredRegistry {
        &self.registry
    }

    /// Command store shared with every client built by this daemon.
    #[must_use]
    pub const fn store(&self) -> &JsonCommandStore {
        &self.store
    }

    /// Builds an unstarted client wired to the daemon's registry and store.
    #[must_use]
    pub fn client(&self) -> EslClient {
        EslClient::new(
            ClientSettings::from_config(&self.config),
            Collaborators::new(self.registry.clone(), self.store.clone()),
        )
    }

    /// Reporter the daemon was bootstrapped with.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }
}

/// Bootstraps the daemon using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if !telemetry.matches(&config) {
        tracing::warn!(
            target: BOOTSTRAP_TARGET,
            installed_filter = telemetry.filter(),
            installed_format = %telemetry.format(),
            "logging already configured; keeping the first settings"
        );
    }

    let store = match JsonCommandStore::open(config.command_store()) {
        Ok(store) => store,
        Err(source) => {
            let error = BootstrapError::CommandStore { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let registry = ConfiguredRegistry::from_config(&config);
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        registry,
        store,
        telemetry,
        reporter,
    })
}

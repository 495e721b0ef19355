//! Daemon wiring for the ctilink event socket client.
//!
//! The daemon loads [`ctilink_config::Config`], installs structured telemetry,
//! opens the JSON command store and then runs one [`ctilink_esl::EslClient`]
//! against the configured switch until the session ends or a termination
//! signal arrives. Lifecycle milestones are surfaced through a
//! [`HealthReporter`] so operators see bootstrap and client failures as
//! structured events.
//!
//! The configured switch is only considered active when a password is set.
//! Without one the daemon reports that there is nothing to do and exits
//! successfully.

mod bootstrap;
mod health;
mod process;
mod registry;
mod store;
mod telemetry;

pub use bootstrap::{BootstrapError, ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, exit_code, run_daemon};
pub use registry::ConfiguredRegistry;
pub use store::{CommandRecord, JsonCommandStore, RecordStatus};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;

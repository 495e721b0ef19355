//! Shared configuration for the ctilink event socket client.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then a TOML
//! file (`--config-path` or `CTILINK_CONFIG_PATH`), then `CTILINK_*`
//! environment variables, then command-line flags. The daemon and tests both
//! go through [`Config::load`] or [`Config::load_from_iter`] so precedence is
//! identical everywhere.

mod defaults;
mod endpoint;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_SWITCH_HOST, DEFAULT_SWITCH_ID, DEFAULT_SWITCH_PORT, default_command_store,
    default_connect_timeout_secs, default_log_filter, default_log_filter_string,
    default_log_format, default_poll_interval_secs, default_switch_endpoint, default_switch_id,
};
pub use endpoint::{EndpointParseError, SwitchEndpoint};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved configuration for the client and daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "CTILINK")]
pub struct Config {
    /// Event socket address of the monitored switch.
    #[serde(default = "defaults::default_switch_endpoint")]
    #[ortho_config(default = defaults::default_switch_endpoint())]
    pub switch_endpoint: SwitchEndpoint,
    /// Event socket password. Without one no switch is considered active.
    #[serde(default)]
    pub switch_password: Option<String>,
    /// Identifier under which heartbeats are recorded.
    #[serde(default = "defaults::default_switch_id")]
    #[ortho_config(default = defaults::default_switch_id())]
    pub switch_id: String,
    /// Path of the JSON file holding outbound commands.
    #[serde(default = "defaults::default_command_store")]
    #[ortho_config(default = defaults::default_command_store())]
    pub command_store: Utf8PathBuf,
    /// Seconds to wait for inbound data before polling for commands.
    #[serde(default = "defaults::default_poll_interval_secs")]
    #[ortho_config(default = defaults::DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,
    /// Seconds allowed for establishing the TCP connection.
    #[serde(default = "defaults::default_connect_timeout_secs")]
    #[ortho_config(default = defaults::DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            switch_endpoint: default_switch_endpoint(),
            switch_password: None,
            switch_id: default_switch_id(),
            command_store: default_command_store(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Event socket address of the switch.
    #[must_use]
    pub const fn switch_endpoint(&self) -> &SwitchEndpoint {
        &self.switch_endpoint
    }

    /// Event socket password, if configured.
    #[must_use]
    pub fn switch_password(&self) -> Option<&str> {
        self.switch_password
            .as_deref()
            .filter(|password| !password.is_empty())
    }

    /// Identifier of the configured switch.
    #[must_use]
    pub fn switch_id(&self) -> &str {
        &self.switch_id
    }

    /// Path of the JSON command store.
    #[must_use]
    pub fn command_store(&self) -> &Utf8Path {
        &self.command_store
    }

    /// Idle window of the run loop. Never shorter than one second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Connect timeout. Never shorter than one second.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

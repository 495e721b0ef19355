use std::env;

use camino::Utf8PathBuf;

use crate::LogFormat;
use crate::endpoint::SwitchEndpoint;

/// Port the switch's event socket listens on unless told otherwise.
pub const DEFAULT_SWITCH_PORT: u16 = 8021;

/// Host used when no switch endpoint is configured.
pub const DEFAULT_SWITCH_HOST: &str = "127.0.0.1";

/// Identifier reported to the registry for the configured switch.
pub const DEFAULT_SWITCH_ID: &str = "default";

/// Seconds the run loop waits for inbound data before polling for commands.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Seconds allowed for the TCP connect to the switch.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint of a switch running on the local host.
#[must_use]
pub fn default_switch_endpoint() -> SwitchEndpoint {
    SwitchEndpoint::tcp(DEFAULT_SWITCH_HOST, DEFAULT_SWITCH_PORT)
}

/// Owned switch identifier.
#[must_use]
pub fn default_switch_id() -> String {
    DEFAULT_SWITCH_ID.to_owned()
}

/// Location of the JSON command store.
///
/// Lives under the user's local data directory, or the temporary directory
/// when none is available.
#[must_use]
pub fn default_command_store() -> Utf8PathBuf {
    let mut base = data_base_directory().unwrap_or_else(fallback_base_directory);
    base.push("ctilink");
    base.push("commands.json");
    base
}

fn data_base_directory() -> Option<Utf8PathBuf> {
    dirs::data_local_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

/// Poll interval in seconds.
#[must_use]
pub const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Connect timeout in seconds.
#[must_use]
pub const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

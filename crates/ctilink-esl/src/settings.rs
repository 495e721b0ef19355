//! Tunables for a client run.

use std::time::Duration;

use ctilink_config::{Config, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS};

use crate::events::RE_SCHEDULE;

/// Subscriptions requested once authentication succeeds.
pub const DEFAULT_SUBSCRIPTIONS: [&str; 2] = [
    "event plain ALL",
    "event CUSTOM sofia::register sofia::unregister sofia::expire sofia::register_attempt \
     sofia::register_failure sofia::gateway_add sofia::gateway_delete sofia::gateway_state",
];

/// Timing and subscription settings for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Longest wait for a line before the loop polls the command store.
    pub poll_interval: Duration,
    /// Longest wait for the TCP connect.
    pub connect_timeout: Duration,
    /// Commands sent after authentication, in order.
    pub subscriptions: Vec<String>,
    /// Event names dropped without dispatch.
    pub ignored_events: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            subscriptions: DEFAULT_SUBSCRIPTIONS.iter().map(|&s| s.to_owned()).collect(),
            ignored_events: vec![RE_SCHEDULE.to_owned()],
        }
    }
}

impl ClientSettings {
    /// Settings with the timings taken from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            connect_timeout: config.connect_timeout(),
            ..Self::default()
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns `true` when events named `event_name` are dropped.
    #[must_use]
    pub fn ignores(&self, event_name: &str) -> bool {
        self.ignored_events
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(event_name))
    }
}

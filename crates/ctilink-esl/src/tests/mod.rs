//! Shared test support and behavioural scenarios for the event socket client.

mod fake_switch;
pub(crate) mod support;

//! Test harness utilities for the daemon behavioural suite.

mod config_loader;
mod greeting_switch;
mod reporter;
mod shutdown;
mod world;

pub use reporter::HealthEvent;
pub use shutdown::ScriptedShutdown;
pub use world::{TestWorld, world};

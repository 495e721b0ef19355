//! Shutdown signal doubles.

use std::io;
use std::thread;
use std::time::Duration;

use crate::process::shutdown::{ShutdownError, ShutdownSignal};

/// Shutdown listener whose behaviour is fixed up front.
#[derive(Debug, Clone, Copy)]
pub enum ScriptedShutdown {
    /// Fires once the delay has elapsed.
    After(Duration),
    /// Fails as if the signal handlers could not be installed.
    Unavailable,
}

impl ShutdownSignal for ScriptedShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        match self {
            Self::After(delay) => {
                thread::sleep(*delay);
                Ok(())
            }
            Self::Unavailable => Err(ShutdownError::Install {
                source: io::Error::other("signal handlers unavailable in tests"),
            }),
        }
    }
}

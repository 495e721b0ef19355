use thiserror::Error;

use ctilink_esl::SessionError;

use crate::bootstrap::BootstrapError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed before the client could start.
    #[error(transparent)]
    Bootstrap {
        /// Underlying bootstrap error.
        #[from]
        source: BootstrapError,
    },
    /// The switch client failed to start or ended with an error.
    #[error("switch client failed: {source}")]
    Client {
        /// Underlying session error.
        #[from]
        source: SessionError,
    },
}

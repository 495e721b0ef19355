//! Protocol state of a switch session.

use std::fmt;

/// Where a session stands in the authenticate/subscribe handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Connected, waiting for the switch's auth request.
    #[default]
    Null,
    /// Password sent, waiting for acceptance.
    Authing,
    /// Authenticated, subscription commands sent.
    Authed,
    /// Event listener enabled; steady state.
    Subscribed,
    /// Torn down. Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns `true` in the steady state where commands are dispatched.
    #[must_use]
    pub const fn is_subscribed(self) -> bool {
        matches!(self, Self::Subscribed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Null => "NULL",
            Self::Authing => "AUTHING",
            Self::Authed => "AUTHED",
            Self::Subscribed => "SUBSCRIBED",
            Self::Closed => "CLOSED",
        };
        formatter.write_str(label)
    }
}

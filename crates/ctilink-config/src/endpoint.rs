use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_SWITCH_PORT;

/// TCP address of the switch's event socket.
///
/// Parsed from `tcp://host[:port]`; the port falls back to
/// [`DEFAULT_SWITCH_PORT`] when omitted. Configuration files may also spell it
/// as a table with `host` and `port` keys.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "EndpointRepr", into = "String")]
pub struct SwitchEndpoint {
    host: String,
    port: u16,
}

impl SwitchEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address of the switch.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Event socket port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for SwitchEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "tcp://{}:{}", self.host, self.port)
    }
}

impl FromStr for SwitchEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input.trim())?;
        if url.scheme() != "tcp" {
            return Err(EndpointParseError::UnsupportedScheme(
                url.scheme().to_owned(),
            ));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let port = url.port().unwrap_or(DEFAULT_SWITCH_PORT);
        Ok(Self::tcp(host, port))
    }
}

impl From<SwitchEndpoint> for String {
    fn from(endpoint: SwitchEndpoint) -> Self {
        endpoint.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Text(String),
    Table {
        host: String,
        #[serde(default = "default_port")]
        port: u16,
    },
}

const fn default_port() -> u16 {
    DEFAULT_SWITCH_PORT
}

impl TryFrom<EndpointRepr> for SwitchEndpoint {
    type Error = EndpointParseError;

    fn try_from(repr: EndpointRepr) -> Result<Self, Self::Error> {
        match repr {
            EndpointRepr::Text(text) => text.parse(),
            EndpointRepr::Table { host, port } if !host.trim().is_empty() => {
                Ok(Self::tcp(host, port))
            }
            EndpointRepr::Table { host, .. } => Err(EndpointParseError::MissingHost(host)),
        }
    }
}

/// Errors encountered while parsing a [`SwitchEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not `tcp`.
    #[error("unsupported switch endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing switch host in '{0}'")]
    MissingHost(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

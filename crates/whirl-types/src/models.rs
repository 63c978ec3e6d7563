use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A tab in the client: the always-present console, or a joined channel.
///
/// The console is its own variant so a channel that happens to be called
/// `console` or `server` can never be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TabId {
    Console,
    Channel(String),
}

impl TabId {
    pub fn channel(name: impl Into<String>) -> Self {
        Self::Channel(name.into())
    }

    /// Channel name, or `None` for the console.
    pub fn channel_name(&self) -> Option<&str> {
        match self {
            Self::Console => None,
            Self::Channel(name) => Some(name),
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => f.write_str("server"),
            Self::Channel(name) => write!(f, "#{name}"),
        }
    }
}

/// How the client authenticates when it opens the socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// The server authenticates the upgrade request from its session cookie.
    #[default]
    Cookie,
    /// Username and password are sent as a LOGIN frame once the socket opens.
    Plain,
    /// Older servers: the nickname is part of the endpoint path, no password.
    Legacy,
}

impl AuthMode {
    /// Endpoint path for this mode. `nick` is only used by [`AuthMode::Legacy`].
    pub fn endpoint_path(self, nick: Option<&str>) -> String {
        match self {
            Self::Cookie => "/ws/".to_string(),
            Self::Plain => "/ws/?auth=plain".to_string(),
            Self::Legacy => format!("/ws/login/{}", nick.unwrap_or_default()),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cookie => "cookie",
            Self::Plain => "plain",
            Self::Legacy => "legacy",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown auth mode {0:?} (expected cookie, plain or legacy)")]
pub struct UnknownAuthMode(pub String);

impl FromStr for AuthMode {
    type Err = UnknownAuthMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "plain" => Ok(Self::Plain),
            "legacy" => Ok(Self::Legacy),
            _ => Err(UnknownAuthMode(s.to_string())),
        }
    }
}

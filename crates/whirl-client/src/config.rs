use thiserror::Error;

use whirl_types::models::{AuthMode, UnknownAuthMode};

use crate::session::Endpoint;

pub const DEFAULT_SERVER: &str = "ws://127.0.0.1:8667";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WHIRL_AUTH: {0}")]
    Auth(#[from] UnknownAuthMode),

    #[error("WHIRL_SERVER must be a ws:// URL, got {0:?}")]
    Server(String),
}

/// Client settings, read from `WHIRL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server: String,
    pub auth: AuthMode,
    /// Session cookie sent with the upgrade request in cookie mode.
    pub cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            auth: AuthMode::Cookie,
            cookie: None,
        }
    }
}

impl ClientConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = lookup("WHIRL_SERVER").unwrap_or_else(|| DEFAULT_SERVER.into());
        if !server.starts_with("ws://") {
            return Err(ConfigError::Server(server));
        }

        let auth = match lookup("WHIRL_AUTH") {
            Some(raw) => raw.parse::<AuthMode>()?,
            None => AuthMode::default(),
        };

        let cookie = lookup("WHIRL_COOKIE").filter(|c| !c.trim().is_empty());

        Ok(Self { server, auth, cookie })
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.server.clone(), self.auth)
    }
}

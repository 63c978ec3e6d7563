use thiserror::Error;

use whirl_types::protocol::{DecodeError, MessageType};

/// A well-formed frame the client has no handling for in that direction.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unexpected {0:?} frame from server")]
pub struct ProtocolError(pub MessageType);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("You're already logged in.")]
    AlreadyConnected,

    #[error("Can't send a message without a connection. Please log in first.")]
    NotConnected,

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Errors caused by what the user typed, as opposed to what the server sent.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::Protocol(_))
    }
}

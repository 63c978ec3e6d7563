//! Client side of the whirl chat protocol.
//!
//! The [`session::Session`] owns the connection state machine, the logged-in
//! identity and the tab registry. Inbound frames go through the
//! [`reducer`], which returns [`effects::Effect`]s for a [`effects::View`]
//! to render. [`connection`] drives a session over a real WebSocket.

pub mod command;
pub mod config;
pub mod connection;
pub mod effects;
pub mod error;
pub mod reducer;
pub mod registry;
pub mod session;

pub use config::ClientConfig;
pub use effects::{Effect, Line, View};
pub use error::{ClientError, ProtocolError};
pub use session::{ConnectionState, Session};

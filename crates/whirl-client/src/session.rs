use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use whirl_types::models::{AuthMode, TabId};
use whirl_types::protocol::{
    self, ChatLine, Credentials, Logout, Membership, Message, UserList,
};

use crate::command::{self, Command, LoginArgs};
use crate::effects::{Effect, Line};
use crate::error::ClientError;
use crate::reducer::{self, ClientState};

/// Lifecycle of the single server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
}

/// The socket underneath a [`Session`].
///
/// `connect` only starts opening; the outcome comes back later as a
/// [`SocketEvent`] tagged with the same id.
pub trait Transport {
    fn connect(&mut self, id: Uuid, url: &str) -> Result<(), ClientError>;
    fn send(&mut self, text: String) -> Result<(), ClientError>;
    fn close(&mut self);
}

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened(Uuid),
    Text(Uuid, String),
    Closed(Uuid),
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Scheme and authority, e.g. `ws://127.0.0.1:8667`.
    pub base: String,
    pub auth: AuthMode,
}

impl Endpoint {
    pub fn new(base: impl Into<String>, auth: AuthMode) -> Self {
        Self { base: base.into(), auth }
    }

    pub fn url(&self, login: &LoginArgs) -> String {
        let nick = match login {
            LoginArgs::Legacy { nick } => Some(nick.as_str()),
            _ => None,
        };
        format!(
            "{}{}",
            self.base.trim_end_matches('/'),
            self.auth.endpoint_path(nick)
        )
    }
}

/// Client session: connection state machine, identity and tabs.
///
/// All inbound events are handled one at a time through `&mut self`, so a
/// session never sees two reducer calls overlap.
pub struct Session<T> {
    transport: T,
    endpoint: Endpoint,
    state: ConnectionState,
    /// Id of the connection the current state refers to.
    current: Option<Uuid>,
    /// Credentials to send once a plain-auth socket opens.
    pending_login: Option<Credentials>,
    client: ClientState,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
            state: ConnectionState::Closed,
            current: None,
            pending_login: None,
            client: ClientState::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> Option<&str> {
        self.client.identity.as_deref()
    }

    pub fn client(&self) -> &ClientState {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -- Connection lifecycle --

    /// Start a connection. Fails without side effects unless fully closed.
    pub fn login(&mut self, args: LoginArgs) -> Result<(), ClientError> {
        if self.state != ConnectionState::Closed {
            return Err(ClientError::AlreadyConnected);
        }

        let url = self.endpoint.url(&args);
        let id = Uuid::new_v4();
        self.transport.connect(id, &url)?;

        info!("connecting to {} ({} auth)", url, self.endpoint.auth);
        self.pending_login = match args {
            LoginArgs::Plain { user, password } => Some(Credentials {
                user,
                password: Some(password),
                auth: None,
            }),
            _ => None,
        };
        self.current = Some(id);
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Send LOGOUT and drop the connection straight away.
    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.send(&Message::Logout(Logout::default()))?;
        info!("logging out");
        self.transport.close();
        self.reset();
        Ok(())
    }

    /// Ask the transport to close; the session is closed once the socket
    /// reports it.
    pub fn close(&mut self) {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            self.transport.close();
            self.state = ConnectionState::Closing;
        }
    }

    pub fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        if self.state != ConnectionState::Open {
            return Err(ClientError::NotConnected);
        }
        let text = protocol::encode(message)?;
        self.transport.send(text)
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Closed;
        self.current = None;
        self.pending_login = None;
        self.client.identity = None;
    }

    fn is_current(&self, id: Uuid) -> bool {
        self.current == Some(id)
    }

    // -- Socket events --

    pub fn on_open(&mut self, id: Uuid) -> Result<(), ClientError> {
        if !self.is_current(id) {
            debug!("ignoring open of stale connection {}", id);
            return Ok(());
        }
        if self.state != ConnectionState::Connecting {
            debug!("ignoring open of connection {} while {:?}", id, self.state);
            return Ok(());
        }
        info!("connection {} open", id);
        self.state = ConnectionState::Open;
        if let Some(creds) = self.pending_login.take() {
            self.send(&Message::Login(creds))?;
        }
        Ok(())
    }

    pub fn on_close(&mut self, id: Uuid, now: DateTime<Utc>) -> Vec<Effect> {
        if !self.is_current(id) {
            debug!("ignoring close of stale connection {}", id);
            return Vec::new();
        }
        info!("connection {} closed", id);
        self.reset();
        vec![Effect::append(TabId::Console, Line::Disconnected, now)]
    }

    pub fn on_text(
        &mut self,
        id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, ClientError> {
        if !self.is_current(id) {
            debug!("ignoring frame from stale connection {}", id);
            return Ok(Vec::new());
        }
        if self.state != ConnectionState::Open {
            debug!("ignoring frame from connection {} while {:?}", id, self.state);
            return Ok(Vec::new());
        }
        let frame = protocol::decode(text)?;
        Ok(reducer::reduce(&mut self.client, frame, now)?)
    }

    /// Entry point for the event loop. Never fails: bad frames are logged and
    /// dropped, anything else becomes an error line.
    pub fn handle_event(&mut self, event: SocketEvent, now: DateTime<Utc>) -> Vec<Effect> {
        let result = match event {
            SocketEvent::Opened(id) => self.on_open(id).map(|()| Vec::new()),
            SocketEvent::Text(id, text) => self.on_text(id, &text, now),
            SocketEvent::Closed(id) => Ok(self.on_close(id, now)),
        };
        self.surface(result, now)
    }

    // -- User input --

    /// Run one line of user input. Returns the effects to render.
    pub fn submit(&mut self, input: &str, now: DateTime<Utc>) -> Result<Vec<Effect>, ClientError> {
        let Some(command) = command::parse(input, self.endpoint.auth) else {
            return Ok(Vec::new());
        };

        let outbound = match command {
            Command::Login(args) => {
                self.login(args)?;
                return Ok(Vec::new());
            }
            Command::Logout => {
                self.logout()?;
                return Ok(vec![Effect::append(TabId::Console, Line::Disconnected, now)]);
            }
            Command::Join { channel } => Message::Join(Membership { channel, user: None }),
            Command::Leave { channel } => {
                let Some(channel) = channel.or_else(|| self.active_channel()) else {
                    return Ok(Vec::new());
                };
                Message::Leave(Membership { channel, user: None })
            }
            Command::List => Message::List(UserList {
                users: Vec::new(),
                channel: self.active_channel(),
            }),
            Command::Action { text } => match self.active_channel() {
                Some(dest) => Message::Action(outgoing(dest, text)),
                None => return Ok(Vec::new()),
            },
            Command::Say { text } => match self.active_channel() {
                Some(dest) => Message::Message(outgoing(dest, text)),
                None => return Ok(Vec::new()),
            },
        };

        self.send(&outbound)?;
        Ok(Vec::new())
    }

    /// Entry point for the event loop. Errors become an error line in the
    /// focused tab.
    pub fn handle_input(&mut self, input: &str, now: DateTime<Utc>) -> Vec<Effect> {
        let result = self.submit(input, now);
        self.surface(result, now)
    }

    /// Focus a tab the user picked. Unknown tabs are ignored.
    pub fn focus(&mut self, tab: &TabId) -> Vec<Effect> {
        if self.client.channels.set_active(tab) {
            vec![Effect::FocusTab(tab.clone())]
        } else {
            Vec::new()
        }
    }

    fn active_channel(&self) -> Option<String> {
        self.client.channels.active_channel().map(str::to_string)
    }

    fn surface(
        &self,
        result: Result<Vec<Effect>, ClientError>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        match result {
            Ok(effects) => effects,
            Err(err) if err.is_user_facing() => vec![Effect::append(
                self.client.active_tab(),
                Line::Error { message: err.to_string() },
                now,
            )],
            Err(err) => {
                warn!("dropping frame: {}", err);
                Vec::new()
            }
        }
    }
}

fn outgoing(dest: String, text: String) -> ChatLine {
    ChatLine { dest, user: None, message: text, time: None }
}

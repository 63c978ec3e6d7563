use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire discriminants carried in the numeric `type` field of every frame.
/// These values are shared with the server and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Message = 0,
    Register = 1,
    Login = 2,
    Logout = 3,
    Join = 4,
    Leave = 5,
    List = 6,
    Action = 7,
    Error = -1,
}

impl MessageType {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Message),
            1 => Some(Self::Register),
            2 => Some(Self::Login),
            3 => Some(Self::Logout),
            4 => Some(Self::Join),
            5 => Some(Self::Leave),
            6 => Some(Self::List),
            7 => Some(Self::Action),
            -1 => Some(Self::Error),
            _ => None,
        }
    }
}

// -- Payloads --

/// Body of MESSAGE and ACTION frames. Outbound frames leave `user` and
/// `time` unset; the server fills them in when it relays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLine {
    pub dest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// Body of LOGIN and REGISTER frames. The server answers a successful login
/// with `auth: true` on the frame addressed to the authenticating client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Logout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Body of JOIN and LEAVE frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// LIST request (client → server, `users` empty) or reply. A reply without
/// `channel` is the list of everybody logged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// One protocol message, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Message(ChatLine),
    Register(Credentials),
    Login(Credentials),
    Logout(Logout),
    Join(Membership),
    Leave(Membership),
    List(UserList),
    Action(ChatLine),
    Error(ServerError),
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Message(_) => MessageType::Message,
            Self::Register(_) => MessageType::Register,
            Self::Login(_) => MessageType::Login,
            Self::Logout(_) => MessageType::Logout,
            Self::Join(_) => MessageType::Join,
            Self::Leave(_) => MessageType::Leave,
            Self::List(_) => MessageType::List,
            Self::Action(_) => MessageType::Action,
            Self::Error(_) => MessageType::Error,
        }
    }

    /// The channel this message belongs to: its `channel` field if it has
    /// one, otherwise its `dest`. Login, logout and errors are not scoped.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Message(line) | Self::Action(line) => Some(&line.dest),
            Self::Join(m) | Self::Leave(m) => Some(&m.channel),
            Self::List(list) => list.channel.as_deref(),
            _ => None,
        }
    }

    /// Server-side timestamp in seconds since the epoch, when present.
    pub fn time(&self) -> Option<f64> {
        match self {
            Self::Message(line) | Self::Action(line) => line.time,
            Self::Error(err) => err.time,
            _ => None,
        }
    }
}

/// An inbound frame: the message plus the envelope's backlog flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub message: Message,
    /// Set by the server on backlog replayed after joining a channel.
    pub history: bool,
}

impl Frame {
    pub fn live(message: Message) -> Self {
        Self { message, history: false }
    }

    pub fn history(message: Message) -> Self {
        Self { message, history: true }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no `type` field")]
    MissingType,

    #[error("frame `type` is not an integer: {0}")]
    InvalidType(Value),

    #[error("unknown frame type {0}")]
    UnknownType(i64),

    #[error("malformed {kind:?} frame: {source}")]
    Fields {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

// -- Codec --

/// Encode a message as a single wire frame.
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Value::Object(to_object(message)?))
}

/// Encode a frame including its `history` flag. Clients never send history
/// frames; this exists for servers and test fixtures speaking the protocol.
pub fn encode_frame(frame: &Frame) -> Result<String, serde_json::Error> {
    let mut object = to_object(&frame.message)?;
    if frame.history {
        object.insert("history".into(), Value::Bool(true));
    }
    serde_json::to_string(&Value::Object(object))
}

fn to_object(message: &Message) -> Result<Map<String, Value>, serde_json::Error> {
    let body = match message {
        Message::Message(line) | Message::Action(line) => serde_json::to_value(line)?,
        Message::Register(creds) | Message::Login(creds) => serde_json::to_value(creds)?,
        Message::Logout(logout) => serde_json::to_value(logout)?,
        Message::Join(m) | Message::Leave(m) => serde_json::to_value(m)?,
        Message::List(list) => serde_json::to_value(list)?,
        Message::Error(err) => serde_json::to_value(err)?,
    };

    let mut object = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    object.insert("type".into(), Value::from(message.kind().code()));
    Ok(object)
}

/// Decode one wire frame. Extra fields are ignored; a missing or unknown
/// `type`, or a missing required field, is an error.
pub fn decode(text: &str) -> Result<Frame, DecodeError> {
    let Value::Object(mut object) = serde_json::from_str::<Value>(text)? else {
        return Err(DecodeError::NotAnObject);
    };

    let raw_type = object.remove("type").ok_or(DecodeError::MissingType)?;
    let code = raw_type
        .as_i64()
        .ok_or_else(|| DecodeError::InvalidType(raw_type.clone()))?;
    let kind = MessageType::from_code(code).ok_or(DecodeError::UnknownType(code))?;

    let history = matches!(object.remove("history"), Some(Value::Bool(true)));
    let body = Value::Object(object);

    let message = match kind {
        MessageType::Message => Message::Message(fields(kind, body)?),
        MessageType::Register => Message::Register(fields(kind, body)?),
        MessageType::Login => Message::Login(fields(kind, body)?),
        MessageType::Logout => Message::Logout(fields(kind, body)?),
        MessageType::Join => Message::Join(fields(kind, body)?),
        MessageType::Leave => Message::Leave(fields(kind, body)?),
        MessageType::List => Message::List(fields(kind, body)?),
        MessageType::Action => Message::Action(fields(kind, body)?),
        MessageType::Error => Message::Error(fields(kind, body)?),
    };

    Ok(Frame { message, history })
}

fn fields<T: DeserializeOwned>(kind: MessageType, body: Value) -> Result<T, DecodeError> {
    serde_json::from_value(body).map_err(|source| DecodeError::Fields { kind, source })
}

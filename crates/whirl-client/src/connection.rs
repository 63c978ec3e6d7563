use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tracing::{info, warn};
use uuid::Uuid;

use whirl_types::models::TabId;

use crate::config::ClientConfig;
use crate::effects::{View, render};
use crate::error::ClientError;
use crate::session::{ConnectionState, Session, SocketEvent, Transport};

/// How long to wait for the server to acknowledge a close on shutdown.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

enum Outbound {
    Text(String),
    Close,
}

struct LiveSocket {
    id: Uuid,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

/// [`Transport`] over tokio-tungstenite.
///
/// Each connection runs in its own task which forwards socket events, in
/// arrival order, to the `events` channel. Must be used from inside a tokio
/// runtime.
pub struct WsTransport {
    events: mpsc::UnboundedSender<SocketEvent>,
    cookie: Option<String>,
    live: Option<LiveSocket>,
}

impl WsTransport {
    pub fn new(events: mpsc::UnboundedSender<SocketEvent>) -> Self {
        Self { events, cookie: None, live: None }
    }

    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }
}

impl Transport for WsTransport {
    fn connect(&mut self, id: Uuid, url: &str) -> Result<(), ClientError> {
        let request = build_request(url, self.cookie.as_deref())?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(id, request, outbound_rx, self.events.clone()));

        // A socket the server already closed leaves a finished task behind.
        if let Some(old) = self.live.replace(LiveSocket { id, outbound, task }) {
            if !old.task.is_finished() {
                warn!("dropping live connection {}", old.id);
            }
            old.task.abort();
        }
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<(), ClientError> {
        let live = self.live.as_ref().ok_or(ClientError::NotConnected)?;
        live.outbound
            .send(Outbound::Text(text))
            .map_err(|_| ClientError::NotConnected)
    }

    fn close(&mut self) {
        if let Some(live) = self.live.take() {
            // The task sends a close frame and reports Closed once it exits.
            let _ = live.outbound.send(Outbound::Close);
        }
    }
}

fn build_request(url: &str, cookie: Option<&str>) -> Result<Request, ClientError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(cookie)
            .map_err(|e| ClientError::Transport(format!("invalid cookie: {e}")))?;
        request.headers_mut().insert(COOKIE, value);
    }
    Ok(request)
}

async fn run_socket(
    id: Uuid,
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let socket = match connect_async(request).await {
        Ok((socket, _)) => socket,
        Err(e) => {
            warn!("connection {} failed: {}", id, e);
            let _ = events.send(SocketEvent::Closed(id));
            return;
        }
    };
    let _ = events.send(SocketEvent::Opened(id));

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(text)) => {
                    if sink.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    if events.send(SocketEvent::Text(id, text.as_str().to_owned())).is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("connection {} read error: {}", id, e);
                    break;
                }
            },
        }
    }

    let _ = events.send(SocketEvent::Closed(id));
}

/// Input from the user side of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A line typed by the user, parsed as a command or chat message.
    Line(String),
    /// The user picked a tab.
    Focus(TabId),
}

/// Drive a session until `input` closes.
///
/// Socket events and user input are handled one at a time on the calling
/// task; every batch of effects is rendered before the next event is taken.
pub async fn run(config: &ClientConfig, mut input: mpsc::Receiver<Input>, view: &mut impl View) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let transport = WsTransport::new(events_tx).with_cookie(config.cookie.clone());
    let mut session = Session::new(transport, config.endpoint());

    info!("whirl client ready ({} auth, server {})", config.auth, config.server);

    loop {
        let effects = tokio::select! {
            line = input.recv() => match line {
                Some(Input::Line(line)) => session.handle_input(&line, Utc::now()),
                Some(Input::Focus(tab)) => session.focus(&tab),
                None => break,
            },
            Some(event) = events_rx.recv() => session.handle_event(event, Utc::now()),
        };
        render(view, &effects);
    }

    session.close();
    if session.state() == ConnectionState::Closing {
        let drained = tokio::time::timeout(CLOSE_GRACE, async {
            while session.state() != ConnectionState::Closed {
                let Some(event) = events_rx.recv().await else {
                    break;
                };
                render(view, &session.handle_event(event, Utc::now()));
            }
        })
        .await;
        if drained.is_err() {
            warn!("server did not acknowledge close within {:?}", CLOSE_GRACE);
        }
    }
}

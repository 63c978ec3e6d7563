//! Inbound frame handling.
//!
//! [`reduce`] folds one decoded frame into the client state and returns the
//! effects the view has to apply. It does no I/O and reads no clock, so the
//! same state, frame and `now` always give the same result.

use chrono::{DateTime, Utc};
use tracing::debug;

use whirl_types::models::TabId;
use whirl_types::protocol::{Frame, Message, MessageType};

use crate::effects::{Effect, Line};
use crate::error::ProtocolError;
use crate::registry::ChannelRegistry;

/// State the reducer is allowed to touch.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// Username the server confirmed for this connection.
    pub identity: Option<String>,
    pub channels: ChannelRegistry,
}

impl ClientState {
    fn is_me(&self, user: Option<&str>) -> bool {
        matches!((self.identity.as_deref(), user), (Some(me), Some(user)) if me == user)
    }

    /// Tab that errors and other unscoped notices land in.
    pub fn active_tab(&self) -> TabId {
        self.channels
            .active_or_none()
            .cloned()
            .unwrap_or(TabId::Console)
    }
}

pub fn reduce(
    state: &mut ClientState,
    frame: Frame,
    now: DateTime<Utc>,
) -> Result<Vec<Effect>, ProtocolError> {
    let timestamp = frame.message.time().and_then(from_epoch_secs).unwrap_or(now);

    if frame.history && !matches!(frame.message, Message::List(_)) {
        return replay(state, frame.message, timestamp);
    }

    let mut effects = Vec::new();
    match frame.message {
        Message::Message(chat) => effects.push(Effect::append(
            TabId::channel(chat.dest),
            Line::Message { user: chat.user.unwrap_or_default(), text: chat.message },
            timestamp,
        )),

        Message::Action(chat) => effects.push(Effect::append(
            TabId::channel(chat.dest),
            Line::Action { user: chat.user.unwrap_or_default(), text: chat.message },
            timestamp,
        )),

        Message::Login(creds) => {
            if creds.auth == Some(true) {
                state.identity = Some(creds.user.clone());
            }
            effects.push(Effect::append(
                TabId::Console,
                Line::Login { user: creds.user },
                timestamp,
            ));
        }

        Message::Logout(logout) => {
            // A bare LOGOUT is about us; with nobody logged in there is no one to name.
            let Some(user) = logout.user.or_else(|| state.identity.clone()) else {
                debug!("ignoring LOGOUT without user while logged out");
                return Ok(effects);
            };
            if state.is_me(Some(user.as_str())) {
                state.identity = None;
            }
            effects.push(Effect::append(TabId::Console, Line::Logout { user }, timestamp));
        }

        Message::Join(m) => {
            let tab = TabId::channel(m.channel.as_str());
            if state.is_me(m.user.as_deref()) {
                if state.channels.ensure(&m.channel) {
                    effects.push(Effect::OpenTab(tab.clone()));
                }
                state.channels.set_active(&tab);
                effects.push(Effect::FocusTab(tab.clone()));
            }
            effects.push(Effect::append(
                tab,
                Line::Join { user: m.user.unwrap_or_default(), channel: m.channel },
                timestamp,
            ));
        }

        Message::Leave(m) => {
            let tab = TabId::channel(m.channel.as_str());
            let me = state.is_me(m.user.as_deref());
            effects.push(Effect::append(
                tab.clone(),
                Line::Leave { user: m.user.unwrap_or_default(), channel: m.channel.clone() },
                timestamp,
            ));
            if me {
                let was_active = state.channels.active_or_none() == Some(&tab);
                if state.channels.remove(&m.channel) {
                    effects.push(Effect::CloseTab(tab));
                    if was_active {
                        effects.push(Effect::FocusTab(TabId::Console));
                    }
                }
            }
        }

        Message::List(list) => effects.push(Effect::SetUserList {
            users: list.users,
            channel: list.channel,
        }),

        Message::Error(err) => effects.push(Effect::append(
            state.active_tab(),
            Line::Error { message: err.message },
            timestamp,
        )),

        Message::Register(_) => return Err(ProtocolError(MessageType::Register)),
    }

    Ok(effects)
}

/// Backlog frames only make sure their tab exists before landing in it.
/// Identity and focus are left alone.
fn replay(
    state: &mut ClientState,
    message: Message,
    timestamp: DateTime<Utc>,
) -> Result<Vec<Effect>, ProtocolError> {
    let mut effects = Vec::new();

    let tab = match (&message, message.channel()) {
        (Message::Error(_), _) => state.active_tab(),
        (_, Some(channel)) => {
            if state.channels.ensure(channel) {
                effects.push(Effect::OpenTab(TabId::channel(channel)));
            }
            TabId::channel(channel)
        }
        (_, None) => TabId::Console,
    };

    let line = match message {
        Message::Message(chat) => Line::Message { user: chat.user.unwrap_or_default(), text: chat.message },
        Message::Action(chat) => Line::Action { user: chat.user.unwrap_or_default(), text: chat.message },
        Message::Login(creds) => Line::Login { user: creds.user },
        Message::Logout(logout) => match logout.user {
            Some(user) => Line::Logout { user },
            None => return Ok(effects),
        },
        Message::Join(m) => Line::Join { user: m.user.unwrap_or_default(), channel: m.channel },
        Message::Leave(m) => Line::Leave { user: m.user.unwrap_or_default(), channel: m.channel },
        Message::Error(err) => Line::Error { message: err.message },
        Message::Register(_) => return Err(ProtocolError(MessageType::Register)),
        // LIST is never replayed as history
        Message::List(_) => return Ok(effects),
    };

    effects.push(Effect::AppendLine { tab, line, timestamp, history: true });
    Ok(effects)
}

fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use whirl_types::protocol::{decode, ChatLine, Credentials, Logout, Membership, UserList};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn logged_in(user: &str) -> ClientState {
        ClientState { identity: Some(user.into()), ..Default::default() }
    }

    fn frame(text: &str) -> Frame {
        decode(text).unwrap()
    }

    #[test]
    fn self_join_opens_and_focuses_channel() {
        let mut state = logged_in("alice");
        let effects =
            reduce(&mut state, frame(r#"{"type":4,"user":"alice","channel":"dev"}"#), now()).unwrap();

        assert!(state.channels.exists(&TabId::channel("dev")));
        assert_eq!(state.channels.active_channel(), Some("dev"));
        assert_eq!(
            effects,
            vec![
                Effect::OpenTab(TabId::channel("dev")),
                Effect::FocusTab(TabId::channel("dev")),
                Effect::append(
                    TabId::channel("dev"),
                    Line::Join { user: "alice".into(), channel: "dev".into() },
                    now(),
                ),
            ]
        );
    }

    #[test]
    fn other_user_join_only_logs() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        let effects =
            reduce(&mut state, frame(r#"{"type":4,"user":"bob","channel":"dev"}"#), now()).unwrap();

        assert_eq!(state.channels.active_or_none(), Some(&TabId::Console));
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::AppendLine { tab, line: Line::Join { user, .. }, .. }
                if *tab == TabId::channel("dev") && user == "bob"
        ));
    }

    #[test]
    fn rejoining_an_open_channel_only_refocuses() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        let effects =
            reduce(&mut state, frame(r#"{"type":4,"user":"alice","channel":"dev"}"#), now()).unwrap();
        assert_eq!(effects[0], Effect::FocusTab(TabId::channel("dev")));
        assert_eq!(state.channels.tabs().count(), 2);
    }

    #[test]
    fn self_leave_of_active_channel_returns_to_console() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        state.channels.set_active(&TabId::channel("dev"));

        let effects =
            reduce(&mut state, frame(r#"{"type":5,"user":"alice","channel":"dev"}"#), now()).unwrap();

        assert!(!state.channels.exists(&TabId::channel("dev")));
        assert_eq!(state.channels.active_or_none(), Some(&TabId::Console));
        assert_eq!(
            effects,
            vec![
                Effect::append(
                    TabId::channel("dev"),
                    Line::Leave { user: "alice".into(), channel: "dev".into() },
                    now(),
                ),
                Effect::CloseTab(TabId::channel("dev")),
                Effect::FocusTab(TabId::Console),
            ]
        );
    }

    #[test]
    fn other_user_leave_keeps_channel() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        let leave = Message::Leave(Membership { channel: "dev".into(), user: Some("bob".into()) });
        let effects = reduce(&mut state, Frame::live(leave), now()).unwrap();
        assert!(state.channels.exists(&TabId::channel("dev")));
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn authenticated_login_sets_identity() {
        let mut state = ClientState::default();
        let login = Message::Login(Credentials {
            user: "alice".into(),
            password: None,
            auth: Some(true),
        });
        let effects = reduce(&mut state, Frame::live(login), now()).unwrap();
        assert_eq!(state.identity.as_deref(), Some("alice"));
        assert_eq!(
            effects,
            vec![Effect::append(TabId::Console, Line::Login { user: "alice".into() }, now())]
        );
    }

    #[test]
    fn login_broadcast_for_someone_else_leaves_identity() {
        let mut state = logged_in("alice");
        reduce(&mut state, frame(r#"{"type":2,"user":"bob"}"#), now()).unwrap();
        assert_eq!(state.identity.as_deref(), Some("alice"));
    }

    #[test]
    fn logout_clears_own_identity_only() {
        let mut state = logged_in("alice");
        reduce(&mut state, frame(r#"{"type":3,"user":"bob"}"#), now()).unwrap();
        assert_eq!(state.identity.as_deref(), Some("alice"));

        let effects = reduce(&mut state, Frame::live(Message::Logout(Logout::default())), now()).unwrap();
        assert_eq!(state.identity, None);
        assert_eq!(
            effects,
            vec![Effect::append(TabId::Console, Line::Logout { user: "alice".into() }, now())]
        );
    }

    #[test]
    fn server_error_lands_in_active_tab_with_its_own_time() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        state.channels.set_active(&TabId::channel("dev"));
        let before = state.clone();

        let effects = reduce(
            &mut state,
            frame(r#"{"type":-1,"message":"bad password","time":12345}"#),
            now(),
        )
        .unwrap();

        assert_eq!(
            effects,
            vec![Effect::append(
                TabId::channel("dev"),
                Line::Error { message: "bad password".into() },
                DateTime::from_timestamp(12345, 0).unwrap(),
            )]
        );
        assert_eq!(state.identity, before.identity);
        assert_eq!(state.channels.active_or_none(), before.channels.active_or_none());
    }

    #[test]
    fn messages_and_actions_go_to_dest() {
        let mut state = logged_in("alice");
        let chat = ChatLine {
            dest: "dev".into(),
            user: Some("bob".into()),
            message: "waves".into(),
            time: None,
        };
        let effects = reduce(&mut state, Frame::live(Message::Action(chat.clone())), now()).unwrap();
        assert_eq!(
            effects,
            vec![Effect::append(
                TabId::channel("dev"),
                Line::Action { user: "bob".into(), text: "waves".into() },
                now(),
            )]
        );

        let effects = reduce(&mut state, Frame::live(Message::Message(chat)), now()).unwrap();
        assert!(matches!(&effects[0], Effect::AppendLine { line: Line::Message { .. }, .. }));
    }

    #[test]
    fn list_replaces_user_list_without_logging() {
        let mut state = logged_in("alice");
        let list = UserList { users: vec!["alice".into(), "bob".into()], channel: Some("dev".into()) };
        let effects = reduce(&mut state, Frame::history(Message::List(list)), now()).unwrap();
        assert_eq!(
            effects,
            vec![Effect::SetUserList {
                users: vec!["alice".into(), "bob".into()],
                channel: Some("dev".into()),
            }]
        );
    }

    #[test]
    fn history_opens_tab_without_touching_focus_or_identity() {
        let mut state = logged_in("alice");
        let effects = reduce(
            &mut state,
            frame(r#"{"type":0,"dest":"dev","user":"bob","message":"earlier","time":60,"history":true}"#),
            now(),
        )
        .unwrap();

        assert!(state.channels.exists(&TabId::channel("dev")));
        assert_eq!(state.channels.active_or_none(), Some(&TabId::Console));
        assert_eq!(
            effects,
            vec![
                Effect::OpenTab(TabId::channel("dev")),
                Effect::AppendLine {
                    tab: TabId::channel("dev"),
                    line: Line::Message { user: "bob".into(), text: "earlier".into() },
                    timestamp: DateTime::from_timestamp(60, 0).unwrap(),
                    history: true,
                },
            ]
        );
    }

    #[test]
    fn history_self_join_and_logout_change_nothing() {
        let mut state = logged_in("alice");
        reduce(
            &mut state,
            frame(r#"{"type":4,"user":"alice","channel":"dev","history":true}"#),
            now(),
        )
        .unwrap();
        reduce(&mut state, frame(r#"{"type":3,"user":"alice","history":true}"#), now()).unwrap();
        reduce(
            &mut state,
            frame(r#"{"type":5,"user":"alice","channel":"dev","history":true}"#),
            now(),
        )
        .unwrap();

        assert_eq!(state.identity.as_deref(), Some("alice"));
        assert!(state.channels.exists(&TabId::channel("dev")));
        assert_eq!(state.channels.active_or_none(), Some(&TabId::Console));
    }

    #[test]
    fn history_for_known_channel_does_not_reopen_it() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        let effects = reduce(
            &mut state,
            frame(r#"{"type":7,"dest":"dev","user":"bob","message":"waves","history":true}"#),
            now(),
        )
        .unwrap();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn register_is_a_protocol_error() {
        let mut state = ClientState::default();
        let err = reduce(&mut state, frame(r#"{"type":1,"user":"x"}"#), now()).unwrap_err();
        assert_eq!(err, ProtocolError(MessageType::Register));
    }

    #[test]
    fn history_error_lands_in_active_tab() {
        let mut state = logged_in("alice");
        state.channels.ensure("dev");
        state.channels.set_active(&TabId::channel("dev"));

        let effects =
            reduce(&mut state, frame(r#"{"type":-1,"message":"x","history":true}"#), now()).unwrap();

        assert_eq!(
            effects,
            vec![Effect::AppendLine {
                tab: TabId::channel("dev"),
                line: Line::Error { message: "x".into() },
                timestamp: now(),
                history: true,
            }]
        );
    }

    #[test]
    fn anonymous_logout_while_logged_out_is_dropped() {
        let mut state = ClientState::default();
        assert!(reduce(&mut state, frame(r#"{"type":3}"#), now()).unwrap().is_empty());
        assert!(
            reduce(&mut state, frame(r#"{"type":3,"history":true}"#), now())
                .unwrap()
                .is_empty()
        );
        assert_eq!(state.identity, None);
    }
}

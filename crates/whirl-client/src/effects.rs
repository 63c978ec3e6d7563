use std::fmt;

use chrono::{DateTime, Utc};

use whirl_types::models::TabId;

/// Visual class of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Message,
    Action,
    Notification,
    Error,
}

/// Content of one log line, before any styling is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Message { user: String, text: String },
    Action { user: String, text: String },
    Login { user: String },
    Logout { user: String },
    Join { user: String, channel: String },
    Leave { user: String, channel: String },
    Disconnected,
    Error { message: String },
}

impl Line {
    pub fn style(&self) -> LineStyle {
        match self {
            Self::Message { .. } => LineStyle::Message,
            Self::Action { .. } => LineStyle::Action,
            Self::Error { .. } => LineStyle::Error,
            Self::Login { .. }
            | Self::Logout { .. }
            | Self::Join { .. }
            | Self::Leave { .. }
            | Self::Disconnected => LineStyle::Notification,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message { user, text } => write!(f, "<{user}> {text}"),
            Self::Action { user, text } => write!(f, "* {user} {text}"),
            Self::Login { user } => write!(f, "{user} has logged in"),
            Self::Logout { user } => write!(f, "{user} has quit"),
            Self::Join { user, channel } => write!(f, "{user} joined #{channel}"),
            Self::Leave { user, channel } => write!(f, "{user} left #{channel}"),
            Self::Disconnected => f.write_str("Connection closed."),
            Self::Error { message } => f.write_str(message),
        }
    }
}

/// Something the view has to do in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AppendLine {
        tab: TabId,
        line: Line,
        timestamp: DateTime<Utc>,
        history: bool,
    },
    /// Replace the user list of `channel`, or the global list when `None`.
    SetUserList {
        users: Vec<String>,
        channel: Option<String>,
    },
    OpenTab(TabId),
    CloseTab(TabId),
    FocusTab(TabId),
}

impl Effect {
    pub fn append(tab: TabId, line: Line, timestamp: DateTime<Utc>) -> Self {
        Self::AppendLine { tab, line, timestamp, history: false }
    }

    pub fn apply(&self, view: &mut impl View) {
        match self {
            Self::AppendLine { tab, line, timestamp, history } => {
                view.append_line(tab, line, *timestamp, *history)
            }
            Self::SetUserList { users, channel } => view.set_user_list(users, channel.as_deref()),
            Self::OpenTab(tab) => view.open_tab(tab),
            Self::CloseTab(tab) => view.close_tab(tab),
            Self::FocusTab(tab) => view.focus_tab(tab),
        }
    }
}

/// Renders effects. Implementations own all presentation concerns.
pub trait View {
    fn append_line(&mut self, tab: &TabId, line: &Line, timestamp: DateTime<Utc>, history: bool);
    fn set_user_list(&mut self, users: &[String], channel: Option<&str>);
    fn open_tab(&mut self, tab: &TabId);
    fn close_tab(&mut self, tab: &TabId);
    fn focus_tab(&mut self, tab: &TabId);
}

/// Apply effects to a view in order.
pub fn render(view: &mut impl View, effects: &[Effect]) {
    for effect in effects {
        effect.apply(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl View for Recorder {
        fn append_line(&mut self, tab: &TabId, line: &Line, _: DateTime<Utc>, history: bool) {
            self.0.push(format!("{tab} {line} {history}"));
        }
        fn set_user_list(&mut self, users: &[String], channel: Option<&str>) {
            self.0.push(format!("users {:?} {}", channel, users.join(",")));
        }
        fn open_tab(&mut self, tab: &TabId) {
            self.0.push(format!("open {tab}"));
        }
        fn close_tab(&mut self, tab: &TabId) {
            self.0.push(format!("close {tab}"));
        }
        fn focus_tab(&mut self, tab: &TabId) {
            self.0.push(format!("focus {tab}"));
        }
    }

    #[test]
    fn line_texts() {
        let user = "alice".to_string();
        assert_eq!(
            Line::Message { user: user.clone(), text: "hi".into() }.to_string(),
            "<alice> hi"
        );
        assert_eq!(
            Line::Action { user: user.clone(), text: "waves".into() }.to_string(),
            "* alice waves"
        );
        assert_eq!(Line::Logout { user: user.clone() }.to_string(), "alice has quit");
        assert_eq!(
            Line::Join { user, channel: "dev".into() }.to_string(),
            "alice joined #dev"
        );
    }

    #[test]
    fn render_applies_effects_in_order() {
        let mut view = Recorder::default();
        let effects = vec![
            Effect::OpenTab(TabId::channel("dev")),
            Effect::FocusTab(TabId::channel("dev")),
            Effect::append(
                TabId::channel("dev"),
                Line::Error { message: "nope".into() },
                DateTime::from_timestamp(0, 0).unwrap(),
            ),
            Effect::SetUserList { users: vec!["a".into(), "b".into()], channel: None },
        ];
        render(&mut view, &effects);
        assert_eq!(
            view.0,
            vec![
                "open #dev",
                "focus #dev",
                "#dev nope false",
                "users None a,b",
            ]
        );
    }
}

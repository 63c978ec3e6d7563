//! Free-text input → command.
//!
//! The leading token picks the command, checked in the order `/login`,
//! `/logout`, `/join`, `/leave`, `/list`, `/me`; anything else is a chat
//! message. Input with the wrong number of arguments parses to `None` and is
//! dropped without a word, as are blank lines.

use whirl_types::models::AuthMode;

/// Arguments of `/login`, shaped by the configured auth mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginArgs {
    Cookie,
    Plain { user: String, password: String },
    Legacy { nick: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(LoginArgs),
    Logout,
    Join { channel: String },
    /// `None` leaves the focused channel.
    Leave { channel: Option<String> },
    List,
    Action { text: String },
    Say { text: String },
}

pub fn parse(input: &str, auth: AuthMode) -> Option<Command> {
    let input = input.trim_end_matches(['\r', '\n']);
    if input.trim().is_empty() {
        return None;
    }

    let trimmed = input.trim_start();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest),
        None => (trimmed, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match head {
        "/login" => parse_login(&args, auth).map(Command::Login),
        "/logout" => args.is_empty().then_some(Command::Logout),
        "/join" => match args.as_slice() {
            [channel] => channel_arg(channel).map(|channel| Command::Join { channel }),
            _ => None,
        },
        "/leave" => match args.as_slice() {
            [] => Some(Command::Leave { channel: None }),
            [channel] => channel_arg(channel).map(|channel| Command::Leave { channel: Some(channel) }),
            _ => None,
        },
        "/list" => args.is_empty().then_some(Command::List),
        "/me" => {
            let text = rest.trim();
            (!text.is_empty()).then(|| Command::Action { text: text.to_string() })
        }
        _ => Some(Command::Say { text: input.to_string() }),
    }
}

fn parse_login(args: &[&str], auth: AuthMode) -> Option<LoginArgs> {
    match (auth, args) {
        (AuthMode::Cookie, []) => Some(LoginArgs::Cookie),
        (AuthMode::Plain, [user, password]) => Some(LoginArgs::Plain {
            user: user.to_string(),
            password: password.to_string(),
        }),
        (AuthMode::Legacy, [nick]) => Some(LoginArgs::Legacy { nick: nick.to_string() }),
        _ => None,
    }
}

/// The server strips a leading `#` from channel names; do the same so the
/// names we track match the ones it echoes back.
fn channel_arg(raw: &str) -> Option<String> {
    let name = raw.trim_start_matches('#');
    (!name.is_empty()).then(|| name.to_string())
}

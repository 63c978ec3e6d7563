use std::io::Write;

use chrono::{DateTime, Local, Utc};

use whirl_client::connection::Input;
use whirl_client::effects::LineStyle;
use whirl_client::{Line, View};
use whirl_types::models::{AuthMode, TabId};

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Map a stdin line to client input. `/tab` is handled by the view, all
/// other lines go to the command parser.
pub fn parse_input(line: String) -> Input {
    let trimmed = line.trim();
    let target = match trimmed.strip_prefix("/tab") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => return Input::Line(line),
    };

    match target.trim_start_matches('#') {
        "" => Input::Focus(TabId::Console),
        name => Input::Focus(TabId::channel(name)),
    }
}

/// Line-oriented view: every effect becomes one line of output.
pub struct TerminalView<W> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn banner(&mut self, auth: AuthMode) {
        let login = match auth {
            AuthMode::Cookie => "/login",
            AuthMode::Plain => "/login <user> <password>",
            AuthMode::Legacy => "/login <nick>",
        };
        self.notice(&format!(
            "type {login} to connect; /join, /leave, /list, /me, /logout; /tab <name> switches tabs"
        ));
    }

    fn notice(&mut self, text: &str) {
        self.emit(format_args!("{DIM}-- {text}{RESET}"));
    }

    // Stdout going away is not worth tearing the session down for.
    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

impl<W: Write> View for TerminalView<W> {
    fn append_line(&mut self, tab: &TabId, line: &Line, timestamp: DateTime<Utc>, history: bool) {
        let time = timestamp.with_timezone(&Local).format("%H:%M");
        let (open, close) = match (history, line.style()) {
            (true, _) => (DIM, RESET),
            (false, LineStyle::Error) => (RED, RESET),
            (false, LineStyle::Action) => (BOLD, RESET),
            (false, _) => ("", ""),
        };
        let history_mark = if history { "~ " } else { "" };
        self.emit(format_args!("{open}[{time}] {tab} {history_mark}{line}{close}"));
    }

    fn set_user_list(&mut self, users: &[String], channel: Option<&str>) {
        let scope = match channel {
            Some(channel) => format!("#{channel}"),
            None => "server".to_string(),
        };
        self.notice(&format!("users in {scope}: {}", users.join(", ")));
    }

    fn open_tab(&mut self, tab: &TabId) {
        self.notice(&format!("opened {tab}"));
    }

    fn close_tab(&mut self, tab: &TabId) {
        self.notice(&format!("closed {tab}"));
    }

    fn focus_tab(&mut self, tab: &TabId) {
        self.notice(&format!("now talking in {tab}"));
    }
}

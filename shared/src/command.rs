use crate::{ConnectionState, NO_RESPONSE_MATCH, NO_RESPONSE_OUTPUT};
use serde::{Deserialize, Serialize};

/// Console verbs that get semantic handling once their output arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandVerb {
    ListPlayers,
    GetChat,
    Broadcast,
    ServerChat,
    Other(String),
}

impl CommandVerb {
    /// Matches the verb case-insensitively; unknown verbs keep their text.
    pub fn parse(verb: &str) -> Self {
        match verb.to_ascii_lowercase().as_str() {
            "listplayers" => CommandVerb::ListPlayers,
            "getchat" => CommandVerb::GetChat,
            "broadcast" => CommandVerb::Broadcast,
            "serverchat" => CommandVerb::ServerChat,
            _ => CommandVerb::Other(verb.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CommandVerb::ListPlayers => "listplayers",
            CommandVerb::GetChat => "getchat",
            CommandVerb::Broadcast => "broadcast",
            CommandVerb::ServerChat => "serverchat",
            CommandVerb::Other(verb) => verb,
        }
    }
}

/// One console command and, once executed, its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleCommand {
    pub raw_text: String,
    pub verb: CommandVerb,
    pub args: Option<String>,
    pub status: ConnectionState,
    /// Keeps the command text itself out of the all-events log.
    pub suppress_input: bool,
    pub suppress_output: bool,
    pub lines: Vec<String>,
}

impl ConsoleCommand {
    pub fn new(raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let (verb, args) = split_command(&raw_text);

        Self {
            raw_text,
            verb,
            args,
            status: ConnectionState::Disconnected,
            suppress_input: false,
            suppress_output: false,
            lines: Vec::new(),
        }
    }

    /// A background poll: neither the command nor its output is echoed.
    pub fn auto_poll(raw_text: impl Into<String>) -> Self {
        Self {
            suppress_input: true,
            suppress_output: true,
            ..Self::new(raw_text)
        }
    }

    pub fn is_auto_poll(&self) -> bool {
        self.suppress_input
    }
}

fn split_command(raw_text: &str) -> (CommandVerb, Option<String>) {
    let trimmed = raw_text.trim_start();
    match trimmed.split_once(' ') {
        Some((verb, args)) => (CommandVerb::parse(verb), Some(args.to_string())),
        None => (CommandVerb::parse(trimmed.trim_end()), None),
    }
}

/// Splits a raw response into trimmed, non-empty lines and folds the
/// server's "no response" reply into [`NO_RESPONSE_OUTPUT`].
pub fn split_response(response: &str) -> Vec<String> {
    let mut lines: Vec<String> = response
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if lines.len() == 1 && lines[0].starts_with(NO_RESPONSE_MATCH) {
        lines[0] = NO_RESPONSE_OUTPUT.to_string();
    }

    lines
}

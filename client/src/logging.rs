//! Per-client console event streams.
//!
//! Each client writes human-readable lines to three streams: everything,
//! chat only and game events only. Where they end up is decided by the
//! [`EventLog`] implementation handed to the client at construction.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    All,
    Chat,
    Event,
}

impl LogStream {
    pub fn target(self) -> &'static str {
        match self {
            LogStream::All => "rcon::all",
            LogStream::Chat => "rcon::chat",
            LogStream::Event => "rcon::event",
        }
    }
}

pub trait EventLog: Send + Sync {
    fn log(&self, stream: LogStream, line: &str);
}

/// Forwards every stream to the `log` facade under its own target.
#[derive(Debug, Clone)]
pub struct LogEventLog {
    profile_name: String,
}

impl LogEventLog {
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
        }
    }
}

impl EventLog for LogEventLog {
    fn log(&self, stream: LogStream, line: &str) {
        log::info!(target: stream.target(), "[{}] {}", self.profile_name, line);
    }
}

/// Keeps every line in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    lines: Mutex<Vec<(LogStream, String)>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self, stream: LogStream) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines
                .iter()
                .filter(|(s, _)| *s == stream)
                .map(|(_, line)| line.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|lines| lines.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventLog for MemoryEventLog {
    fn log(&self, stream: LogStream, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((stream, line.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_separates_streams() {
        let log = MemoryEventLog::new();
        assert!(log.is_empty());

        log.log(LogStream::All, "listplayers");
        log.log(LogStream::Chat, "Alice: hi");
        log.log(LogStream::All, "Alice: hi");
        log.log(LogStream::Event, "Player 'Alice' joined the game.");

        assert_eq!(log.len(), 4);
        assert_eq!(log.lines(LogStream::All), vec!["listplayers", "Alice: hi"]);
        assert_eq!(log.lines(LogStream::Chat), vec!["Alice: hi"]);
        assert_eq!(
            log.lines(LogStream::Event),
            vec!["Player 'Alice' joined the game."]
        );
    }

    #[test]
    fn test_stream_targets_are_distinct() {
        assert_eq!(LogStream::All.target(), "rcon::all");
        assert_eq!(LogStream::Chat.target(), "rcon::chat");
        assert_eq!(LogStream::Event.target(), "rcon::event");
    }
}

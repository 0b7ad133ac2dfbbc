use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod command;
pub mod player;

pub use command::{split_response, CommandVerb, ConsoleCommand};
pub use player::{parse_player_line, EnrichedPlayer, ParseError, PlayerInfo, SteamId, TribeInfo};

pub const DEFAULT_RCON_PORT: u16 = 32330;
pub const DEFAULT_MAX_PLAYERS: u32 = 70;

/// Prefix the server sends when a command produced no output.
pub const NO_RESPONSE_MATCH: &str = "Server received, But no response!!";
/// Stable marker that replaces [`NO_RESPONSE_MATCH`] in command output.
pub const NO_RESPONSE_OUTPUT: &str = "NO_RESPONSE";

const SAVED_ARKS_DIR: &str = "SavedArks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Immutable connection settings for one RCON client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RconParameters {
    pub host: String,
    pub port: u16,
    pub admin_password: String,
    pub profile_name: String,
    pub install_directory: String,
    pub max_players: u32,
    pub alt_save_directory_name: Option<String>,
}

impl RconParameters {
    pub fn new(host: impl Into<String>, port: u16, admin_password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            admin_password: admin_password.into(),
            profile_name: String::new(),
            install_directory: String::new(),
            max_players: DEFAULT_MAX_PLAYERS,
            alt_save_directory_name: None,
        }
    }

    pub fn with_profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.profile_name = profile_name.into();
        self
    }

    pub fn with_install_directory(mut self, install_directory: impl Into<String>) -> Self {
        self.install_directory = install_directory.into();
        self
    }

    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    pub fn with_alt_save_directory(mut self, name: impl Into<String>) -> Self {
        self.alt_save_directory_name = Some(name.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Directory holding player and tribe save files, or `None` when no
    /// install directory was configured.
    pub fn save_path(&self) -> Option<PathBuf> {
        if self.install_directory.trim().is_empty() {
            return None;
        }

        let save_dir = self
            .alt_save_directory_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(SAVED_ARKS_DIR);

        Some(
            PathBuf::from(&self.install_directory)
                .join("ShooterGame")
                .join("Saved")
                .join(save_dir),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_defaults() {
        let params = RconParameters::new("127.0.0.1", DEFAULT_RCON_PORT, "secret");
        assert_eq!(params.endpoint(), "127.0.0.1:32330");
        assert_eq!(params.max_players, DEFAULT_MAX_PLAYERS);
        assert!(params.profile_name.is_empty());
    }

    #[test]
    fn test_save_path_requires_install_directory() {
        let params = RconParameters::new("127.0.0.1", 1, "pw");
        assert!(params.save_path().is_none());

        let params = params.with_install_directory("   ");
        assert!(params.save_path().is_none());
    }

    #[test]
    fn test_save_path_layout() {
        let params = RconParameters::new("127.0.0.1", 1, "pw").with_install_directory("/srv/ark");
        let expected = PathBuf::from("/srv/ark/ShooterGame/Saved/SavedArks");
        assert_eq!(params.save_path(), Some(expected));

        let params = params.with_alt_save_directory("TheIsland2");
        let expected = PathBuf::from("/srv/ark/ShooterGame/Saved/TheIsland2");
        assert_eq!(params.save_path(), Some(expected));
    }

    #[test]
    fn test_connection_state_default() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}

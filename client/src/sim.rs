//! In-memory stand-in for a game server console.
//!
//! [`SimulatedServer`] answers the console commands the client issues on its
//! own (`listplayers`, `getchat`, `broadcast`, `serverchat`) and can be made
//! unreliable: players join and leave at random, sends fail at random, or the
//! whole server can be taken down. Used by the `rcon-sim` binary and tests.

use crate::enrichment::PlayerDetailsSource;
use crate::error::{EnrichmentError, TransportError};
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    CommandVerb, ConsoleCommand, EnrichedPlayer, RconParameters, SteamId, NO_RESPONSE_MATCH,
};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

const FIRST_STEAM_ID: SteamId = 76561198000000000;

const NAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi", "Ivan", "Judy",
];

#[derive(Debug, Default)]
struct ServerState {
    online: Vec<(SteamId, String)>,
    /// Everyone who has ever connected, in first-seen order.
    known: Vec<(SteamId, String)>,
    chat: VecDeque<String>,
    received: Vec<String>,
    next_id: SteamId,
    down: bool,
}

impl ServerState {
    fn join(&mut self, name: &str) -> SteamId {
        let id = FIRST_STEAM_ID + self.next_id;
        self.next_id += 1;
        self.online.push((id, name.to_string()));
        self.known.push((id, name.to_string()));
        id
    }
}

#[derive(Clone)]
pub struct SimulatedServer {
    password: String,
    churn: f64,
    fail_rate: f64,
    state: Arc<Mutex<ServerState>>,
}

impl SimulatedServer {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            churn: 0.0,
            fail_rate: 0.0,
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    /// Chance, per `listplayers`, that someone joins or leaves.
    pub fn with_churn(mut self, churn: f64) -> Self {
        self.churn = churn.clamp(0.0, 1.0);
        self
    }

    /// Chance that any single send fails.
    pub fn with_fail_rate(mut self, fail_rate: f64) -> Self {
        self.fail_rate = fail_rate.clamp(0.0, 1.0);
        self
    }

    pub fn add_player(&self, name: &str) -> SteamId {
        self.lock().join(name)
    }

    pub fn remove_player(&self, steam_id: SteamId) -> bool {
        let mut state = self.lock();
        let before = state.online.len();
        state.online.retain(|(id, _)| *id != steam_id);
        state.online.len() != before
    }

    pub fn push_chat(&self, line: impl Into<String>) {
        self.lock().chat.push_back(line.into());
    }

    /// A down server refuses connections and fails every send.
    pub fn set_down(&self, down: bool) {
        self.lock().down = down;
    }

    pub fn online_players(&self) -> Vec<(SteamId, String)> {
        self.lock().online.clone()
    }

    /// Every command text the server has answered, in order.
    pub fn received(&self) -> Vec<String> {
        self.lock().received.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn respond(&self, command: &str) -> Result<String, TransportError> {
        if roll(self.fail_rate) {
            return Err(TransportError::Protocol("connection reset by peer".to_string()));
        }

        let mut state = self.lock();
        if state.down {
            return Err(TransportError::NotConnected);
        }
        state.received.push(command.to_string());

        let parsed = ConsoleCommand::new(command);
        let args = parsed.args.as_deref().unwrap_or("").trim();

        let response = match parsed.verb {
            CommandVerb::ListPlayers => {
                if roll(self.churn) {
                    churn(&mut state);
                }
                list_players(&state.online)
            }
            CommandVerb::GetChat => {
                if state.chat.is_empty() {
                    no_response()
                } else {
                    let lines: Vec<String> = state.chat.drain(..).collect();
                    lines.join("\n")
                }
            }
            CommandVerb::ServerChat => {
                state.chat.push_back(format!("SERVER: {}", args));
                no_response()
            }
            CommandVerb::Broadcast => no_response(),
            CommandVerb::Other(ref other) if other.eq_ignore_ascii_case("saveworld") => {
                "World Saved".to_string()
            }
            CommandVerb::Other(_) => no_response(),
        };

        Ok(response)
    }
}

fn roll(probability: f64) -> bool {
    probability > 0.0 && rand::thread_rng().gen_bool(probability)
}

fn churn(state: &mut ServerState) {
    let mut rng = rand::thread_rng();
    let leave = !state.online.is_empty() && rng.gen_bool(0.5);

    if leave {
        let index = rng.gen_range(0..state.online.len());
        let (id, name) = state.online.remove(index);
        debug!("Simulated player {} ({}) left", name, id);
    } else if let Some(name) = NAMES.choose(&mut rng) {
        let id = state.join(name);
        debug!("Simulated player {} ({}) joined", name, id);
    }
}

fn list_players(online: &[(SteamId, String)]) -> String {
    if online.is_empty() {
        return "No Players Connected".to_string();
    }

    online
        .iter()
        .enumerate()
        .map(|(i, (id, name))| format!("{}. {}, {}", i, name, id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn no_response() -> String {
    format!("{} ", NO_RESPONSE_MATCH)
}

#[async_trait]
impl Connector for SimulatedServer {
    async fn connect(&self, params: &RconParameters) -> Result<Box<dyn Transport>, TransportError> {
        if self.lock().down {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{} refused the connection", params.endpoint()),
            )));
        }
        if params.admin_password != self.password {
            return Err(TransportError::Protocol("authentication failed".to_string()));
        }

        Ok(Box::new(SimConnection {
            server: self.clone(),
            open: true,
        }))
    }
}

struct SimConnection {
    server: SimulatedServer,
    open: bool,
}

#[async_trait]
impl Transport for SimConnection {
    async fn send(&mut self, command: &str) -> Result<String, TransportError> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        self.server.respond(command)
    }

    async fn close(&mut self) {
        self.open = false;
    }
}

/// Serves player details for everyone the simulated server has seen.
pub struct SimulatedSaves {
    server: SimulatedServer,
}

impl SimulatedSaves {
    pub fn new(server: SimulatedServer) -> Self {
        Self { server }
    }
}

#[async_trait]
impl PlayerDetailsSource for SimulatedSaves {
    async fn load_players(&self, save_path: &Path) -> Result<Vec<EnrichedPlayer>, EnrichmentError> {
        debug!("Loading simulated profiles from {}", save_path.display());
        let known = self.server.lock().known.clone();
        if known.is_empty() {
            return Err(EnrichmentError::Source("no profiles saved yet".to_string()));
        }

        let now = SystemTime::now();
        let records = known
            .into_iter()
            .map(|(id, name)| {
                let mut record = EnrichedPlayer::new(id.to_string(), name.clone())
                    .with_filename(format!("{}.arkprofile", id));
                record.character_name = Some(format!("{} the Survivor", name));
                record.file_created = Some(now);
                record.file_updated = Some(now);
                record.profile_url =
                    Some(format!("https://steamcommunity.com/profiles/{}", id));
                record
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::split_response;
    use tokio_test::{assert_err, assert_ok};

    fn params(password: &str) -> RconParameters {
        RconParameters::new("127.0.0.1", 32330, password)
    }

    async fn connect_error(server: &SimulatedServer, password: &str) -> TransportError {
        match server.connect(&params(password)).await {
            Err(e) => e,
            Ok(_) => panic!("connect with password {:?} should fail", password),
        }
    }

    #[tokio::test]
    async fn test_list_players_format() {
        let server = SimulatedServer::new("pw");
        let mut conn = assert_ok!(server.connect(&params("pw")).await);

        let empty = assert_ok!(conn.send("listplayers").await);
        assert_eq!(empty, "No Players Connected");

        let alice = server.add_player("Alice");
        let bob = server.add_player("Bob");
        let listed = assert_ok!(conn.send("ListPlayers").await);
        assert_eq!(
            split_response(&listed),
            vec![format!("0. Alice, {}", alice), format!("1. Bob, {}", bob)]
        );

        assert!(server.remove_player(alice));
        assert!(!server.remove_player(alice));
        assert_eq!(server.online_players(), vec![(bob, "Bob".to_string())]);
    }

    #[tokio::test]
    async fn test_chat_is_drained() {
        let server = SimulatedServer::new("pw");
        let mut conn = assert_ok!(server.connect(&params("pw")).await);

        server.push_chat("Alice: hi");
        assert_ok!(conn.send("serverchat welcome").await);

        let chat = assert_ok!(conn.send("getchat").await);
        assert_eq!(split_response(&chat), vec!["Alice: hi", "SERVER: welcome"]);

        let again = assert_ok!(conn.send("getchat").await);
        assert_eq!(split_response(&again), vec![shared::NO_RESPONSE_OUTPUT]);
    }

    #[tokio::test]
    async fn test_connect_checks_password_and_availability() {
        let server = SimulatedServer::new("pw");
        let err = connect_error(&server, "wrong").await;
        assert!(matches!(err, TransportError::Protocol(_)));

        server.set_down(true);
        let err = connect_error(&server, "pw").await;
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn test_closed_and_downed_connections_fail() {
        let server = SimulatedServer::new("pw");
        let mut conn = assert_ok!(server.connect(&params("pw")).await);

        server.set_down(true);
        assert_err!(conn.send("saveworld").await);
        server.set_down(false);
        assert_eq!(assert_ok!(conn.send("saveworld").await), "World Saved");

        conn.close().await;
        assert_err!(conn.send("saveworld").await);
        assert_eq!(server.received(), vec!["saveworld"]);
    }

    #[tokio::test]
    async fn test_full_fail_rate_fails_every_send() {
        let server = SimulatedServer::new("pw").with_fail_rate(1.0);
        let mut conn = assert_ok!(server.connect(&params("pw")).await);
        for _ in 0..5 {
            assert_err!(conn.send("listplayers").await);
        }
        assert!(server.received().is_empty());
    }

    #[tokio::test]
    async fn test_full_churn_changes_roster() {
        let server = SimulatedServer::new("pw").with_churn(1.0);
        let mut conn = assert_ok!(server.connect(&params("pw")).await);

        // With nobody online the only possible change is a join.
        assert_ok!(conn.send("listplayers").await);
        assert_eq!(server.online_players().len(), 1);
    }

    #[tokio::test]
    async fn test_saves_cover_everyone_seen() {
        let server = SimulatedServer::new("pw");
        let saves = SimulatedSaves::new(server.clone());
        let path = Path::new("/srv/ark/ShooterGame/Saved/SavedArks");

        assert_err!(saves.load_players(path).await);

        let alice = server.add_player("Alice");
        server.remove_player(alice);
        let records = assert_ok!(saves.load_players(path).await);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parsed_steam_id(), Some(alice));
        assert_eq!(records[0].filename_steam_id(), Some(alice));
        assert_eq!(records[0].character_name.as_deref(), Some("Alice the Survivor"));
    }
}

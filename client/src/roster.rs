//! Player roster reconciliation.
//!
//! The roster is the set of every player seen since the client started.
//! Each `listplayers` poll is diffed against it: newcomers and returning
//! players produce join messages, online players missing from the poll
//! produce leave messages. Entries are never removed.

use log::{debug, warn};
use shared::{parse_player_line, EnrichedPlayer, PlayerInfo, SteamId};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub fn join_message(name: &str) -> String {
    format!("Player '{}' joined the game.", name)
}

pub fn leave_message(name: &str) -> String {
    format!("Player '{}' left the game.", name)
}

/// Extracts the player entries of one poll, keeping the first occurrence of
/// each steam id. Lines that do not parse are skipped.
pub fn collect_candidates(lines: &[String]) -> Vec<(SteamId, String)> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for line in lines {
        match parse_player_line(line) {
            Ok(Some((steam_id, name))) => {
                if seen.insert(steam_id) {
                    candidates.push((steam_id, name));
                } else {
                    debug!("Ignoring duplicate roster entry for {}", steam_id);
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Skipping roster line: {}", e),
        }
    }

    candidates
}

/// Outcome of reconciling one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub messages: Vec<String>,
    /// True when player details should be refreshed after this poll.
    pub refresh_details: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    pub online: usize,
    pub total: usize,
    pub invalid: usize,
    pub max_players: u32,
}

/// Published copy of the roster for observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterView {
    pub players: Vec<PlayerInfo>,
    pub summary: RosterSummary,
}

#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<PlayerInfo>,
    index: HashMap<SteamId, usize>,
    online_count: usize,
    invalid_count: usize,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.online_count
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    pub fn get(&self, steam_id: SteamId) -> Option<&PlayerInfo> {
        self.index.get(&steam_id).map(|&i| &self.players[i])
    }

    /// Applies one poll's deduplicated candidates to the roster.
    pub fn reconcile(&mut self, candidates: &[(SteamId, String)]) -> Reconciliation {
        let was_empty = self.players.is_empty();
        let mut messages = Vec::new();

        for (steam_id, name) in candidates {
            match self.index.get(steam_id) {
                Some(&i) => {
                    // A live listing is authoritative for the name.
                    let player = &mut self.players[i];
                    if player.steam_name != *name {
                        player.steam_name = name.clone();
                    }
                    player.is_valid = true;
                    if !player.is_online {
                        player.is_online = true;
                        messages.push(join_message(name));
                    }
                }
                None => {
                    self.insert(PlayerInfo::new(*steam_id, name.clone()).online());
                    messages.push(join_message(name));
                }
            }
        }

        let present: HashSet<SteamId> = candidates.iter().map(|(id, _)| *id).collect();
        for player in self.players.iter_mut() {
            if player.is_online && !present.contains(&player.steam_id) {
                player.is_online = false;
                messages.push(leave_message(&player.steam_name));
            }
        }

        self.recount();

        Reconciliation {
            messages,
            refresh_details: was_empty || !candidates.is_empty(),
        }
    }

    /// Folds enrichment records into the roster and returns how many were
    /// applied. Records whose id cannot be resolved at all are skipped.
    pub fn merge_details(&mut self, records: Vec<EnrichedPlayer>) -> usize {
        let mut merged = 0;

        for record in records {
            let (steam_id, is_valid) = match record.parsed_steam_id() {
                Some(id) => (id, true),
                None => match record.filename_steam_id() {
                    Some(id) => (id, false),
                    None => {
                        warn!(
                            "Skipping player record with no usable id (file {:?})",
                            record.filename
                        );
                        continue;
                    }
                },
            };

            match self.index.get(&steam_id) {
                Some(&i) => {
                    let player = &mut self.players[i];
                    if player.steam_name.is_empty() {
                        player.steam_name = display_name(&record, is_valid);
                    }
                    player.details = Some(record);
                }
                None => {
                    let mut player = PlayerInfo::new(steam_id, display_name(&record, is_valid));
                    player.is_valid = is_valid;
                    player.details = Some(record);
                    self.insert(player);
                }
            }
            merged += 1;
        }

        self.recount();
        merged
    }

    /// Every entry, online players first, otherwise in the order first seen.
    pub fn snapshot(&self) -> Vec<PlayerInfo> {
        let mut players = self.players.clone();
        players.sort_by_key(|p| !p.is_online);
        players
    }

    pub fn summary(&self, max_players: u32) -> RosterSummary {
        RosterSummary {
            online: self.online_count,
            total: self.players.len(),
            invalid: self.invalid_count,
            max_players,
        }
    }

    pub fn view(&self, max_players: u32) -> RosterView {
        RosterView {
            players: self.snapshot(),
            summary: self.summary(max_players),
        }
    }

    fn insert(&mut self, player: PlayerInfo) {
        self.index.insert(player.steam_id, self.players.len());
        self.players.push(player);
    }

    fn recount(&mut self) {
        self.online_count = self.players.iter().filter(|p| p.is_online).count();
        self.invalid_count = self.players.iter().filter(|p| !p.is_valid).count();
    }
}

fn display_name(record: &EnrichedPlayer, is_valid: bool) -> String {
    if is_valid && !record.steam_name.trim().is_empty() {
        return record.steam_name.clone();
    }

    let file = Path::new(&record.filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&record.filename);
    format!("Invalid profile ({})", file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn poll(roster: &mut Roster, raw: &[&str]) -> Reconciliation {
        let candidates = collect_candidates(&lines(raw));
        roster.reconcile(&candidates)
    }

    #[test]
    fn test_first_poll_adds_online_player() {
        let mut roster = Roster::new();
        let result = poll(&mut roster, &["1. Clan.Alice, 100"]);

        assert_eq!(result.messages, vec!["Player 'Alice' joined the game."]);
        assert!(result.refresh_details);

        let alice = roster.get(100).unwrap();
        assert_eq!(alice.steam_name, "Alice");
        assert!(alice.is_online);
        assert!(alice.is_valid);
        assert_eq!(roster.online_count(), 1);
    }

    #[test]
    fn test_empty_poll_marks_player_offline() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Clan.Alice, 100"]);
        let result = poll(&mut roster, &[]);

        assert_eq!(result.messages, vec!["Player 'Alice' left the game."]);
        assert!(!result.refresh_details);
        assert_eq!(roster.len(), 1);
        assert!(!roster.get(100).unwrap().is_online);
        assert_eq!(roster.online_count(), 0);
    }

    #[test]
    fn test_consecutive_polls_produce_no_events() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100", "2. Bob, 200"]);
        let result = poll(&mut roster, &["1. Bob, 200", "2. Alice, 100"]);

        assert!(result.messages.is_empty());
        assert_eq!(roster.online_count(), 2);
    }

    #[test]
    fn test_absent_player_leaves_exactly_once() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100", "2. Bob, 200"]);

        let result = poll(&mut roster, &["1. Bob, 200"]);
        assert_eq!(result.messages, vec!["Player 'Alice' left the game."]);

        for _ in 0..5 {
            let result = poll(&mut roster, &["1. Bob, 200"]);
            assert!(result.messages.is_empty());
        }
        assert!(!roster.get(100).unwrap().is_online);
    }

    #[test]
    fn test_returning_player_rejoins() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100"]);
        poll(&mut roster, &[]);
        let result = poll(&mut roster, &["1. Alice, 100"]);

        assert_eq!(result.messages, vec!["Player 'Alice' joined the game."]);
        assert_eq!(roster.len(), 1);
        assert!(roster.get(100).unwrap().is_online);
    }

    #[test]
    fn test_duplicate_lines_keep_first_occurrence() {
        let candidates = collect_candidates(&lines(&["1. X.A,1", "2. Y.B,1", "3. C, 2"]));
        assert_eq!(candidates, vec![(1, "A".to_string()), (2, "C".to_string())]);

        let mut roster = Roster::new();
        let result = roster.reconcile(&candidates);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(1).unwrap().steam_name, "A");
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let candidates = collect_candidates(&lines(&[
            "NO_RESPONSE",
            "1. Alice, not-a-number",
            "2. Bob, 200",
        ]));
        assert_eq!(candidates, vec![(200, "Bob".to_string())]);
    }

    #[test]
    fn test_joins_reported_before_leaves() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100"]);
        let result = poll(&mut roster, &["1. Bob, 200"]);

        assert_eq!(
            result.messages,
            vec![
                "Player 'Bob' joined the game.",
                "Player 'Alice' left the game."
            ]
        );
    }

    #[test]
    fn test_empty_roster_requests_refresh() {
        let mut roster = Roster::new();
        let result = roster.reconcile(&[]);
        assert!(result.messages.is_empty());
        assert!(result.refresh_details);
    }

    #[test]
    fn test_merge_details_updates_and_adds() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100"]);

        let merged = roster.merge_details(vec![
            EnrichedPlayer::new("100", "Alice").with_filename("100.arkprofile"),
            EnrichedPlayer::new("300", "Carol").with_filename("300.arkprofile"),
        ]);

        assert_eq!(merged, 2);
        assert_eq!(roster.len(), 2);
        assert!(roster.get(100).unwrap().details.is_some());

        let carol = roster.get(300).unwrap();
        assert_eq!(carol.steam_name, "Carol");
        assert!(carol.is_valid);
        assert!(!carol.is_online);
        assert_eq!(roster.online_count(), 1);
        assert_eq!(roster.invalid_count(), 0);
    }

    #[test]
    fn test_merge_details_falls_back_to_filename() {
        let mut roster = Roster::new();
        let merged = roster.merge_details(vec![
            EnrichedPlayer::new("garbage", "").with_filename("saves/400.arkprofile"),
            EnrichedPlayer::new("", "").with_filename("corrupt.arkprofile"),
        ]);

        assert_eq!(merged, 1);
        assert_eq!(roster.len(), 1);

        let entry = roster.get(400).unwrap();
        assert!(!entry.is_valid);
        assert_eq!(entry.steam_name, "Invalid profile (400.arkprofile)");
        assert_eq!(roster.invalid_count(), 1);
    }

    #[test]
    fn test_placeholder_profile_takes_polled_name() {
        let mut roster = Roster::new();
        roster.merge_details(vec![
            EnrichedPlayer::new("garbage", "").with_filename("400.arkprofile")
        ]);
        assert_eq!(roster.invalid_count(), 1);

        let result = poll(&mut roster, &["1. Bob, 400"]);
        assert_eq!(result.messages, vec!["Player 'Bob' joined the game."]);

        let bob = roster.get(400).unwrap();
        assert_eq!(bob.steam_name, "Bob");
        assert!(bob.is_valid);
        assert!(bob.is_online);
        assert!(bob.details.is_some());
        assert_eq!(roster.invalid_count(), 0);

        // A later refresh with the same broken record leaves the entry alone.
        roster.merge_details(vec![
            EnrichedPlayer::new("garbage", "").with_filename("400.arkprofile")
        ]);
        assert_eq!(roster.get(400).unwrap().steam_name, "Bob");
        assert!(roster.get(400).unwrap().is_valid);
    }

    #[test]
    fn test_renamed_player_is_updated_in_place() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100"]);
        let result = poll(&mut roster, &["1. Tribe.Alicia, 100"]);

        assert!(result.messages.is_empty());
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(100).unwrap().steam_name, "Alicia");

        let result = poll(&mut roster, &[]);
        assert_eq!(result.messages, vec!["Player 'Alicia' left the game."]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut roster = Roster::new();
        let records = vec![EnrichedPlayer::new("500", "Dan")];
        roster.merge_details(records.clone());
        roster.merge_details(records);

        assert_eq!(roster.len(), 1);
        poll(&mut roster, &["1. Dan, 500"]);
        assert_eq!(roster.len(), 1);
        assert!(roster.get(500).unwrap().is_online);
    }

    #[test]
    fn test_snapshot_lists_online_first() {
        let mut roster = Roster::new();
        poll(&mut roster, &["1. Alice, 100", "2. Bob, 200", "3. Carol, 300"]);
        poll(&mut roster, &["1. Carol, 300"]);

        let ids: Vec<SteamId> = roster.snapshot().iter().map(|p| p.steam_id).collect();
        assert_eq!(ids, vec![300, 100, 200]);

        let summary = roster.summary(70);
        assert_eq!(
            summary,
            RosterSummary {
                online: 1,
                total: 3,
                invalid: 0,
                max_players: 70
            }
        );
    }
}

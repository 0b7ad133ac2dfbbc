use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

pub type SteamId = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed player line: {0:?}")]
    MalformedLine(String),
    #[error("invalid steam id {id:?} in line {line:?}")]
    InvalidSteamId { id: String, line: String },
}

/// A roster entry. Keyed by `steam_id`; never removed, only marked offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub steam_id: SteamId,
    pub steam_name: String,
    pub is_online: bool,
    pub is_valid: bool,
    pub details: Option<EnrichedPlayer>,
}

impl PlayerInfo {
    pub fn new(steam_id: SteamId, steam_name: impl Into<String>) -> Self {
        Self {
            steam_id,
            steam_name: steam_name.into(),
            is_online: false,
            is_valid: true,
            details: None,
        }
    }

    pub fn online(mut self) -> Self {
        self.is_online = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TribeInfo {
    pub id: i64,
    pub name: String,
    pub owner_id: Option<i64>,
}

/// Save-file/profile data for one player, produced by the enrichment source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPlayer {
    /// Raw id as stored in the save data; may be empty or garbage.
    pub steam_id: String,
    pub steam_name: String,
    pub character_name: Option<String>,
    pub filename: String,
    pub file_created: Option<SystemTime>,
    pub file_updated: Option<SystemTime>,
    pub profile_url: Option<String>,
    pub tribe: Option<TribeInfo>,
}

impl EnrichedPlayer {
    pub fn new(steam_id: impl Into<String>, steam_name: impl Into<String>) -> Self {
        Self {
            steam_id: steam_id.into(),
            steam_name: steam_name.into(),
            character_name: None,
            filename: String::new(),
            file_created: None,
            file_updated: None,
            profile_url: None,
            tribe: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn parsed_steam_id(&self) -> Option<SteamId> {
        self.steam_id.trim().parse().ok()
    }

    /// Falls back to the save file's stem, e.g. `76561198000000000.arkprofile`.
    pub fn filename_steam_id(&self) -> Option<SteamId> {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.trim().parse().ok())
    }
}

/// Parses one `listplayers` line of the form `<index>. <name>, <steamId>`.
///
/// Returns `Ok(None)` for lines that are not player entries at all (not
/// exactly two comma-separated fields) and `Err` for entries whose id does
/// not parse.
pub fn parse_player_line(line: &str) -> Result<Option<(SteamId, String)>, ParseError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 2 {
        return Ok(None);
    }

    let name_field = fields[0];
    let name = match name_field.rfind('.') {
        Some(pos) => &name_field[pos + 1..],
        None => name_field,
    }
    .trim();

    if name.is_empty() {
        return Err(ParseError::MalformedLine(line.to_string()));
    }

    let id = fields[1].trim();
    let steam_id = id.parse::<SteamId>().map_err(|_| ParseError::InvalidSteamId {
        id: id.to_string(),
        line: line.to_string(),
    })?;

    Ok(Some((steam_id, name.to_string())))
}

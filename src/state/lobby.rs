use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Roster entry as sent by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    /// Display name.
    pub name: String,
    /// Whether this participant created the game.
    #[serde(default)]
    pub is_host: bool,
}

/// Lobby-level facts about the session: game identity, roster, local participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    /// Game code, once created or joined.
    pub game_id: Option<String>,
    /// Participants keyed by connection id, in authority order.
    pub players: IndexMap<String, LobbyPlayer>,
    /// Name the local participant registered with.
    pub local_name: Option<String>,
    /// Whether the local participant hosts the game.
    pub is_host: bool,
    /// Whether the host has started the game.
    pub started: bool,
}

impl Lobby {
    /// The authority confirmed a game created by the local participant.
    pub fn game_created(&mut self, game_id: String) {
        self.game_id = Some(game_id);
        self.is_host = true;
    }

    /// Replace the roster with the authority's view.
    pub fn replace_roster(&mut self, players: IndexMap<String, LobbyPlayer>) {
        self.players = players;
    }

    /// Whether `name` is the local participant.
    pub fn is_local(&self, name: &str) -> bool {
        self.local_name.as_deref() == Some(name)
    }
}

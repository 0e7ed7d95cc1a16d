use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::state::vote::Selection;

const INTENT_CREATE_GAME: &str = "createGame";
const INTENT_JOIN_GAME: &str = "joinGame";
const INTENT_START_GAME: &str = "startGame";
const INTENT_START_ROUND: &str = "startRound";
const INTENT_SELECT_CATEGORY: &str = "selectCategory";
const INTENT_SUBMIT_VOTE: &str = "submitVote";

/// Request to host a new game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGame {
    /// Host display name.
    #[validate(length(min = 1, max = 24))]
    pub player_name: String,
    /// Number of rounds to play.
    #[validate(range(min = 1, max = 20))]
    pub num_rounds: u32,
}

/// Request to join an existing game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinGame {
    /// Game code.
    #[validate(length(min = 1))]
    pub game_id: String,
    /// Participant display name.
    #[validate(length(min = 1, max = 24))]
    pub player_name: String,
}

/// Payload carrying only the game code (`startGame`, `startRound`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    /// Game code.
    #[validate(length(min = 1))]
    pub game_id: String,
}

/// Request to reserve a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectCategory {
    /// Game code.
    pub game_id: String,
    /// Category label.
    pub category: String,
}

/// Vote of the local participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVote {
    /// Picked answer.
    pub vote: Selection,
    /// Displayed countdown when the vote was cast.
    pub time_remaining: u32,
}

/// Outbound intent sent to the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `createGame`
    CreateGame(CreateGame),
    /// `joinGame`
    JoinGame(JoinGame),
    /// `startGame`
    StartGame(GameRef),
    /// `startRound`
    StartRound(GameRef),
    /// `selectCategory`
    SelectCategory(SelectCategory),
    /// `submitVote`
    SubmitVote(SubmitVote),
}

impl Intent {
    /// Wire name of the intent.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGame(_) => INTENT_CREATE_GAME,
            Self::JoinGame(_) => INTENT_JOIN_GAME,
            Self::StartGame(_) => INTENT_START_GAME,
            Self::StartRound(_) => INTENT_START_ROUND,
            Self::SelectCategory(_) => INTENT_SELECT_CATEGORY,
            Self::SubmitVote(_) => INTENT_SUBMIT_VOTE,
        }
    }

    /// JSON payload of the intent.
    pub fn payload(&self) -> serde_json::Result<Value> {
        match self {
            Self::CreateGame(body) => serde_json::to_value(body),
            Self::JoinGame(body) => serde_json::to_value(body),
            Self::StartGame(body) | Self::StartRound(body) => serde_json::to_value(body),
            Self::SelectCategory(body) => serde_json::to_value(body),
            Self::SubmitVote(body) => serde_json::to_value(body),
        }
    }
}

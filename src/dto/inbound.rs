use indexmap::IndexMap;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::ProtocolError,
    state::{
        categories::CategoryClaim,
        lobby::LobbyPlayer,
        round::{FinalScore, GameResult, ParticipantScore, Round, RoundResult},
        vote::Selection,
    },
};

/// Wire name of the `newCategory` event.
pub const EVENT_NEW_CATEGORY: &str = "newCategory";
/// Wire name of the `categoryCountdown` event.
pub const EVENT_CATEGORY_COUNTDOWN: &str = "categoryCountdown";
/// Wire name of the `categorySelected` event.
pub const EVENT_CATEGORY_SELECTED: &str = "categorySelected";
/// Wire name of the `newRound` event.
pub const EVENT_NEW_ROUND: &str = "newRound";
/// Wire name of the `countdown` event.
pub const EVENT_COUNTDOWN: &str = "countdown";
/// Wire name of the `roundResults` event.
pub const EVENT_ROUND_RESULTS: &str = "roundResults";
/// Wire name of the `next-round-countdown` event.
pub const EVENT_NEXT_ROUND_COUNTDOWN: &str = "next-round-countdown";
/// Wire name of the `gameOver` event.
pub const EVENT_GAME_OVER: &str = "gameOver";
/// Wire name of the `updatePlayers` event.
pub const EVENT_UPDATE_PLAYERS: &str = "updatePlayers";
/// Wire name of the `gameJoined` event.
pub const EVENT_GAME_JOINED: &str = "gameJoined";
/// Wire name of the `gameCreated` event.
pub const EVENT_GAME_CREATED: &str = "gameCreated";
/// Wire name of the `gameStarted` event.
pub const EVENT_GAME_STARTED: &str = "gameStarted";

/// Every event name a session subscribes to.
pub const INBOUND_EVENTS: [&str; 12] = [
    EVENT_NEW_CATEGORY,
    EVENT_CATEGORY_COUNTDOWN,
    EVENT_CATEGORY_SELECTED,
    EVENT_NEW_ROUND,
    EVENT_COUNTDOWN,
    EVENT_ROUND_RESULTS,
    EVENT_NEXT_ROUND_COUNTDOWN,
    EVENT_GAME_OVER,
    EVENT_UPDATE_PLAYERS,
    EVENT_GAME_JOINED,
    EVENT_GAME_CREATED,
    EVENT_GAME_STARTED,
];

/// Decoded authority event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A category is announced for the upcoming round.
    NewCategory {
        /// Announced category text.
        category: String,
    },
    /// Category announcement tick.
    CategoryCountdown {
        /// Seconds left.
        seconds: u32,
    },
    /// One category was reserved.
    CategorySelected(CategoryClaim),
    /// A new question starts.
    NewRound(Round),
    /// Question countdown tick.
    Countdown {
        /// Seconds left.
        seconds: u32,
    },
    /// The current round closed.
    RoundResults(RoundResult),
    /// Tick of the pause between rounds.
    NextRoundCountdown {
        /// Seconds left.
        seconds: u32,
    },
    /// Final standings.
    GameOver(GameResult),
    /// Roster update, optionally with the full claim table.
    UpdatePlayers {
        /// Roster keyed by connection id.
        players: IndexMap<String, LobbyPlayer>,
        /// Full claim table, when included.
        selected_categories: Option<Vec<CategoryClaim>>,
    },
    /// Initial lobby snapshot after joining.
    GameJoined {
        /// Game code, when included.
        game_id: Option<String>,
        /// Roster keyed by connection id.
        players: IndexMap<String, LobbyPlayer>,
        /// Full claim table.
        selected_categories: Vec<CategoryClaim>,
    },
    /// The authority created the game requested by the local participant.
    GameCreated {
        /// Game code.
        game_id: String,
        /// Host display name.
        host_name: String,
    },
    /// The host started the game.
    GameStarted,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SecondsPayload {
    Bare(u32),
    Wrapped { seconds: u32 },
}

impl From<SecondsPayload> for u32 {
    fn from(value: SecondsPayload) -> Self {
        match value {
            SecondsPayload::Bare(seconds) | SecondsPayload::Wrapped { seconds } => seconds,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NewCategoryPayload {
    Bare(String),
    Wrapped { category: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewRoundPayload {
    round_index: u32,
    #[serde(alias = "fact", alias = "question")]
    prompt: String,
    #[serde(default)]
    options: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoundResultsPayload {
    correct_answer: Selection,
    results: Vec<ParticipantScore>,
}

#[derive(Deserialize)]
struct GameOverPayload {
    results: Vec<FinalScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePlayersPayload {
    players: IndexMap<String, LobbyPlayer>,
    #[serde(default)]
    selected_categories: Option<Vec<CategoryClaim>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameJoinedPayload {
    #[serde(default)]
    game_id: Option<String>,
    players: IndexMap<String, LobbyPlayer>,
    #[serde(default)]
    selected_categories: Vec<CategoryClaim>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameCreatedPayload {
    game_id: String,
    #[serde(default)]
    host_name: String,
}

impl InboundEvent {
    /// Decode the payload of the event called `event`.
    pub fn parse(event: &str, payload: Value) -> Result<Self, ProtocolError> {
        let parsed = match event {
            EVENT_NEW_CATEGORY => {
                let category = match decode::<NewCategoryPayload>(event, payload)? {
                    NewCategoryPayload::Bare(category)
                    | NewCategoryPayload::Wrapped { category } => category,
                };
                Self::NewCategory { category }
            }
            EVENT_CATEGORY_COUNTDOWN => Self::CategoryCountdown {
                seconds: decode::<SecondsPayload>(event, payload)?.into(),
            },
            EVENT_CATEGORY_SELECTED => Self::CategorySelected(decode(event, payload)?),
            EVENT_NEW_ROUND => {
                let NewRoundPayload {
                    round_index,
                    prompt,
                    options,
                } = decode(event, payload)?;
                Self::NewRound(Round::new(round_index, prompt, options))
            }
            EVENT_COUNTDOWN => Self::Countdown {
                seconds: decode::<SecondsPayload>(event, payload)?.into(),
            },
            EVENT_ROUND_RESULTS => {
                let RoundResultsPayload {
                    correct_answer,
                    results,
                } = decode(event, payload)?;
                Self::RoundResults(RoundResult {
                    correct: correct_answer,
                    results,
                })
            }
            EVENT_NEXT_ROUND_COUNTDOWN => Self::NextRoundCountdown {
                seconds: decode::<SecondsPayload>(event, payload)?.into(),
            },
            EVENT_GAME_OVER => {
                let GameOverPayload { results } = decode(event, payload)?;
                Self::GameOver(GameResult { entries: results })
            }
            EVENT_UPDATE_PLAYERS => {
                let UpdatePlayersPayload {
                    players,
                    selected_categories,
                } = decode(event, payload)?;
                Self::UpdatePlayers {
                    players,
                    selected_categories,
                }
            }
            EVENT_GAME_JOINED => {
                let GameJoinedPayload {
                    game_id,
                    players,
                    selected_categories,
                } = decode(event, payload)?;
                Self::GameJoined {
                    game_id,
                    players,
                    selected_categories,
                }
            }
            EVENT_GAME_CREATED => {
                let GameCreatedPayload { game_id, host_name } = decode(event, payload)?;
                Self::GameCreated { game_id, host_name }
            }
            EVENT_GAME_STARTED => Self::GameStarted,
            other => return Err(ProtocolError::UnknownEvent(other.into())),
        };

        Ok(parsed)
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewCategory { .. } => EVENT_NEW_CATEGORY,
            Self::CategoryCountdown { .. } => EVENT_CATEGORY_COUNTDOWN,
            Self::CategorySelected(_) => EVENT_CATEGORY_SELECTED,
            Self::NewRound(_) => EVENT_NEW_ROUND,
            Self::Countdown { .. } => EVENT_COUNTDOWN,
            Self::RoundResults(_) => EVENT_ROUND_RESULTS,
            Self::NextRoundCountdown { .. } => EVENT_NEXT_ROUND_COUNTDOWN,
            Self::GameOver(_) => EVENT_GAME_OVER,
            Self::UpdatePlayers { .. } => EVENT_UPDATE_PLAYERS,
            Self::GameJoined { .. } => EVENT_GAME_JOINED,
            Self::GameCreated { .. } => EVENT_GAME_CREATED,
            Self::GameStarted => EVENT_GAME_STARTED,
        }
    }
}

fn decode<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|err| ProtocolError::Malformed {
        event: event.into(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_round_accepts_the_fact_field() {
        let event = InboundEvent::parse(
            EVENT_NEW_ROUND,
            json!({ "roundIndex": 1, "fact": "Octopuses have three hearts." }),
        )
        .unwrap();

        match event {
            InboundEvent::NewRound(round) => {
                assert_eq!(round.index, 1);
                assert_eq!(round.prompt, "Octopuses have three hearts.");
                assert!(round.options.is_empty());
            }
            other => panic!("expected new round, got {other:?}"),
        }
    }

    #[test]
    fn missing_round_index_is_malformed() {
        let err = InboundEvent::parse(EVENT_NEW_ROUND, json!({ "fact": "x" })).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { ref event, .. } if event == EVENT_NEW_ROUND));
    }

    #[test]
    fn countdown_accepts_bare_and_wrapped_seconds() {
        assert_eq!(
            InboundEvent::parse(EVENT_COUNTDOWN, json!(7)).unwrap(),
            InboundEvent::Countdown { seconds: 7 }
        );
        assert_eq!(
            InboundEvent::parse(EVENT_NEXT_ROUND_COUNTDOWN, json!({ "seconds": 4 })).unwrap(),
            InboundEvent::NextRoundCountdown { seconds: 4 }
        );
        assert!(InboundEvent::parse(EVENT_COUNTDOWN, json!(-1)).is_err());
    }

    #[test]
    fn game_over_reads_score_alias() {
        let event = InboundEvent::parse(
            EVENT_GAME_OVER,
            json!({ "results": [
                { "playerId": "p1", "name": "Ada", "score": 30, "rank": 1 },
                { "playerId": "p2", "name": "Bob", "score": 10, "rank": 2 }
            ] }),
        )
        .unwrap();

        let InboundEvent::GameOver(result) = event else {
            panic!("expected game over");
        };
        assert_eq!(result.entries[0].points, 30);
        assert_eq!(result.entries[1].name, "Bob");
    }

    #[test]
    fn game_joined_defaults_to_no_claims() {
        let event = InboundEvent::parse(
            EVENT_GAME_JOINED,
            json!({ "players": { "s1": { "name": "Ada", "isHost": true } } }),
        )
        .unwrap();

        let InboundEvent::GameJoined {
            players,
            selected_categories,
            game_id,
        } = event
        else {
            panic!("expected game joined");
        };
        assert!(players["s1"].is_host);
        assert!(selected_categories.is_empty());
        assert!(game_id.is_none());
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = InboundEvent::parse("chat", json!({})).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownEvent("chat".into()));
    }
}

use serde::{Deserialize, Serialize};

use crate::state::vote::Selection;

/// Answer shape of a round, resolved once when the round arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundKind {
    /// True/false round without listed options.
    Binary,
    /// Multiple choice round.
    Choice {
        /// Number of answer options.
        options: usize,
    },
}

impl RoundKind {
    /// Whether `selection` is a legal answer for a round of this kind.
    pub fn accepts(&self, selection: Selection) -> bool {
        match (self, selection) {
            (RoundKind::Binary, Selection::Binary(_)) => true,
            (RoundKind::Choice { options }, Selection::Choice(index)) => index < *options,
            _ => false,
        }
    }
}

/// One question cycle as pushed by the authority.
///
/// A round is replaced wholesale by the next `newRound`, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Zero-based round index.
    pub index: u32,
    /// Prompt shown to participants.
    pub prompt: String,
    /// Ordered answer options, empty for binary rounds.
    pub options: Vec<String>,
    /// Answer shape derived from `options`.
    pub kind: RoundKind,
}

impl Round {
    /// Build a round and resolve its answer shape.
    pub fn new(index: u32, prompt: String, options: Vec<String>) -> Self {
        let kind = if options.is_empty() {
            RoundKind::Binary
        } else {
            RoundKind::Choice {
                options: options.len(),
            }
        };

        Self {
            index,
            prompt,
            options,
            kind,
        }
    }
}

/// Points a participant earned in the round that just closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantScore {
    /// Connection id of the participant.
    pub player_id: String,
    /// Display name of the participant.
    pub name: String,
    /// Points awarded this round.
    #[serde(default)]
    pub points: u64,
}

/// Outcome of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    /// Correct answer of the round.
    pub correct: Selection,
    /// Per-participant points in authority order.
    pub results: Vec<ParticipantScore>,
}

/// Final total of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    /// Display name.
    pub name: String,
    /// Total points over the game.
    #[serde(alias = "score")]
    pub points: u64,
}

/// Final standings as received, trusted to be sorted by points descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameResult {
    /// Entries in authority order.
    pub entries: Vec<FinalScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_make_a_binary_round() {
        let round = Round::new(0, "Honey never spoils.".into(), Vec::new());
        assert_eq!(round.kind, RoundKind::Binary);
        assert!(round.kind.accepts(Selection::Binary(false)));
        assert!(!round.kind.accepts(Selection::Choice(0)));
    }

    #[test]
    fn choice_round_bounds_the_option_index() {
        let round = Round::new(2, "Pick one".into(), vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(round.kind, RoundKind::Choice { options: 3 });
        assert!(round.kind.accepts(Selection::Choice(2)));
        assert!(!round.kind.accepts(Selection::Choice(3)));
        assert!(!round.kind.accepts(Selection::Binary(true)));
    }
}

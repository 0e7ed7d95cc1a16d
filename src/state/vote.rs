use serde::{Deserialize, Serialize};

use crate::{
    error::VoteError,
    state::round::{Round, RoundKind},
};

/// Answer picked by a participant, or announced as correct by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    /// Fact (`true`) or fiction (`false`).
    Binary(bool),
    /// Index into the round's answer options.
    Choice(usize),
}

/// The local participant's vote for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Round the vote belongs to.
    pub round_index: u32,
    /// Picked answer.
    pub selection: Selection,
    /// Displayed countdown value when the vote was cast.
    pub time_remaining: u32,
}

/// Single-use gate guarding the vote of one round.
///
/// A new gate is created for every `newRound`; there is no way to reopen one.
#[derive(Debug, Clone)]
pub struct VoteGate {
    round_index: u32,
    kind: RoundKind,
    vote: Option<Vote>,
}

impl VoteGate {
    /// Open a gate for `round`.
    pub fn new(round: &Round) -> Self {
        Self {
            round_index: round.index,
            kind: round.kind,
            vote: None,
        }
    }

    /// Record the vote. Succeeds once; later calls fail with [`VoteError::AlreadyVoted`].
    pub fn cast(&mut self, selection: Selection, time_remaining: u32) -> Result<&Vote, VoteError> {
        if self.vote.is_some() {
            return Err(VoteError::AlreadyVoted {
                round_index: self.round_index,
            });
        }

        if !self.kind.accepts(selection) {
            return Err(VoteError::InvalidSelection {
                round_index: self.round_index,
            });
        }

        Ok(&*self.vote.insert(Vote {
            round_index: self.round_index,
            selection,
            time_remaining,
        }))
    }

    /// Vote recorded by this gate, if any.
    pub fn vote(&self) -> Option<&Vote> {
        self.vote.as_ref()
    }

    /// Whether the gate has been used.
    pub fn has_voted(&self) -> bool {
        self.vote.is_some()
    }

    /// Round this gate belongs to.
    pub fn round_index(&self) -> u32 {
        self.round_index
    }
}

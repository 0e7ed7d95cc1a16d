use thiserror::Error;
use validator::ValidationErrors;

use crate::state::stage_machine::Stage;

/// Inbound event that cannot be applied to the stage machine.
///
/// The event is dropped and the machine state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The event name is not part of the authority protocol.
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    /// The payload is missing a required field or has the wrong shape.
    #[error("malformed `{event}` payload: {reason}")]
    Malformed {
        /// Name of the offending event.
        event: String,
        /// Decoder message describing the problem.
        reason: String,
    },
    /// The payload is well formed but contradicts the current round.
    #[error("`{event}` does not fit the current round: {reason}")]
    Inconsistent {
        /// Name of the offending event.
        event: String,
        /// Why the payload was rejected.
        reason: String,
    },
}

/// Local precondition violations of a vote attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    /// A vote has already been cast for this round.
    #[error("a vote was already cast for round {round_index}")]
    AlreadyVoted {
        /// Zero-based index of the round that already holds a vote.
        round_index: u32,
    },
    /// Votes are only accepted while a question is displayed.
    #[error("votes are not accepted while in {stage:?}")]
    WrongStage {
        /// Stage the machine was in when the vote was attempted.
        stage: Stage,
    },
    /// The selection does not match the answer options of the round.
    #[error("selection does not match the answer options of round {round_index}")]
    InvalidSelection {
        /// Zero-based index of the current round.
        round_index: u32,
    },
}

/// Local precondition violations of a category pick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    /// Category is unknown, already claimed, already in play, or picks are closed.
    #[error("category `{label}` is not available")]
    CategoryUnavailable {
        /// Label the participant tried to claim.
        label: String,
    },
    /// The local participant already holds another category.
    #[error("a different category (`{held}`) is already claimed")]
    AlreadyClaimed {
        /// Label currently held by the local participant.
        held: String,
    },
}

/// Failures while handing an outbound intent to the event channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No live channel is attached; the intent is dropped.
    #[error("no live channel")]
    ChannelUnavailable,
    /// The channel exists but no longer accepts messages.
    #[error("channel closed")]
    Closed,
    /// The intent payload could not be encoded.
    #[error("failed to encode payload")]
    Encode(#[from] serde_json::Error),
}

/// Lobby intents rejected before reaching the channel.
#[derive(Debug, Error)]
pub enum IntentError {
    /// Payload failed field validation.
    #[error("invalid intent: {0}")]
    Invalid(#[from] ValidationErrors),
    /// No game id is known yet.
    #[error("no game has been created or joined")]
    NoGame,
    /// Only the host may start the game.
    #[error("only the host can start the game")]
    NotHost,
}

/// Errors surfaced by the session handle to its presentation layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Vote was rejected locally.
    #[error(transparent)]
    Vote(#[from] VoteError),
    /// Category pick was rejected locally.
    #[error(transparent)]
    Category(#[from] CategoryError),
    /// Lobby intent was rejected locally.
    #[error(transparent)]
    Intent(#[from] IntentError),
    /// The session task has stopped.
    #[error("session closed")]
    Closed,
}

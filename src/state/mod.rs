//! Client-side game state: the stage machine and the value types it projects.

pub mod categories;
pub mod countdown;
pub mod lobby;
pub mod ranking;
pub mod round;
pub mod stage_machine;
pub mod vote;

pub use self::stage_machine::{Snapshot, Stage, StageMachine};

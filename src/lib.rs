//! Participant-side presentation state for a fact-or-fiction trivia game.
//!
//! The authority pushes named events over an [`channel::EventChannel`]; a
//! [`services::session::Session`] applies them to a
//! [`state::StageMachine`] and publishes display snapshots, gating local
//! votes and category picks before they are sent back.

pub mod channel;
pub mod config;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;

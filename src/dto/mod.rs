//! Wire payloads exchanged with the authority.

pub mod inbound;
pub mod outbound;

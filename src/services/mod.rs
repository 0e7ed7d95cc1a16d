/// Post-vote icon shuffle effect.
pub mod rummage;
/// Actor owning the stage machine and its channel subscriptions.
pub mod session;

// Engagement: likes, reposts, views and comments on a single feed item,
// applied optimistically and rolled back when the backend rejects them.

pub mod action;
pub mod commands;
pub mod controller;
pub mod optimistic;

pub use action::{EngagementAction, EngagementKind, FlagState};
pub use commands::CounterRollback;
pub use controller::EngagementController;
pub use optimistic::Outcome;

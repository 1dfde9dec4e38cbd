//! Matchmaking: single waiting slot and room lifecycle

pub mod service;
pub mod store;

pub use service::{MatchmakingService, QueueStatus};
pub use store::{InMemoryStore, MatchStore};

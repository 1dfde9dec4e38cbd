//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::matchmaking::{InMemoryStore, MatchmakingService};
use crate::session::{ConnectionRegistry, CoordinatorHandle, CoordinatorTask};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub coordinator: CoordinatorHandle,
}

impl AppState {
    /// Build the state plus the coordinator task the caller must spawn
    pub fn new(config: Config) -> (Self, CoordinatorTask<InMemoryStore>) {
        let config = Arc::new(config);

        // Initialize connection registry
        let registry = Arc::new(ConnectionRegistry::new());

        // Initialize coordinator over an in-memory matchmaking store
        let (task, coordinator) = CoordinatorTask::new(MatchmakingService::in_memory(), registry.clone());

        let state = Self {
            config,
            registry,
            coordinator,
        };

        (state, task)
    }
}

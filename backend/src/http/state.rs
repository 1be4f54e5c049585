//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::TopologyRepository;
use crate::services::EngineOptions;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn TopologyRepository>,
    /// Engine tunables applied to every request
    pub options: EngineOptions,
}

impl AppState {
    /// Create a new application state with default engine options.
    pub fn new(repository: Arc<dyn TopologyRepository>) -> Self {
        Self {
            repository,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
}

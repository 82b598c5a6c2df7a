//! Server state shared by all handlers.

use std::sync::Arc;

use crate::{
    domain::ChatRepository, infrastructure::broadcast::GroupBroadcaster,
    usecase::RoomCoordinator,
};

/// Shared application state
pub struct AppState {
    /// Room logic shared by every room connection
    pub coordinator: Arc<RoomCoordinator>,
}

impl AppState {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self {
            coordinator: Arc::new(RoomCoordinator::new(repository, GroupBroadcaster::new())),
        }
    }

    pub fn broadcaster(&self) -> &GroupBroadcaster {
        self.coordinator.broadcaster()
    }
}

use std::sync::Arc;
use tracing::{info, warn};

use super::registry::RoomRegistry;
use super::snapshot::SnapshotProvider;
use crate::error::SyncError;
use crate::models::{ProjectEventRequest, ServerEvent};

/// Handle given to collaborators outside the socket layer (the file
/// management API) for pushing file lifecycle events into a project room.
#[derive(Clone)]
pub struct ProjectNotifier {
    registry: Arc<RoomRegistry>,
    snapshots: SnapshotProvider,
}

impl ProjectNotifier {
    pub fn new(registry: Arc<RoomRegistry>, snapshots: SnapshotProvider) -> Self {
        Self { registry, snapshots }
    }

    /// Forward `request` to every connection in `project_id`.
    ///
    /// Updates and deletions evict the cached snapshot of the named file
    /// first, so a snapshot requested after the notification is fresh.
    pub async fn publish(&self, project_id: &str, request: ProjectEventRequest) -> Result<usize, SyncError> {
        let name = request.event.clone();
        let file_id = request.file_id();
        let event = request
            .into_server_event()
            .ok_or_else(|| SyncError::validation(format!("Unsupported project event '{}'", name)))?;

        if matches!(event, ServerEvent::FileUpdated(_) | ServerEvent::FileDeleted(_)) {
            match &file_id {
                Some(file_id) => self.snapshots.invalidate(project_id, file_id).await,
                None => warn!("'{}' for project {} names no file; cache left as is", name, project_id),
            }
        }

        let delivered = self.registry.broadcast_project(project_id, event);
        info!("Published '{}' to project {} ({} connections)", name, project_id, delivered);
        Ok(delivered)
    }
}

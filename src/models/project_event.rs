use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::ServerEvent;

/// Project-level notification published by the file management service.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ProjectEventRequest {
    /// One of `file:created`, `file:updated`, `file:deleted`
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ProjectEventRequest {
    /// Map the request onto the event forwarded to the project room.
    pub fn into_server_event(self) -> Option<ServerEvent> {
        match self.event.as_str() {
            "file:created" => Some(ServerEvent::FileCreated(self.data)),
            "file:updated" => Some(ServerEvent::FileUpdated(self.data)),
            "file:deleted" => Some(ServerEvent::FileDeleted(self.data)),
            _ => None,
        }
    }

    /// File id named by the payload, as `fileId` or as the `_id` of a nested `file`.
    pub fn file_id(&self) -> Option<String> {
        self.data
            .get("fileId")
            .or_else(|| self.data.get("file").and_then(|f| f.get("_id")))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Response for a published project event
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ProjectEventResponse {
    pub event: String,
    pub delivered: usize,
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

use super::Operation;

/// Raw frame as it arrives on the socket: an event name plus its payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

// Client -> server payloads. Every field is optional on the wire so that a
// missing field becomes a validation error instead of a decode failure.

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub project_id: Option<String>,
    pub file_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpsPayload {
    pub project_id: Option<String>,
    pub file_id: Option<String>,
    pub operations: Option<Vec<Operation>>,
    pub user_id: Option<String>,
    pub timestamp: Option<i64>,
    pub session_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequestPayload {
    pub project_id: Option<String>,
    pub file_id: Option<String>,
}

/// Events a client sends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "doc:join")]
    Join(JoinPayload),
    #[serde(rename = "doc:leave")]
    Leave,
    #[serde(rename = "doc:ops")]
    Ops(OpsPayload),
    #[serde(rename = "doc:requestSnapshot")]
    RequestSnapshot(SnapshotRequestPayload),
    #[serde(rename = "ping")]
    Ping,
}

// Server -> client payloads.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserJoined {
    pub user_id: String,
    pub file_id: String,
    pub project_id: String,
    pub user_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    pub user_id: String,
    pub file_id: String,
    pub project_id: String,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpsReceived {
    pub operations: Vec<Operation>,
    pub user_id: String,
    pub file_id: String,
    pub project_id: String,
    /// Sender's logical send time, or the server time when the sender gave none.
    pub timestamp: i64,
    pub session_id: Option<String>,
    /// Server receive time in milliseconds since the epoch.
    pub received_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub file_id: String,
    pub project_id: String,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongPayload {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub message: String,
}

/// Events the server sends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "user:joined")]
    UserJoined(UserJoined),
    #[serde(rename = "user:left")]
    UserLeft(UserLeft),
    #[serde(rename = "doc:ops:received")]
    OpsReceived(OpsReceived),
    #[serde(rename = "doc:snapshot")]
    Snapshot(SnapshotPayload),
    #[serde(rename = "file:created")]
    FileCreated(Value),
    #[serde(rename = "file:updated")]
    FileUpdated(Value),
    #[serde(rename = "file:deleted")]
    FileDeleted(Value),
    #[serde(rename = "pong")]
    Pong(PongPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorPayload { message: message.into() })
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::UserJoined(_) => "user:joined",
            ServerEvent::UserLeft(_) => "user:left",
            ServerEvent::OpsReceived(_) => "doc:ops:received",
            ServerEvent::Snapshot(_) => "doc:snapshot",
            ServerEvent::FileCreated(_) => "file:created",
            ServerEvent::FileUpdated(_) => "file:updated",
            ServerEvent::FileDeleted(_) => "file:deleted",
            ServerEvent::Pong(_) => "pong",
            ServerEvent::Error(_) => "error",
        }
    }
}

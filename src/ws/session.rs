use std::fmt;
use uuid::Uuid;

/// Opaque id assigned to a connection when it is accepted.
pub type ConnectionId = Uuid;

/// A file room: every connection editing the same file of the same project.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub project_id: String,
    pub file_id: String,
}

impl RoomKey {
    pub fn new(project_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            file_id: file_id.into(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project-{}-file-{}", self.project_id, self.file_id)
    }
}

/// Per-connection session, owned by the task serving the connection.
///
/// A connection is in at most one file room at a time. `user_id` keeps the
/// last known identity after a leave so departure events can name it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionState {
    pub connection_id: ConnectionId,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub room: Option<RoomKey>,
}

impl ConnectionState {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            user_id: None,
            user_name: None,
            room: None,
        }
    }

    pub fn is_joined(&self) -> bool {
        self.room.is_some()
    }

    pub fn joined(&self, user_id: String, user_name: Option<String>, room: RoomKey) -> Self {
        Self {
            connection_id: self.connection_id,
            user_id: Some(user_id),
            user_name,
            room: Some(room),
        }
    }

    pub fn left(&self) -> Self {
        Self {
            room: None,
            ..self.clone()
        }
    }
}

//! Error taxonomy of the synchronization core.
//!
//! None of these errors closes a connection. They are turned into an
//! `error` event sent to the originating connection only.

use thiserror::Error;
use tracing::error;

use crate::models::ServerEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A request is missing required fields or does not fit the session.
    #[error("{0}")]
    Validation(String),

    /// The requested document does not exist in the requested project.
    #[error("{0}")]
    NotFound(String),

    /// Anything unexpected, e.g. the document store being unreachable.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SyncError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SyncError::Internal(message.into())
    }

    /// Text that may be shown to the client. Internal detail never leaves the server.
    pub fn client_message(&self) -> String {
        match self {
            SyncError::Validation(msg) | SyncError::NotFound(msg) => msg.clone(),
            SyncError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Log if needed and build the `error` event for the caller.
    pub fn into_event(self) -> ServerEvent {
        if let SyncError::Internal(detail) = &self {
            error!("Internal error while handling request: {}", detail);
        }
        ServerEvent::error(self.client_message())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {file_id} not found in project {project_id}")]
    NotFound { project_id: String, file_id: String },

    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode document: {0}")]
    Decode(String),
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => SyncError::not_found("File not found"),
            other => SyncError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = SyncError::internal("connection refused to 10.0.0.3:5432");
        assert_eq!(err.client_message(), "Internal server error");
        match err.into_event() {
            ServerEvent::Error(p) => assert!(!p.message.contains("10.0.0.3")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err: SyncError = StoreError::NotFound { project_id: "p".into(), file_id: "f".into() }.into();
        assert_eq!(err, SyncError::not_found("File not found"));
        let err: SyncError = StoreError::Unavailable("timeout".into()).into();
        assert!(matches!(err, SyncError::Internal(_)));
    }
}

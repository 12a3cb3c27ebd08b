use serde::{Deserialize, Serialize};

/// A document body as returned by the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub file_id: String,
    pub project_id: String,
    #[serde(default)]
    pub content: String,
}

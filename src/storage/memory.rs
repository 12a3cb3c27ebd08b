use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{DocumentStore, StoreFuture};
use crate::error::StoreError;
use crate::models::DocumentSnapshot;

/// Document store kept in process memory.
///
/// Used when no file service is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<(String, String), String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, project_id: &str, file_id: &str, content: &str) -> Self {
        self.put(project_id, file_id, content);
        self
    }

    /// Create or replace a document body.
    pub fn put(&self, project_id: &str, file_id: &str, content: &str) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((project_id.to_string(), file_id.to_string()), content.to_string());
    }

    pub fn remove(&self, project_id: &str, file_id: &str) -> Option<String> {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(project_id.to_string(), file_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get_document<'a>(&'a self, project_id: &'a str, file_id: &'a str) -> StoreFuture<'a, DocumentSnapshot> {
        Box::pin(async move {
            let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
            match docs.get(&(project_id.to_string(), file_id.to_string())) {
                Some(content) => Ok(DocumentSnapshot {
                    file_id: file_id.to_string(),
                    project_id: project_id.to_string(),
                    content: content.clone(),
                }),
                None => Err(StoreError::NotFound {
                    project_id: project_id.to_string(),
                    file_id: file_id.to_string(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_document_for_owning_project_only() {
        let store = MemoryDocumentStore::new().with_document("p1", "f1", "body");

        let doc = store.get_document("p1", "f1").await.unwrap();
        assert_eq!(doc.content, "body");

        let err = store.get_document("p2", "f1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn put_replaces_and_remove_deletes() {
        let store = MemoryDocumentStore::new();
        store.put("p", "f", "v1");
        store.put("p", "f", "v2");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_document("p", "f").await.unwrap().content, "v2");
        assert_eq!(store.remove("p", "f").as_deref(), Some("v2"));
        assert!(store.is_empty());
    }
}

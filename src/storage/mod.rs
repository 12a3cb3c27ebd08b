//! Read access to the persistent document store.
//!
//! The synchronization core never writes documents. It only reads the
//! current body when a client asks for a snapshot.

pub mod memory;

pub use memory::MemoryDocumentStore;

use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::models::DocumentSnapshot;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// The document-read API consumed by the snapshot provider.
pub trait DocumentStore: Send + Sync {
    /// Load a document. Fails with [`StoreError::NotFound`] when the file does
    /// not exist or does not belong to `project_id`.
    fn get_document<'a>(&'a self, project_id: &'a str, file_id: &'a str) -> StoreFuture<'a, DocumentSnapshot>;
}

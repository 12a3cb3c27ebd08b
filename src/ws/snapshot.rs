//! Snapshot provider: answers `doc:requestSnapshot` with the stored body.
//!
//! Store reads are the only suspending work in the core. They run after the
//! membership commit, never under the registry lock.

use moka::future::Cache;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::dispatch::{decode, required, Command, Context, Reaction};
use super::session::ConnectionState;
use crate::error::SyncError;
use crate::models::{SnapshotPayload, SnapshotRequestPayload};
use crate::storage::DocumentStore;

pub fn handle_snapshot_request(state: &ConnectionState, data: Value, _ctx: &Context) -> Result<Reaction, SyncError> {
    let payload: SnapshotRequestPayload = decode(data)?;
    match (required(payload.project_id), required(payload.file_id)) {
        (Some(project_id), Some(file_id)) => {
            Ok(Reaction::unchanged(state).run(Command::LoadSnapshot { project_id, file_id }))
        }
        _ => Err(SyncError::validation("Missing projectId or fileId")),
    }
}

#[derive(Clone)]
pub struct SnapshotProvider {
    store: Arc<dyn DocumentStore>,
    cache: Option<Cache<(String, String), String>>,
    // Bumped on every invalidation so a load that raced one does not leave
    // its stale body in the cache.
    generation: Arc<AtomicU64>,
}

impl SnapshotProvider {
    /// `ttl` of zero disables caching.
    pub fn new(store: Arc<dyn DocumentStore>, ttl: Duration, capacity: u64) -> Self {
        let cache = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { store, cache, generation: Arc::default() }
    }

    pub fn uncached(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, cache: None, generation: Arc::default() }
    }

    pub async fn fetch(&self, project_id: &str, file_id: &str, ctx: &Context) -> Result<SnapshotPayload, SyncError> {
        let key = (project_id.to_string(), file_id.to_string());

        let content = match &self.cache {
            Some(cache) => match cache.get(&key).await {
                Some(content) => {
                    debug!("Snapshot cache hit for file {} in project {}", file_id, project_id);
                    content
                }
                None => {
                    let generation = self.generation.load(Ordering::Acquire);
                    let doc = self.store.get_document(project_id, file_id).await?;
                    cache.insert(key.clone(), doc.content.clone()).await;
                    if self.generation.load(Ordering::Acquire) != generation {
                        debug!("Snapshot for file {} invalidated during load, not caching", file_id);
                        cache.invalidate(&key).await;
                    }
                    doc.content
                }
            },
            None => self.store.get_document(project_id, file_id).await?.content,
        };

        info!("Snapshot for file {} in project {} ({} bytes)", file_id, project_id, content.len());
        Ok(SnapshotPayload {
            file_id: file_id.to_string(),
            project_id: project_id.to_string(),
            content,
            timestamp: ctx.now_ms(),
        })
    }

    /// Drop a cached body after the document changed or disappeared.
    pub async fn invalidate(&self, project_id: &str, file_id: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(cache) = &self.cache {
            cache.invalidate(&(project_id.to_string(), file_id.to_string())).await;
        }
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.as_ref().map_or(0, |c| c.entry_count())
    }
}

//! Real-time synchronization core for collaborative code editing.
//!
//! The server side relays edit batches between connections editing the same
//! file, tracks who is in which room and serves document snapshots. The
//! client side ([`client`]) reconciles remote edits with an editor buffer.

pub mod auth;
pub mod client;
pub mod clients;
pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod ot;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;
pub mod ws;

use std::sync::Arc;
use axum::{
    http::{header::{AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::clients::FileServiceClient;
use crate::config::Config;
use crate::docs::ApiDoc;
use crate::routes::create_api_routes;
use crate::state::AppState;
use crate::storage::{DocumentStore, MemoryDocumentStore};
use crate::ws::{Hub, SnapshotProvider};

/// Pick the document store the configuration asks for.
///
/// Without a reachable file service the store is an empty in-memory one, so
/// every snapshot request fails with "File not found".
pub fn document_store(config: &Config) -> Arc<dyn DocumentStore> {
    let reason = match &config.file_service_url {
        Some(url) => {
            match FileServiceClient::new(url.clone(), config.cloud_auth_jwt_secret.clone(), config.cloud_service_name.clone()) {
                Ok(client) => return Arc::new(client),
                Err(e) => format!("file service client unavailable: {}", e),
            }
        }
        None => "no FILE_SERVICE_URL configured".to_string(),
    };
    if config.is_production() {
        error!("Serving snapshots from an empty in-memory store ({})", reason);
    } else {
        warn!("Serving snapshots from an empty in-memory store ({})", reason);
    }
    Arc::new(MemoryDocumentStore::new())
}

/// Build the shared state around a store.
pub fn app_state(config: Config, store: Arc<dyn DocumentStore>) -> Arc<AppState> {
    let snapshots = SnapshotProvider::new(store, config.snapshot_cache_ttl(), config.snapshot_cache_capacity);
    AppState::new(config, Hub::new(snapshots))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_headers(vec![AUTHORIZATION, CONTENT_TYPE])
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS]);

    if !origins.is_empty() {
        cors.allow_origin(origins).allow_credentials(true)
    } else if config.is_development() {
        cors.allow_origin(Any)
    } else {
        cors
    }
}

/// The full HTTP and WebSocket surface.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    let socket = Router::new()
        .route("/ws", get(ws::handler::ws_handler))
        .with_state(state.clone());

    Router::new()
        .nest("/api", create_api_routes(state))
        .merge(socket)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn without_file_service_every_document_is_missing() {
        let store = document_store(&Config::default());
        let err = store.get_document("p1", "f1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}

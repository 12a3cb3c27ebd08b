use crate::{handlers::{diagnostics, health_check, publish_project_event, ready_check}, routes::auth_middleware::auth_middleware, state::AppState};
use axum::{middleware, routing::{get, post}, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    let internal = Router::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/projects/:project_id/events", post(publish_project_event))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)); // Applies to all routes added above

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(internal)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, storage::MemoryDocumentStore, ws::{Hub, SnapshotProvider}};
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    fn state(secret: Option<&str>) -> Arc<AppState> {
        let config = Config { cloud_auth_jwt_secret: secret.map(str::to_string), ..Config::default() };
        let hub = Hub::new(SnapshotProvider::uncached(Arc::new(MemoryDocumentStore::new())));
        AppState::new(config, hub)
    }

    async fn status(router: Router, req: Request<Body>) -> StatusCode {
        router.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn health_and_ready_are_public() {
        let router = create_api_routes(state(None));
        assert_eq!(status(router.clone(), Request::get("/health").body(Body::empty()).unwrap()).await, StatusCode::OK);
        assert_eq!(status(router, Request::get("/ready").body(Body::empty()).unwrap()).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn internal_routes_need_a_token() {
        let router = create_api_routes(state(Some("secret")));
        let req = Request::get("/v1/diagnostics").body(Body::empty()).unwrap();
        assert_eq!(status(router.clone(), req).await, StatusCode::UNAUTHORIZED);

        let req = Request::get("/v1/diagnostics")
            .header("Authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(router, req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_secret_is_a_server_error() {
        let router = create_api_routes(state(None));
        let req = Request::get("/v1/diagnostics")
            .header("Authorization", "Bearer anything")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status(router, req).await, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

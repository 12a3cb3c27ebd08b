use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Room and process statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current statistics", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a service", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Publish a file lifecycle event to a project room
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project_id}/events",
    params(("project_id" = String, Path, description = "Project whose connections are notified")),
    request_body = ProjectEventRequest,
    responses(
        (status = 202, description = "Event forwarded", body = ProjectEventResponse),
        (status = 400, description = "Unsupported event", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not a service", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn publish_project_event_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        publish_project_event_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, ErrorResponse, ProjectEventRequest, ProjectEventResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;

use crate::{
    auth::auth,
    error::SyncError,
    models::{ErrorResponse, ProjectEventRequest, ProjectEventResponse},
    state::AppState,
};
use axum::{extract::{Extension, Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, warn};

/// Forward a file lifecycle event to everyone working in a project
pub async fn publish_project_event(
    State(state): State<Arc<AppState>>,
    Extension(prpls): Extension<Vec<String>>,
    Path(project_id): Path<String>,
    Json(request): Json<ProjectEventRequest>,
) -> Result<(StatusCode, Json<ProjectEventResponse>), (StatusCode, Json<ErrorResponse>)> {
    let caller = auth::ensure_service(&prpls)?;
    info!("{} publishes '{}' for project {}", caller, request.event, project_id);

    let event = request.event.clone();
    match state.hub.notifier().publish(&project_id, request).await {
        Ok(delivered) => Ok((StatusCode::ACCEPTED, Json(ProjectEventResponse { event, delivered }))),
        Err(e @ SyncError::Validation(_)) => {
            warn!("Rejected project event: {}", e);
            Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, e.client_message()))
        }
        Err(e) => Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.client_message())),
    }
}

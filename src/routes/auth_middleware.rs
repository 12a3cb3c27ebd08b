use std::sync::Arc;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use crate::services::auth_service::{get_auth_token, principals, validate_jwt};
use crate::state::AppState;

/// Validates the bearer token and stores the caller's principals as a
/// request extension for the handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = get_auth_token(&req).map_err(|e| {
        debug!("No auth token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    let secret = state.config.cloud_auth_jwt_secret.as_deref().ok_or_else(|| {
        error!("Cloud auth JWT secret not configured");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let token_data = validate_jwt(&token, secret).map_err(|e| {
        error!("JWT validation failed: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    let prpls = principals(&token_data.claims).map_err(|e| {
        error!("{}", e);
        StatusCode::UNAUTHORIZED
    })?;

    debug!("Token validated for {:?}", prpls);
    req.extensions_mut().insert(prpls);
    Ok(next.run(req).await)
}

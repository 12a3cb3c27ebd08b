use axum::{http::StatusCode, Json};

use crate::models::ErrorResponse;

const CLOUD_ADMIN_PRPL: &str = "r/CodeCollab-CloudAdmin";

pub fn is_cloud_admin(prpls: &[String]) -> bool {
    prpls.iter().any(|p| p == CLOUD_ADMIN_PRPL)
}

/// Any service, or a cloud admin acting by hand.
pub fn ensure_service(prpls: &[String]) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    if let Some(p) = prpls.iter().find(|p| p.starts_with("s/")) {
        return Ok(p.clone());
    }
    if is_cloud_admin(prpls) {
        return Ok(CLOUD_ADMIN_PRPL.to_string());
    }
    Err(ErrorResponse::reply(StatusCode::FORBIDDEN, "Service access required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn services_and_admins_pass() {
        assert_eq!(ensure_service(&["s/file-api".to_string()]).unwrap(), "s/file-api");
        assert_eq!(ensure_service(&[CLOUD_ADMIN_PRPL.to_string()]).unwrap(), CLOUD_ADMIN_PRPL);
    }

    #[test]
    fn plain_users_are_forbidden() {
        let (status, body) = ensure_service(&["r/Editor".to_string()]).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, 403);
    }
}

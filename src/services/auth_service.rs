use axum::http;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};

/// Name of the cookie that may carry the token when no header is sent.
pub const AUTH_COOKIE: &str = "auth_token";

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try the Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).to_string());
    }

    // 2. Then the cookie
    let cookie_header = req
        .headers()
        .get(http::header::COOKIE)
        .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
        .to_str()
        .map_err(|_| "Invalid Cookie header".to_string())?;

    cookie::Cookie::split_parse(cookie_header)
        .flatten()
        .find(|c| c.name() == AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| format!("{} cookie not found", AUTH_COOKIE))
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

/// Principals granted by a validated token: `s/<name>` for service tokens,
/// `r/<role>` for each role of a user token.
pub fn principals(claims: &serde_json::Value) -> Result<Vec<String>, String> {
    let token_type = claims
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "JWT token does not contain 'type' claim".to_string())?;
    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "JWT token does not contain 'sub' claim".to_string())?;

    match token_type {
        "service" => Ok(vec![format!("s/{}", sub)]),
        "user" => Ok(claims
            .get("roles")
            .and_then(|v| v.as_array())
            .map(|roles| roles.iter().filter_map(|r| r.as_str()).map(|r| format!("r/{}", r)).collect())
            .unwrap_or_default()),
        other => Err(format!("Invalid token type: {}", other)),
    }
}

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// Bearer identity middleware.
///
/// Extracts the `Authorization: Bearer <token>` header and inserts `AuthUser`
/// into request extensions for handlers to use. The token itself is the
/// learner's identity; it is not verified here, so deployments put an
/// authenticating proxy in front.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let sub = {
        let auth_header = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))?;

        if token.is_empty() {
            return Err(ApiError::Unauthorized("empty bearer token".to_string()));
        }

        token.to_string()
    };

    req.extensions_mut().insert(AuthUser { sub });

    Ok(next.run(req).await)
}

/// The caller, as identified by the bearer token. `sub` owns sessions.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub sub: String,
}

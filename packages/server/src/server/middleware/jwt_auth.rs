use crate::domains::auth::JwtService;
use crate::server::error::ApiError;
use axum::{
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

/// Authenticated user information from JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
    pub tenant: String,
}

/// JWT authentication middleware
///
/// Requires a `Bearer <token>` Authorization header. Valid tokens put an
/// [`AuthUser`] into the request extensions; anything else is rejected with 401.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match extract_auth_user(&request, &jwt_service) {
        Ok(user) => {
            debug!(username = %user.username, tenant = %user.tenant, "Authenticated user");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(rejection) => {
            debug!(reason = %rejection, "Rejected request");
            rejection.into_response()
        }
    }
}

/// Extract and verify JWT token from request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Result<AuthUser, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid authorization header format".to_string())
        })?;

    let claims = jwt_service
        .verify_token(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(AuthUser {
        username: claims.username,
        tenant: claims.tenant,
    })
}

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub username: String,
    pub tenant: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentUser {
    pub username: String,
    pub tenant: String,
}

/// Exchange configured credentials for a bearer token
pub async fn login_handler(
    Extension(state): Extension<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload.map_err(|_| ApiError::BadRequest("Invalid request".into()))?;
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest("Invalid request".into()));
    }

    let user = state
        .users
        .authenticate(&request.username, &request.password)
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".into()))?;

    let (token, expires_at) = state
        .jwt_service
        .create_token(&user.username, &user.tenant)
        .map_err(|_| ApiError::Internal("Failed to generate token".into()))?;

    info!(username = %user.username, tenant = %user.tenant, "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_at: expires_at.to_rfc3339(),
        username: user.username.clone(),
        tenant: user.tenant.clone(),
    }))
}

pub async fn me_handler(Extension(user): Extension<AuthUser>) -> Json<CurrentUser> {
    Json(CurrentUser {
        username: user.username,
        tenant: user.tenant,
    })
}

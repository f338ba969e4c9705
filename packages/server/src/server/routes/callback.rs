use axum::{body::Bytes, extract::Extension, Json};
use serde_json::{json, Value};

use crate::domains::contracts::WebhookOutcome;
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

/// MinerU completion webhook. Unauthenticated; integrity is checked through
/// the notification checksum when a seed and uid are configured.
pub async fn callback_handler(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    match state.reconciler.apply(&body).await? {
        WebhookOutcome::NotFound => Err(ApiError::contract_not_found()),
        WebhookOutcome::Applied | WebhookOutcome::Ignored => {
            Ok(Json(json!({ "message": "Callback received" })))
        }
    }
}

use axum::{
    extract::{Extension, Path, Query},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;

use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// Serve a stored artifact to holders of a valid signed URL
pub async fn download_file_handler(
    Extension(state): Extension<AppState>,
    Path(object): Path<String>,
    Query(query): Query<SignedQuery>,
) -> ApiResult<impl IntoResponse> {
    let files = state
        .files
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;

    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return Err(ApiError::Forbidden("Missing signature".into()));
    };
    if !files.verify(&object, expires, signature) {
        debug!(object = %object, "Rejected file download");
        return Err(ApiError::Forbidden("Invalid or expired signature".into()));
    }

    let data = files
        .read(&object)
        .await
        .map_err(|_| ApiError::NotFound("File not found".into()))?;
    let mime = mime_guess::from_path(&object).first_or_octet_stream();

    Ok(([(CONTENT_TYPE, mime.to_string())], data))
}

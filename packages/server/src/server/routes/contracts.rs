use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path as UrlPath},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domains::contracts::{Contract, ContractId, ContractStatus, ContractSummary};
use crate::server::app::AppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::AuthUser;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: ContractId,
    pub filename: String,
    pub pdf_url: String,
    pub status: ContractStatus,
}

#[derive(Debug, Serialize)]
pub struct ContractListResponse {
    pub contracts: Vec<ContractSummary>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: ContractId,
    pub status: ContractStatus,
    pub error_msg: Option<String>,
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

async fn read_file_field(multipart: &mut Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".into()))?;

        return Ok(UploadedFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(ApiError::BadRequest("No file provided".into()))
}

/// Strip any directory part a client put into the filename.
fn sanitize_filename(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Decide the stored content type, or reject the upload.
///
/// A PDF declared with some non-PDF type must start with the `%PDF-` magic bytes.
fn resolve_content_type(
    extension: &str,
    declared: Option<&str>,
    data: &[u8],
) -> ApiResult<&'static str> {
    match extension {
        "pdf" => match declared {
            None | Some("") | Some("application/octet-stream") => Ok(PDF_CONTENT_TYPE),
            Some(declared) if declared.contains("pdf") => Ok(PDF_CONTENT_TYPE),
            Some(_) if data.starts_with(b"%PDF-") => Ok(PDF_CONTENT_TYPE),
            Some(_) => Err(ApiError::BadRequest("Invalid file type".into())),
        },
        "docx" => Ok(DOCX_CONTENT_TYPE),
        _ => Err(ApiError::BadRequest(
            "Only PDF and DOCX files are allowed".into(),
        )),
    }
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Look up a contract owned by the caller's tenant. Other tenants' records are
/// reported as missing.
fn find_owned(state: &AppState, user: &AuthUser, id: &str) -> ApiResult<Arc<Contract>> {
    let id = ContractId::parse(id).map_err(|_| ApiError::contract_not_found())?;
    state
        .store
        .get(&id)
        .filter(|contract| contract.tenant == user.tenant)
        .ok_or_else(ApiError::contract_not_found)
}

/// Best-effort removal of an artifact whose upload did not produce a contract
async fn discard_artifact(state: &AppState, object_name: &str) {
    if let Err(e) = state.deps.storage.delete(object_name).await {
        warn!(object = %object_name, error = %e, "Failed to remove orphaned artifact");
    }
}

/// Store the artifact, record the contract as Pending and start processing
pub async fn upload_handler(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload = read_file_field(&mut multipart).await?;

    let filename = sanitize_filename(&upload.filename)
        .ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    let content_type = resolve_content_type(
        &extension_of(&filename),
        upload.content_type.as_deref(),
        &upload.data,
    )?;

    let id = ContractId::new();
    let object_name = format!("{}/{}/{}", user.tenant, id, filename);

    state
        .deps
        .storage
        .upload(&object_name, upload.data, content_type)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to upload file: {:#}", e)))?;

    let source_url = match state
        .deps
        .storage
        .presigned_url(&object_name, state.url_ttl)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            discard_artifact(&state, &object_name).await;
            return Err(ApiError::Internal(format!("Failed to generate URL: {:#}", e)));
        }
    };

    let contract = match state.store.create(Contract::new(
        id,
        user.tenant.clone(),
        filename.clone(),
        source_url.clone(),
    )) {
        Ok(contract) => contract,
        Err(e) => {
            discard_artifact(&state, &object_name).await;
            return Err(e.into());
        }
    };

    info!(
        contract_id = %id,
        tenant = %user.tenant,
        filename = %filename,
        "Contract uploaded"
    );

    // Fire and forget; progress is observed through the store.
    state.orchestrator.submit(id, source_url.clone());

    Ok(Json(UploadResponse {
        id,
        filename,
        pdf_url: source_url,
        status: contract.status,
    }))
}

/// The caller's contracts without extraction payloads, newest first
pub async fn list_contracts_handler(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Json<ContractListResponse> {
    let mut contracts: Vec<ContractSummary> = state
        .store
        .list_by_tenant(&user.tenant)
        .iter()
        .map(|contract| contract.summary())
        .collect();
    contracts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    Json(ContractListResponse { contracts })
}

pub async fn get_contract_handler(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    UrlPath(id): UrlPath<String>,
) -> ApiResult<Json<Contract>> {
    let contract = find_owned(&state, &user, &id)?;
    Ok(Json(Contract::clone(&contract)))
}

pub async fn status_handler(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    UrlPath(id): UrlPath<String>,
) -> ApiResult<Json<StatusResponse>> {
    let contract = find_owned(&state, &user, &id)?;
    Ok(Json(StatusResponse {
        id: contract.id,
        status: contract.status,
        error_msg: contract.error_detail.clone(),
    }))
}

/// Remove the contract. A running extraction is not cancelled; its final write
/// becomes a no-op.
pub async fn delete_contract_handler(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    UrlPath(id): UrlPath<String>,
) -> ApiResult<Json<Value>> {
    let contract = find_owned(&state, &user, &id)?;
    state.store.delete(&contract.id);

    if let Err(e) = state.deps.storage.delete(&contract.object_name()).await {
        warn!(contract_id = %contract.id, error = %e, "Failed to delete stored artifact");
    }

    info!(contract_id = %contract.id, tenant = %user.tenant, "Contract deleted");
    Ok(Json(json!({ "message": "Contract deleted" })))
}

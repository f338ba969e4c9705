//! HTTP tests for signed artifact downloads under `/files`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use common::*;
use contract_core::kernel::{BaseObjectStorage, LocalObjectStorage, StorageConfig};
use tempfile::TempDir;
use tower::ServiceExt;

const PUBLIC_HOST: &str = "http://files.test";
const OBJECT: &str = "acme/0192/lease.pdf";

async fn stored_files(dir: &TempDir) -> Arc<LocalObjectStorage> {
    let files = Arc::new(LocalObjectStorage::new(StorageConfig {
        root: dir.path().to_path_buf(),
        public_url: format!("{}/files", PUBLIC_HOST),
        signing_key: "download-key".to_string(),
        url_ttl: Duration::from_secs(600),
    }));
    files
        .upload(OBJECT, PDF_BYTES.to_vec(), "application/pdf")
        .await
        .unwrap();
    files
}

/// Path and query of a signed URL, ready to send through the router
fn request_uri(url: &str) -> String {
    url.strip_prefix(PUBLIC_HOST).unwrap().to_string()
}

async fn download(harness: &TestHarness, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = harness
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, body.to_vec())
}

#[tokio::test]
async fn valid_signed_url_serves_the_artifact() {
    let dir = TempDir::new().unwrap();
    let files = stored_files(&dir).await;
    let url = files
        .presigned_url(OBJECT, Duration::from_secs(60))
        .await
        .unwrap();
    let harness = TestHarness::with_files(files);

    let (status, content_type, body) = download(&harness, &request_uri(&url)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert_eq!(body, PDF_BYTES);
}

#[tokio::test]
async fn missing_or_tampered_signature_is_forbidden() {
    let dir = TempDir::new().unwrap();
    let files = stored_files(&dir).await;
    let expires = Utc::now().timestamp() + 60;
    let url = files.signed_url(OBJECT, expires).unwrap();
    let harness = TestHarness::with_files(files);

    let (status, _, _) = download(&harness, &format!("/files/{}", OBJECT)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) =
        download(&harness, &format!("/files/{}?expires={}", OBJECT, expires)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (head, signature) = url.rsplit_once("signature=").unwrap();
    let flipped = if signature.starts_with('0') { "1" } else { "0" };
    let tampered = format!("{}signature={}{}", head, flipped, &signature[1..]);
    let (status, _, _) = download(&harness, &request_uri(&tampered)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A valid signature for one object does not open another
    let other = request_uri(&url).replace("lease.pdf", "other.pdf");
    let (status, _, _) = download(&harness, &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_signature_is_forbidden() {
    let dir = TempDir::new().unwrap();
    let files = stored_files(&dir).await;
    let url = files
        .signed_url(OBJECT, Utc::now().timestamp() - 1)
        .unwrap();
    let harness = TestHarness::with_files(files);

    let (status, _, body) = download(&harness, &request_uri(&url)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "Invalid or expired signature");
}

#[tokio::test]
async fn downloads_are_not_served_without_local_storage() {
    let harness = TestHarness::new();

    let (status, _, _) = download(
        &harness,
        &format!("/files/{}?expires=1&signature=00", OBJECT),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

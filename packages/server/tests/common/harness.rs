//! Test harness driving the real router against mock collaborators.
//!
//! Each harness owns its own store and mocks, so tests never share state.
//! Requests go through `tower::ServiceExt::oneshot`; no socket is opened.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use contract_core::domains::auth::{JwtService, UserDirectory};
use contract_core::domains::contracts::{
    Contract, ContractId, ContractStore, PollingConfig, StoreConfig,
};
use contract_core::kernel::{LocalObjectStorage, TestDependencies};
use contract_core::server::{build_app, AppState};
use contract_core::HttpConfig;
use serde_json::Value;
use tower::ServiceExt;

use super::BOUNDARY;

pub const USERS: &str = "alice:secret:acme,bob:secret:globex";

/// Millisecond polling so lifecycle tests finish quickly
pub fn fast_polling(max_attempts: u32) -> PollingConfig {
    PollingConfig {
        interval: Duration::from_millis(2),
        max_attempts,
    }
}

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct TestHarness {
    pub deps: TestDependencies,
    pub state: AppState,
    pub router: Router,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(TestDependencies::new(), fast_polling(5), StoreConfig::unlimited())
    }

    pub fn with_deps(deps: TestDependencies) -> Self {
        Self::build(deps, fast_polling(5), StoreConfig::unlimited())
    }

    pub fn build(deps: TestDependencies, polling: PollingConfig, store: StoreConfig) -> Self {
        Self::assemble(deps, polling, store, None)
    }

    /// Harness that also serves `/files` from a local object store
    pub fn with_files(files: Arc<LocalObjectStorage>) -> Self {
        Self::assemble(
            TestDependencies::new(),
            fast_polling(5),
            StoreConfig::unlimited(),
            Some(files),
        )
    }

    fn assemble(
        deps: TestDependencies,
        polling: PollingConfig,
        store: StoreConfig,
        files: Option<Arc<LocalObjectStorage>>,
    ) -> Self {
        init_tracing();

        let jwt_service = Arc::new(JwtService::new("test-secret", "test-issuer".into(), 1));
        let users = UserDirectory::parse(USERS).expect("valid user list");
        let mut state = AppState::new(
            Arc::new(ContractStore::new(store)),
            deps.server_deps(),
            polling,
            jwt_service,
            users,
            Duration::from_secs(3600),
        );
        if let Some(files) = files {
            state = state.with_files(files);
        }

        let http = HttpConfig {
            rate_limit_per_second: 0,
            ..HttpConfig::default()
        };
        let router = build_app(state.clone(), &http).expect("router builds");

        Self {
            deps,
            state,
            router,
        }
    }

    pub fn store(&self) -> &ContractStore {
        &self.state.store
    }

    /// Bearer token minted directly, bypassing the login route
    pub fn token(&self, username: &str, tenant: &str) -> String {
        let (token, _) = self
            .state
            .jwt_service
            .create_token(username, tenant)
            .expect("token");
        token
    }

    pub fn alice(&self) -> String {
        self.token("alice", "acme")
    }

    pub fn bob(&self) -> String {
        self.token("bob", "globex")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(
            Self::request(Method::GET, uri, token)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(
            Self::request(Method::DELETE, uri, token)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value, token: Option<&str>) -> (StatusCode, Value) {
        self.post_raw(uri, serde_json::to_vec(body).expect("json"), token)
            .await
    }

    pub async fn post_raw(&self, uri: &str, body: Vec<u8>, token: Option<&str>) -> (StatusCode, Value) {
        self.send(
            Self::request(Method::POST, uri, token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    pub async fn upload(&self, body: Vec<u8>, token: Option<&str>) -> (StatusCode, Value) {
        self.send(
            Self::request(Method::POST, "/api/contracts/upload", token)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    /// Wait until the background lifecycle has finalized (or dropped) a contract.
    pub async fn wait_for_terminal(&self, id: &ContractId) -> Option<Arc<Contract>> {
        for _ in 0..500 {
            match self.store().get(id) {
                Some(contract) if contract.status.is_terminal() => return Some(contract),
                None => return None,
                _ => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
        panic!("contract {} never reached a terminal state", id);
    }
}

//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use mineru_client::{MineruClient, MineruOptions};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, HttpConfig};
use crate::domains::auth::{JwtService, UserDirectory};
use crate::domains::contracts::{
    ContractStore, LifecycleOrchestrator, PollingConfig, WebhookReconciler,
};
use crate::kernel::{LocalObjectStorage, MineruAdapter, ServerDeps};
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    callback_handler, delete_contract_handler, download_file_handler, get_contract_handler,
    health_handler, list_contracts_handler, login_handler, me_handler, status_handler,
    upload_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContractStore>,
    pub orchestrator: LifecycleOrchestrator,
    pub reconciler: WebhookReconciler,
    pub deps: ServerDeps,
    pub jwt_service: Arc<JwtService>,
    pub users: Arc<UserDirectory>,
    /// Lifetime of artifact URLs handed to the extraction provider
    pub url_ttl: Duration,
    /// Set when artifacts are served by this process under `/files`
    pub files: Option<Arc<LocalObjectStorage>>,
}

impl AppState {
    pub fn new(
        store: Arc<ContractStore>,
        deps: ServerDeps,
        polling: PollingConfig,
        jwt_service: Arc<JwtService>,
        users: UserDirectory,
        url_ttl: Duration,
    ) -> Self {
        let orchestrator =
            LifecycleOrchestrator::new(store.clone(), deps.extraction.clone(), polling);
        let reconciler = WebhookReconciler::new(store.clone(), deps.extraction.clone());

        Self {
            store,
            orchestrator,
            reconciler,
            deps,
            jwt_service,
            users: Arc::new(users),
            url_ttl,
            files: None,
        }
    }

    pub fn with_files(mut self, files: Arc<LocalObjectStorage>) -> Self {
        self.files = Some(files);
        self
    }

    /// Wire production dependencies from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut options = MineruOptions::new(&config.mineru.api_url, &config.mineru.api_token);
        options.model_version = config.mineru.model_version.clone();
        options.callback_url = config.mineru.callback_url.clone();
        options.seed = config.mineru.seed.clone();
        let mineru = MineruClient::new(options).context("Failed to create MinerU client")?;

        let storage = Arc::new(LocalObjectStorage::new(config.storage.clone()));
        let deps = ServerDeps::new(
            Arc::new(MineruAdapter::new(Arc::new(mineru), config.mineru.uid.clone())),
            storage.clone(),
        );

        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_issuer.clone(),
            config.token_expire_hours,
        ));

        Ok(Self::new(
            Arc::new(ContractStore::new(config.store)),
            deps,
            config.polling,
            jwt_service,
            config.users.clone(),
            storage.url_ttl(),
        )
        .with_files(storage))
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(state: AppState, http: &HttpConfig) -> Result<Router> {
    let jwt_service_for_middleware = state.jwt_service.clone();

    // Everything here requires a valid bearer token
    let protected = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/contracts", get(list_contracts_handler))
        .route("/contracts/upload", post(upload_handler))
        .route(
            "/contracts/:id",
            get(get_contract_handler).delete(delete_contract_handler),
        )
        .route("/contracts/:id/status", get(status_handler))
        .route_layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service_for_middleware.clone(), req, next)
        }));

    let mut api = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/mineru/callback", post(callback_handler))
        .merge(protected);

    if http.rate_limit_per_second > 0 {
        // Per-IP, keyed on X-Forwarded-For / X-Real-IP when present
        let rate_limit_config = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(http.rate_limit_per_second)
                .burst_size(http.rate_limit_burst.max(1))
                .use_headers()
                .finish()
                .context("Invalid rate limiter configuration")?,
        );
        api = api.layer(GovernorLayer {
            config: rate_limit_config,
        });
    }

    let app = Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .route("/files/*object", get(download_file_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(DefaultBodyLimit::max(http.max_upload_bytes))
        .layer(Extension(state))
        .layer(cors_layer(&http.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(app)
}

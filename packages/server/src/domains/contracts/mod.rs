pub mod error;
pub mod models;
pub mod orchestrator;
pub mod polling;
pub mod store;
pub mod webhook;

pub use error::{LifecycleError, StoreError, WebhookError};
pub use models::{Contract, ContractId, ContractStatus, ContractSummary};
pub use orchestrator::{apply_resolution, resolve_done, LifecycleOrchestrator, Resolution};
pub use polling::{poll_job, PollingConfig};
pub use store::{ContractStore, StoreConfig, UpdateOutcome};
pub use webhook::{WebhookOutcome, WebhookReconciler};

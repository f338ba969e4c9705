//! Lifecycle orchestration: `Pending -> Processing -> {Completed, Failed}`.
//!
//! [`LifecycleOrchestrator::submit`] spawns one task per contract. The task moves
//! the record to Processing, creates the remote job and polls it. The webhook
//! reconciler races the poller for the terminal write; the store keeps terminal
//! states absorbing so whichever path lands second is a no-op.

use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::LifecycleError;
use super::models::{ContractId, ContractStatus};
use super::polling::{poll_job, PollingConfig};
use super::store::{ContractStore, UpdateOutcome};
use crate::kernel::{BaseExtractionClient, ResultLocation};

/// Terminal decision reached by the poller or the webhook, before it is written.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// `None` when the provider finished without a result reference
    Completed(Option<Value>),
    Failed(LifecycleError),
}

/// Fetch the payload of a finished job.
pub async fn resolve_done(
    client: &dyn BaseExtractionClient,
    location: Option<&ResultLocation>,
) -> Resolution {
    let Some(location) = location else {
        return Resolution::Completed(None);
    };

    match client.fetch_result(location).await {
        Ok(payload) => Resolution::Completed(Some(payload)),
        Err(e) => Resolution::Failed(LifecycleError::ResultFetch(format!("{:#}", e))),
    }
}

/// Write a resolution to the store. Losing the race (or finding the record gone)
/// is expected and only logged.
pub fn apply_resolution(
    store: &ContractStore,
    id: &ContractId,
    resolution: Resolution,
    source: &'static str,
) -> UpdateOutcome {
    let (outcome, status) = match resolution {
        Resolution::Completed(Some(payload)) => {
            (store.update_result(id, payload), ContractStatus::Completed)
        }
        Resolution::Completed(None) => (
            store.update_status(id, ContractStatus::Completed, None),
            ContractStatus::Completed,
        ),
        Resolution::Failed(error) => {
            if error.is_timeout() {
                warn!(contract_id = %id, source, error = %error, "Contract timed out");
            }
            (
                store.update_status(id, ContractStatus::Failed, Some(error.to_string())),
                ContractStatus::Failed,
            )
        }
    };

    match outcome {
        UpdateOutcome::Applied => {
            info!(contract_id = %id, source, status = %status, "Contract finalized")
        }
        UpdateOutcome::Terminal => {
            debug!(contract_id = %id, source, "Contract already finalized, write dropped")
        }
        UpdateOutcome::Missing => {
            debug!(contract_id = %id, source, "Contract gone before finalize, write dropped")
        }
        UpdateOutcome::Rejected => {
            warn!(contract_id = %id, source, status = %status, "Finalize rejected")
        }
    }
    outcome
}

/// Drives contracts through the extraction lifecycle.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    store: Arc<ContractStore>,
    client: Arc<dyn BaseExtractionClient>,
    polling: PollingConfig,
}

impl LifecycleOrchestrator {
    pub fn new(
        store: Arc<ContractStore>,
        client: Arc<dyn BaseExtractionClient>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            store,
            client,
            polling,
        }
    }

    /// Start processing a freshly created contract in the background.
    ///
    /// Completion is observed through the store; the handle is only for callers
    /// that want to wait (tests, shutdown).
    pub fn submit(&self, id: ContractId, source_url: impl Into<String>) -> JoinHandle<()> {
        let this = self.clone();
        let source_url = source_url.into();
        tokio::spawn(async move { this.run(id, &source_url).await })
    }

    /// The whole lifecycle of one contract. Every error ends in a store write.
    pub async fn run(&self, id: ContractId, source_url: &str) {
        match self.store.update_status(&id, ContractStatus::Processing, None) {
            UpdateOutcome::Applied => {}
            outcome => {
                debug!(contract_id = %id, ?outcome, "Contract not pending, skipping submission");
                return;
            }
        }

        let job_id = match self.client.create_job(source_url, &id.to_string()).await {
            Ok(job_id) => job_id,
            Err(e) => {
                warn!(contract_id = %id, error = %e, "Failed to create extraction job");
                let error = LifecycleError::JobCreation(format!("{:#}", e));
                apply_resolution(&self.store, &id, Resolution::Failed(error), "submit");
                return;
            }
        };

        info!(contract_id = %id, job_id = %job_id, "Extraction job created");
        if !self.store.attach_job(&id, &job_id).is_applied() {
            debug!(contract_id = %id, job_id = %job_id, "Job id not attached");
        }

        let resolution = poll_job(self.client.as_ref(), id, &job_id, self.polling).await;
        apply_resolution(&self.store, &id, resolution, "poll");
    }
}

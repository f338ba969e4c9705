//! Applies provider completion notifications to the store.
//!
//! A notification is `{"checksum": "...", "content": "<json string>"}`. The
//! content's `data_id` is the contract id handed to the provider at job
//! creation, so lookup never depends on the provider job id.

use mineru_client::{CallbackContent, CallbackEnvelope};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{LifecycleError, WebhookError};
use super::models::ContractId;
use super::orchestrator::{apply_resolution, resolve_done, Resolution};
use super::store::{ContractStore, UpdateOutcome};
use crate::kernel::{BaseExtractionClient, ResultLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The notification finalized the contract
    Applied,
    /// No contract matches the correlation id
    NotFound,
    /// Acknowledged without effect (progress update, already finalized, stale job)
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied => "applied",
            WebhookOutcome::NotFound => "not_found",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

#[derive(Clone)]
pub struct WebhookReconciler {
    store: Arc<ContractStore>,
    client: Arc<dyn BaseExtractionClient>,
}

impl WebhookReconciler {
    pub fn new(store: Arc<ContractStore>, client: Arc<dyn BaseExtractionClient>) -> Self {
        Self { store, client }
    }

    /// Validate and apply one raw notification body.
    ///
    /// Errors are validation failures and leave the store untouched.
    pub async fn apply(&self, raw: &[u8]) -> Result<WebhookOutcome, WebhookError> {
        let envelope: CallbackEnvelope = serde_json::from_slice(raw).map_err(|source| {
            WebhookError::MalformedPayload {
                part: "request",
                source,
            }
        })?;

        if !self
            .client
            .verify_notification(&envelope.checksum, &envelope.content)
        {
            warn!("Webhook checksum mismatch");
            return Err(WebhookError::ChecksumMismatch);
        }

        let content: CallbackContent =
            serde_json::from_str(&envelope.content).map_err(|source| {
                WebhookError::MalformedPayload {
                    part: "content format",
                    source,
                }
            })?;

        let outcome = self.reconcile(content).await;
        info!(outcome = outcome.as_str(), "Webhook processed");
        Ok(outcome)
    }

    async fn reconcile(&self, content: CallbackContent) -> WebhookOutcome {
        let Ok(id) = ContractId::parse(&content.data_id) else {
            debug!(data_id = %content.data_id, "Webhook correlation id is not a contract id");
            return WebhookOutcome::NotFound;
        };

        let Some(contract) = self.store.get(&id) else {
            debug!(contract_id = %id, "Webhook for unknown contract");
            return WebhookOutcome::NotFound;
        };

        let state = content.state.as_str();
        if state != "done" && state != "failed" {
            debug!(contract_id = %id, state, "Non-terminal webhook acknowledged");
            return WebhookOutcome::Ignored;
        }

        if contract.status.is_terminal() {
            debug!(contract_id = %id, status = %contract.status, "Contract already finalized");
            return WebhookOutcome::Ignored;
        }

        if let Some(job_id) = contract.external_job_id.as_deref() {
            if !content.task_id.is_empty() && content.task_id != job_id {
                warn!(
                    contract_id = %id,
                    expected = job_id,
                    received = %content.task_id,
                    "Webhook for a different job"
                );
                return WebhookOutcome::Ignored;
            }
        }

        let resolution = if state == "done" {
            let location = content
                .result_json_url()
                .map(|url| ResultLocation::Document(url.to_string()));
            resolve_done(self.client.as_ref(), location.as_ref()).await
        } else {
            Resolution::Failed(LifecycleError::provider(content.err_msg))
        };

        match apply_resolution(&self.store, &id, resolution, "webhook") {
            UpdateOutcome::Applied => WebhookOutcome::Applied,
            UpdateOutcome::Missing => WebhookOutcome::NotFound,
            UpdateOutcome::Terminal | UpdateOutcome::Rejected => WebhookOutcome::Ignored,
        }
    }
}

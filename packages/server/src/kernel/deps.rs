//! Server dependencies (using traits for testability)
//!
//! Holds the external collaborators every contract operation goes through.
//! Production wires the MinerU adapter and local object storage; tests wire the
//! mocks from `test_dependencies`.

use anyhow::Result;
use async_trait::async_trait;
use mineru_client::{MineruClient, TaskState, TaskStatus};
use serde_json::Value;
use std::sync::Arc;

use crate::kernel::{
    BaseExtractionClient, BaseObjectStorage, JobProgress, JobState, JobStatusReport,
    ResultLocation,
};

// =============================================================================
// MinerU Adapter (implements BaseExtractionClient trait)
// =============================================================================

/// Wrapper around MineruClient that implements BaseExtractionClient
pub struct MineruAdapter {
    client: Arc<MineruClient>,
    /// Account uid that takes part in webhook checksums
    callback_uid: Option<String>,
}

impl MineruAdapter {
    pub fn new(client: Arc<MineruClient>, callback_uid: Option<String>) -> Self {
        Self {
            client,
            callback_uid,
        }
    }
}

fn report_from_status(status: TaskStatus) -> JobStatusReport {
    let state = match status.state {
        TaskState::Done => JobState::Done,
        TaskState::Failed => JobState::Failed,
        TaskState::Running | TaskState::Converting => JobState::Running,
        TaskState::Pending | TaskState::Unknown => JobState::Pending,
    };

    JobStatusReport {
        state,
        result_location: status
            .full_zip_url
            .filter(|url| !url.is_empty())
            .map(ResultLocation::Bundle),
        error_message: status.err_msg.filter(|m| !m.is_empty()),
        progress: status.extract_progress.map(|p| JobProgress {
            extracted_pages: p.extracted_pages,
            total_pages: p.total_pages,
        }),
    }
}

#[async_trait]
impl BaseExtractionClient for MineruAdapter {
    async fn create_job(&self, source_url: &str, correlation_id: &str) -> Result<String> {
        self.client
            .create_task(source_url, correlation_id)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn query_status(&self, job_id: &str) -> Result<JobStatusReport> {
        self.client
            .get_task_status(job_id)
            .await
            .map(report_from_status)
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn fetch_result(&self, location: &ResultLocation) -> Result<Value> {
        let fetched = match location {
            ResultLocation::Bundle(url) => self.client.fetch_zip_json(url).await,
            ResultLocation::Document(url) => self.client.fetch_json(url).await,
        };
        fetched.map_err(|e| anyhow::anyhow!("{}", e))
    }

    fn verify_notification(&self, checksum: &str, content: &str) -> bool {
        // Checksums are only enforced when both halves of the secret are configured.
        match (&self.callback_uid, &self.client.options().seed) {
            (Some(uid), Some(_)) => self.client.verify_callback(uid, checksum, content),
            _ => true,
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// External collaborators shared by the orchestrator, webhook and handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub extraction: Arc<dyn BaseExtractionClient>,
    pub storage: Arc<dyn BaseObjectStorage>,
}

impl ServerDeps {
    pub fn new(
        extraction: Arc<dyn BaseExtractionClient>,
        storage: Arc<dyn BaseObjectStorage>,
    ) -> Self {
        Self {
            extraction,
            storage,
        }
    }
}

// Trait definitions for dependency injection
//
// Infrastructure traits only. The lifecycle rules live in domains/contracts and
// talk to the outside world exclusively through these.
//
// Naming convention: Base* for trait names (e.g., BaseExtractionClient)

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

// =============================================================================
// Extraction Client Trait
// =============================================================================

/// Provider-neutral state of a remote extraction job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }
}

/// Where the result payload of a finished job can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLocation {
    /// Archive that has to be unpacked to find the payload
    Bundle(String),
    /// The payload itself
    Document(String),
}

impl ResultLocation {
    pub fn url(&self) -> &str {
        match self {
            ResultLocation::Bundle(url) | ResultLocation::Document(url) => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobProgress {
    pub extracted_pages: u32,
    pub total_pages: u32,
}

/// One answer to a status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusReport {
    pub state: JobState,
    pub result_location: Option<ResultLocation>,
    pub error_message: Option<String>,
    pub progress: Option<JobProgress>,
}

impl JobStatusReport {
    pub fn running() -> Self {
        Self {
            state: JobState::Running,
            result_location: None,
            error_message: None,
            progress: None,
        }
    }

    pub fn done(location: Option<ResultLocation>) -> Self {
        Self {
            state: JobState::Done,
            result_location: location,
            error_message: None,
            progress: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed,
            result_location: None,
            error_message: Some(message.into()),
            progress: None,
        }
    }

    pub fn with_progress(mut self, extracted_pages: u32, total_pages: u32) -> Self {
        self.progress = Some(JobProgress {
            extracted_pages,
            total_pages,
        });
        self
    }
}

#[async_trait]
pub trait BaseExtractionClient: Send + Sync {
    /// Create a remote job for the document at `source_url`.
    /// `correlation_id` comes back in webhook notifications. Returns the job id.
    async fn create_job(&self, source_url: &str, correlation_id: &str) -> Result<String>;

    async fn query_status(&self, job_id: &str) -> Result<JobStatusReport>;

    /// Download and parse the result payload
    async fn fetch_result(&self, location: &ResultLocation) -> Result<Value>;

    /// Check the integrity checksum of a raw webhook notification
    fn verify_notification(&self, checksum: &str, content: &str) -> bool;
}

// =============================================================================
// Object Storage Trait
// =============================================================================

#[async_trait]
pub trait BaseObjectStorage: Send + Sync {
    async fn upload(&self, object_name: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Time-boxed access URL for a stored object
    async fn presigned_url(&self, object_name: &str, expires_in: Duration) -> Result<String>;

    async fn delete(&self, object_name: &str) -> Result<()>;
}

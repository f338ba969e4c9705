// Test dependencies - mock implementations for testing
//
// Scripted stand-ins for the extraction provider and object storage that can be
// injected into ServerDeps. Every call is recorded for assertions.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{
    BaseExtractionClient, BaseObjectStorage, JobStatusReport, ResultLocation, ServerDeps,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// Mock Extraction Client
// =============================================================================

/// Arguments captured from a create_job call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobCall {
    pub source_url: String,
    pub correlation_id: String,
}

pub struct MockExtractionClient {
    create_results: Mutex<VecDeque<Result<String, String>>>,
    status_script: Mutex<VecDeque<Result<JobStatusReport, String>>>,
    results: Mutex<HashMap<String, Result<Value, String>>>,
    accept_notifications: AtomicBool,
    create_calls: Mutex<Vec<CreateJobCall>>,
    status_queries: AtomicUsize,
    fetch_calls: Mutex<Vec<ResultLocation>>,
}

impl Default for MockExtractionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractionClient {
    pub fn new() -> Self {
        Self {
            create_results: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            results: Mutex::new(HashMap::new()),
            accept_notifications: AtomicBool::new(true),
            create_calls: Mutex::new(Vec::new()),
            status_queries: AtomicUsize::new(0),
            fetch_calls: Mutex::new(Vec::new()),
        }
    }

    /// Next create_job returns this job id (defaults to `job-N`)
    pub fn with_job_id(self, job_id: &str) -> Self {
        lock(&self.create_results).push_back(Ok(job_id.to_string()));
        self
    }

    /// Next create_job fails with this message
    pub fn with_create_error(self, message: &str) -> Self {
        lock(&self.create_results).push_back(Err(message.to_string()));
        self
    }

    /// Queue a status answer. Once the script runs out every query reports running.
    pub fn with_status(self, report: JobStatusReport) -> Self {
        lock(&self.status_script).push_back(Ok(report));
        self
    }

    /// Queue a transient status query failure
    pub fn with_status_error(self, message: &str) -> Self {
        lock(&self.status_script).push_back(Err(message.to_string()));
        self
    }

    /// Payload returned when fetching from `url`
    pub fn with_result(self, url: &str, payload: Value) -> Self {
        lock(&self.results).insert(url.to_string(), Ok(payload));
        self
    }

    /// Fetching from `url` fails with this message
    pub fn with_result_error(self, url: &str, message: &str) -> Self {
        lock(&self.results).insert(url.to_string(), Err(message.to_string()));
        self
    }

    /// Make verify_notification reject every checksum
    pub fn rejecting_notifications(self) -> Self {
        self.accept_notifications.store(false, Ordering::SeqCst);
        self
    }

    pub fn create_calls(&self) -> Vec<CreateJobCall> {
        lock(&self.create_calls).clone()
    }

    pub fn status_query_count(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> Vec<ResultLocation> {
        lock(&self.fetch_calls).clone()
    }
}

#[async_trait]
impl BaseExtractionClient for MockExtractionClient {
    async fn create_job(&self, source_url: &str, correlation_id: &str) -> Result<String> {
        let call_number = {
            let mut calls = lock(&self.create_calls);
            calls.push(CreateJobCall {
                source_url: source_url.to_string(),
                correlation_id: correlation_id.to_string(),
            });
            calls.len()
        };

        match lock(&self.create_results).pop_front() {
            Some(Ok(job_id)) => Ok(job_id),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(format!("job-{}", call_number)),
        }
    }

    async fn query_status(&self, _job_id: &str) -> Result<JobStatusReport> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        match lock(&self.status_script).pop_front() {
            Some(Ok(report)) => Ok(report),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(JobStatusReport::running()),
        }
    }

    async fn fetch_result(&self, location: &ResultLocation) -> Result<Value> {
        lock(&self.fetch_calls).push(location.clone());
        match lock(&self.results).get(location.url()) {
            Some(Ok(payload)) => Ok(payload.clone()),
            Some(Err(message)) => Err(anyhow!(message.clone())),
            None => Err(anyhow!("no result at {}", location.url())),
        }
    }

    fn verify_notification(&self, _checksum: &str, _content: &str) -> bool {
        self.accept_notifications.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Mock Object Storage
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCall {
    pub object_name: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Default)]
pub struct MockObjectStorage {
    uploads: Mutex<Vec<UploadCall>>,
    deletes: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
    fail_presign: AtomicBool,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads(self) -> Self {
        self.fail_uploads.store(true, Ordering::SeqCst);
        self
    }

    /// Make presigned_url fail after a successful upload
    pub fn failing_presign(self) -> Self {
        self.fail_presign.store(true, Ordering::SeqCst);
        self
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        lock(&self.uploads).clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        lock(&self.deletes).clone()
    }
}

#[async_trait]
impl BaseObjectStorage for MockObjectStorage {
    async fn upload(&self, object_name: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow!("storage unavailable"));
        }
        lock(&self.uploads).push(UploadCall {
            object_name: object_name.to_string(),
            size: data.len(),
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    async fn presigned_url(&self, object_name: &str, _expires_in: Duration) -> Result<String> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(anyhow!("signing key unavailable"));
        }
        Ok(format!("https://storage.test/{}?signature=mock", object_name))
    }

    async fn delete(&self, object_name: &str) -> Result<()> {
        lock(&self.deletes).push(object_name.to_string());
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock collaborators plus the ServerDeps built from them
pub struct TestDependencies {
    pub extraction: Arc<MockExtractionClient>,
    pub storage: Arc<MockObjectStorage>,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self::with(MockExtractionClient::new(), MockObjectStorage::new())
    }

    pub fn with(extraction: MockExtractionClient, storage: MockObjectStorage) -> Self {
        Self {
            extraction: Arc::new(extraction),
            storage: Arc::new(storage),
        }
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(self.extraction.clone(), self.storage.clone())
    }
}

//! Pure MinerU REST API client.
//!
//! A minimal client for the MinerU document extraction API. Supports creating
//! extraction tasks, polling their status, downloading results (either a direct
//! JSON document or a ZIP bundle) and verifying callback checksums.
//!
//! # Example
//!
//! ```rust,ignore
//! use mineru_client::{MineruClient, MineruOptions};
//!
//! let client = MineruClient::new(MineruOptions::new("https://mineru.net/api/v4", "token"))?;
//!
//! let task_id = client.create_task("https://files.example/contract.pdf", "contract-1").await?;
//! let status = client.get_task_status(&task_id).await?;
//! if let Some(zip_url) = status.full_zip_url.as_deref() {
//!     let result = client.fetch_zip_json(zip_url).await?;
//! }
//! ```

pub mod archive;
pub mod error;
pub mod types;

pub use archive::{extract_json_from_zip, parse_object};
pub use error::{MineruError, Result};
pub use types::{
    CallbackContent, CallbackEnvelope, CallbackPage, ExtractProgress, TaskState, TaskStatus,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use types::{ApiEnvelope, TaskCreated, TaskRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection and task settings for [`MineruClient`].
#[derive(Debug, Clone)]
pub struct MineruOptions {
    pub api_url: String,
    pub api_token: String,
    pub model_version: String,
    /// When set, MinerU POSTs completion notifications here
    pub callback_url: Option<String>,
    /// Shared secret mixed into callback checksums
    pub seed: Option<String>,
    pub timeout: Duration,
}

impl MineruOptions {
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            model_version: "vlm".to_string(),
            callback_url: None,
            seed: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct MineruClient {
    client: reqwest::Client,
    options: MineruOptions,
}

impl MineruClient {
    pub fn new(options: MineruOptions) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &MineruOptions {
        &self.options
    }

    /// Create an extraction task for the document at `file_url`.
    ///
    /// `data_id` is echoed back by MinerU in status responses and callbacks.
    pub async fn create_task(&self, file_url: &str, data_id: &str) -> Result<String> {
        let callback = self.options.callback_url.clone().filter(|u| !u.is_empty());
        let request = TaskRequest {
            url: file_url.to_string(),
            model_version: self.options.model_version.clone(),
            seed: callback.as_ref().and(self.options.seed.clone()),
            callback,
            data_id: Some(data_id.to_string()),
        };

        let url = format!("{}/extract/task", self.options.api_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.options.api_token)
            .json(&request)
            .send()
            .await?;

        let created: TaskCreated = self.read_envelope(resp).await?;
        tracing::info!(task_id = %created.task_id, data_id, "MinerU task created");
        Ok(created.task_id)
    }

    /// Query the current state of a task.
    pub async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let url = format!("{}/extract/task/{}", self.options.api_url, task_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.options.api_token)
            .send()
            .await?;

        let status: TaskStatus = self.read_envelope(resp).await?;
        tracing::debug!(task_id, state = ?status.state, "MinerU task status");
        Ok(status)
    }

    /// Fetch a JSON result document from a direct URL. Anything but an object is a parse error.
    pub async fn fetch_json(&self, json_url: &str) -> Result<serde_json::Value> {
        let bytes = self.download(json_url).await?;
        parse_object(&bytes)
    }

    /// Download a result bundle and extract its structured JSON.
    pub async fn fetch_zip_json(&self, zip_url: &str) -> Result<serde_json::Value> {
        let bytes = self.download(zip_url).await?;
        tracing::debug!(size = bytes.len(), "result bundle downloaded");
        extract_json_from_zip(&bytes)
    }

    /// Check a callback checksum against the configured seed.
    ///
    /// Returns `false` when no seed is configured.
    pub fn verify_callback(&self, uid: &str, checksum: &str, content: &str) -> bool {
        match self.options.seed.as_deref() {
            Some(seed) => callback_checksum(uid, seed, content) == checksum,
            None => false,
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MineruError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn read_envelope<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MineruError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.bytes().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)?;
        if envelope.code != 0 {
            return Err(MineruError::Provider {
                code: envelope.code,
                message: envelope.msg,
            });
        }
        envelope.data.ok_or_else(|| MineruError::Provider {
            code: envelope.code,
            message: "response carried no data".to_string(),
        })
    }
}

/// Callback checksum as computed by MinerU: `hex(sha256(uid + seed + content))`.
pub fn callback_checksum(uid: &str, seed: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update(seed.as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

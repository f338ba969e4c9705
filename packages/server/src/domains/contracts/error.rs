use thiserror::Error;

use super::models::ContractId;

/// Caller misuse of the contract store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("contract {0} already exists")]
    DuplicateId(ContractId),
}

/// Why a contract ended up Failed. The `Display` text is what readers see as `error_msg`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("failed to create extraction job: {0}")]
    JobCreation(String),

    /// Failure reported by the provider, stored verbatim
    #[error("{0}")]
    Provider(String),

    #[error("Failed to fetch JSON: {0}")]
    ResultFetch(String),

    #[error("task polling timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
}

impl LifecycleError {
    pub fn provider(message: Option<String>) -> Self {
        match message.filter(|m| !m.trim().is_empty()) {
            Some(m) => LifecycleError::Provider(m),
            None => LifecycleError::Provider("extraction failed".to_string()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout { .. })
    }
}

/// Rejected webhook notifications. Nothing in the store changes.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid {part}: {source}")]
    MalformedPayload {
        part: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid checksum")]
    ChecksumMismatch,
}

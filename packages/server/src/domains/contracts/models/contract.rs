use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a contract record. Time-ordered (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(Uuid);

impl ContractId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ContractId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ContractId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Processing status of a contract.
///
/// `Pending -> Processing -> {Completed, Failed}`. Terminal states absorb every
/// further transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ContractStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            ContractStatus::Pending => 0,
            ContractStatus::Processing => 1,
            ContractStatus::Completed | ContractStatus::Failed => 2,
        }
    }

    /// Forward-only: a non-terminal status may move to any strictly later stage.
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractStatus::Pending => write!(f, "pending"),
            ContractStatus::Processing => write!(f, "processing"),
            ContractStatus::Completed => write!(f, "completed"),
            ContractStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ContractStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ContractStatus::Pending),
            "processing" => Ok(ContractStatus::Processing),
            "completed" => Ok(ContractStatus::Completed),
            "failed" => Ok(ContractStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid contract status: {}", s)),
        }
    }
}

/// Contract - one uploaded document and the state of its extraction job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub filename: String,
    pub tenant: String,
    /// Time-boxed URL of the stored artifact, handed to the extraction provider
    #[serde(rename = "pdf_url")]
    pub source_url: String,
    pub status: ContractStatus,
    /// Provider job id, set once the remote job exists
    #[serde(rename = "mineru_task_id", skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<String>,
    /// Extraction output, only ever present when Completed
    #[serde(rename = "json_data", skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure description, only ever present when Failed
    #[serde(rename = "error_msg", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// New pending contract stamped with the current time.
    pub fn new(
        id: ContractId,
        tenant: impl Into<String>,
        filename: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename: filename.into(),
            tenant: tenant.into(),
            source_url: source_url.into(),
            status: ContractStatus::Pending,
            external_job_id: None,
            result: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Override the creation time (and reset `updated_at` to match).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// Storage key of the uploaded artifact.
    pub fn object_name(&self) -> String {
        format!("{}/{}/{}", self.tenant, self.id, self.filename)
    }

    pub fn summary(&self) -> ContractSummary {
        ContractSummary {
            id: self.id,
            filename: self.filename.clone(),
            status: self.status,
            source_url: self.source_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// List view of a contract (no extraction payload).
#[derive(Debug, Clone, Serialize)]
pub struct ContractSummary {
    pub id: ContractId,
    pub filename: String,
    pub status: ContractStatus,
    #[serde(rename = "pdf_url")]
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

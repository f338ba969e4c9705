use serde::{Deserialize, Serialize};

/// Body of `POST /extract/task`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRequest {
    pub url: String,
    pub model_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
}

/// Wrapper for MinerU API responses. A non-zero `code` is a failure even on HTTP 200.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskCreated {
    pub task_id: String,
}

/// Provider-side task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Converting,
    Done,
    Failed,
    /// Any state string this client does not know yet
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractProgress {
    #[serde(default)]
    pub extracted_pages: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub start_time: Option<String>,
}

/// Data section of `GET /extract/task/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    #[serde(default)]
    pub data_id: Option<String>,
    pub state: TaskState,
    #[serde(default)]
    pub full_zip_url: Option<String>,
    #[serde(default)]
    pub err_msg: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub extract_progress: Option<ExtractProgress>,
}

/// Raw callback body as POSTed by MinerU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    pub checksum: String,
    /// JSON document serialized as a string; parse into [`CallbackContent`]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPage {
    #[serde(default)]
    pub page_no: u32,
    #[serde(default)]
    pub md_url: Option<String>,
    #[serde(default)]
    pub json_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackContent {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub data_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub full_pages: Vec<CallbackPage>,
    #[serde(default)]
    pub err_msg: Option<String>,
}

impl CallbackContent {
    /// First non-empty JSON result URL, if the callback carried one.
    pub fn result_json_url(&self) -> Option<&str> {
        self.full_pages
            .first()
            .and_then(|p| p.json_url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

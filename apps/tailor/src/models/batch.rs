use serde::{Deserialize, Serialize};

/// Per-item lifecycle of a batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl BatchStatus {
    /// Pending and processing items have not reached a terminal state.
    pub fn is_active(self) -> bool {
        matches!(self, BatchStatus::Pending | BatchStatus::Processing)
    }
}

/// Caller-visible status of one job URL in a batch. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub job_url: String,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailored_resume_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl BatchResult {
    pub fn pending(job_url: impl Into<String>) -> Self {
        Self {
            job_url: job_url.into(),
            status: BatchStatus::Pending,
            error: None,
            tailored_resume_id: None,
            company: None,
            title: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Success
    }
}

/// Body of the batch tailoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorBatchRequest {
    pub base_resume_id: i64,
    pub job_urls: Vec<String>,
}

/// One backend result, positionally aligned with the request's `job_urls`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchItemOutcome {
    pub success: bool,
    pub tailored_resume_id: Option<i64>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TailorBatchResponse {
    pub results: Vec<BatchItemOutcome>,
}

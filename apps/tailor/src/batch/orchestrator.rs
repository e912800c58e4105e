//! Batch tailoring: one request covering several job URLs against one base
//! resume, reconciled positionally into per-item results.
//!
//! Flow: all items pending → all items processing → single backend call →
//! result `i` maps onto job URL `i`. Anything the backend did not answer for
//! becomes an error; nothing is retried.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::api_client::{ApiError, Backend};
use crate::errors::ClientError;
use crate::models::batch::{
    BatchItemOutcome, BatchResult, BatchStatus, TailorBatchRequest, TailorBatchResponse,
};

/// Upper bound on job URLs per batch.
pub const MAX_BATCH_JOBS: usize = 10;

/// Per-item message when the backend gave no reason.
pub const ITEM_FALLBACK_ERROR: &str = "Failed to tailor";

/// Whole-batch message when the backend rejected the request without a reason.
pub const BATCH_FALLBACK_ERROR: &str = "Batch tailoring failed";

/// Caller-side validation run before `submit_batch`: trims entries, drops
/// blanks, and enforces `1..=max_jobs` remaining URLs.
pub fn validate_job_urls(raw: &[String], max_jobs: usize) -> Result<Vec<String>, ClientError> {
    let urls: Vec<String> = raw
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(ClientError::Validation(
            "Enter at least one job URL".to_string(),
        ));
    }
    if urls.len() > max_jobs {
        return Err(ClientError::Validation(format!(
            "A batch can contain at most {max_jobs} job URLs (got {})",
            urls.len()
        )));
    }
    Ok(urls)
}

/// Stateless: every call starts a fresh result list.
#[derive(Clone)]
pub struct BatchOrchestrator {
    backend: Arc<dyn Backend>,
}

impl BatchOrchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Submits the batch and returns one result per input URL, in input order.
    pub async fn submit_batch(&self, base_resume_id: i64, job_urls: &[String]) -> Vec<BatchResult> {
        let (progress, _) = watch::channel(Vec::new());
        self.submit_batch_observed(base_resume_id, job_urls, &progress)
            .await
    }

    /// Like `submit_batch`, publishing the pending, processing and final
    /// states of the whole list on `progress`.
    pub async fn submit_batch_observed(
        &self,
        base_resume_id: i64,
        job_urls: &[String],
        progress: &watch::Sender<Vec<BatchResult>>,
    ) -> Vec<BatchResult> {
        let mut results: Vec<BatchResult> = job_urls.iter().map(BatchResult::pending).collect();
        progress.send_replace(results.clone());

        // Single request, so every item moves to processing together
        for result in &mut results {
            result.status = BatchStatus::Processing;
        }
        progress.send_replace(results.clone());

        info!(
            "Submitting batch of {} job URLs for base resume {}",
            job_urls.len(),
            base_resume_id
        );
        let request = TailorBatchRequest {
            base_resume_id,
            job_urls: job_urls.to_vec(),
        };

        match self.backend.tailor_resume_batch(&request).await {
            Ok(response) => reconcile(&mut results, response),
            Err(e) => {
                warn!("Batch tailoring for base resume {base_resume_id} failed: {e}");
                let message = match e {
                    ApiError::Rejected(reason) => {
                        reason.unwrap_or_else(|| BATCH_FALLBACK_ERROR.to_string())
                    }
                    other => other.to_string(),
                };
                for result in &mut results {
                    mark_error(result, message.clone());
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            "Batch for base resume {} finished: {}/{} tailored",
            base_resume_id,
            succeeded,
            results.len()
        );
        progress.send_replace(results.clone());
        results
    }
}

/// Result `i` belongs to job URL `i`. Positions past the end of the response
/// are failures.
fn reconcile(results: &mut [BatchResult], response: TailorBatchResponse) {
    if response.results.len() != results.len() {
        warn!(
            "Batch response has {} results for {} job URLs",
            response.results.len(),
            results.len()
        );
    }

    let mut outcomes = response.results.into_iter();
    for result in results.iter_mut() {
        match outcomes.next() {
            Some(BatchItemOutcome {
                success: true,
                tailored_resume_id,
                company,
                title,
                ..
            }) => {
                result.status = BatchStatus::Success;
                result.error = None;
                result.tailored_resume_id = tailored_resume_id;
                result.company = company;
                result.title = title;
            }
            Some(BatchItemOutcome { error, .. }) => {
                mark_error(result, error.unwrap_or_else(|| ITEM_FALLBACK_ERROR.to_string()))
            }
            None => mark_error(result, ITEM_FALLBACK_ERROR.to_string()),
        }
    }
}

fn mark_error(result: &mut BatchResult, message: String) {
    result.status = BatchStatus::Error;
    result.error = Some(message);
}

// Batch tailoring: one request for many job URLs, reconciled per item.

pub mod orchestrator;

pub use orchestrator::{validate_job_urls, BatchOrchestrator, MAX_BATCH_JOBS};

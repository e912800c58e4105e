//! Debounced best-effort sync of annotation fields to the backend.
//!
//! One timer per (tailored resume, field). Rescheduling a field aborts its
//! pending timer, so a burst of edits produces a single call carrying the last
//! value. Once a timer has fired its call is left to finish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api_client::Backend;
use crate::models::annotations::AnnotationField;

type SyncKey = (i64, AnnotationField);

struct PendingSync {
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SyncState {
    pending: HashMap<SyncKey, PendingSync>,
    in_flight: Vec<JoinHandle<()>>,
}

pub struct SyncDebouncer {
    backend: Arc<dyn Backend>,
    delay: Duration,
    state: Mutex<SyncState>,
}

impl SyncDebouncer {
    pub fn new(backend: Arc<dyn Backend>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            state: Mutex::new(SyncState::default()),
        }
    }

    /// (Re)starts the timer for one field. Must be called within a tokio runtime.
    pub fn schedule(
        &self,
        tailored_resume_id: i64,
        field: AnnotationField,
        interview_prep_id: i64,
        value: Value,
    ) {
        let fired = Arc::new(AtomicBool::new(false));
        let handle = {
            let backend = Arc::clone(&self.backend);
            let fired = Arc::clone(&fired);
            let delay = self.delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                fired.store(true, Ordering::SeqCst);

                let mut user_data = Map::new();
                user_data.insert(field.sync_name().to_string(), value);
                match backend
                    .cache_interview_prep_data(interview_prep_id, user_data)
                    .await
                {
                    Ok(()) => debug!(
                        "Synced {} for interview prep {}",
                        field.sync_name(),
                        interview_prep_id
                    ),
                    Err(e) => warn!(
                        "Sync of {} for interview prep {} failed: {}",
                        field.sync_name(),
                        interview_prep_id,
                        e
                    ),
                }
            })
        };

        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let key = (tailored_resume_id, field);
        if let Some(previous) = state.pending.insert(key, PendingSync { fired, handle }) {
            if previous.fired.load(Ordering::SeqCst) {
                state.in_flight.push(previous.handle);
            } else {
                previous.handle.abort();
            }
        }
        state.in_flight.retain(|handle| !handle.is_finished());
    }

    /// Number of fields with a timer that has not fired yet.
    pub fn pending_count(&self) -> usize {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state
            .pending
            .values()
            .filter(|pending| !pending.fired.load(Ordering::SeqCst))
            .count()
    }

    /// Waits until every scheduled sync has fired and completed.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut handles: Vec<_> = state.pending.drain().map(|(_, p)| p.handle).collect();
            handles.append(&mut state.in_flight);
            handles
        };
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Annotation sync task failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::mock::MockBackend;
    use serde_json::json;

    fn debouncer() -> (Arc<MockBackend>, SyncDebouncer) {
        let backend = Arc::new(MockBackend::new());
        let debouncer = SyncDebouncer::new(backend.clone(), Duration::from_millis(500));
        (backend, debouncer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_sends_only_last_value() {
        let (backend, debouncer) = debouncer();

        for text in ["A", "Ac", "Acm", "Acme"] {
            debouncer.schedule(42, AnnotationField::Notes, 7, json!({ "company": text }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(backend.sync_calls().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;

        let calls = backend.sync_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 7);
        assert_eq!(calls[0].1["notes"], json!({ "company": "Acme" }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fields_have_independent_timers() {
        let (backend, debouncer) = debouncer();

        debouncer.schedule(42, AnnotationField::Notes, 7, json!({ "role": "x" }));
        debouncer.schedule(42, AnnotationField::CheckedItems, 7, json!({ "c1": true }));
        assert_eq!(debouncer.pending_count(), 2);

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(backend.sync_calls().len(), 2);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_field_on_different_records_is_not_coalesced() {
        let (backend, debouncer) = debouncer();

        debouncer.schedule(1, AnnotationField::InterviewDate, 10, json!("2026-11-03"));
        debouncer.schedule(2, AnnotationField::InterviewDate, 20, json!("2026-11-04"));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let mut prep_ids: Vec<i64> = backend.sync_calls().iter().map(|(id, _)| *id).collect();
        prep_ids.sort();
        assert_eq!(prep_ids, vec![10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_pending_timers() {
        let (backend, debouncer) = debouncer();

        debouncer.schedule(42, AnnotationField::Notes, 7, json!({}));
        debouncer.flush().await;

        assert_eq!(backend.sync_calls().len(), 1);
    }
}

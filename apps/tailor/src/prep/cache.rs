//! Process-wide, keyed cache of interview prep records.
//!
//! Flow on a miss: base fetch → store record (all slots `loading`) → spawn one
//! independent task per sub-analysis → each task writes back only its own slot.
//!
//! Staleness: every stored record gets a fresh `generation`; sub-fetch results
//! for any other generation are dropped. `refresh` and `delete` also bump a
//! per-key epoch so base fetches issued before them cannot write back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api_client::{ApiError, Backend, SubAnalysisKind};
use crate::errors::ClientError;
use crate::models::annotations::{AnnotationField, Annotations, CustomQuestion};
use crate::models::prep::PrepPayload;
use crate::prep::events::PrepEvent;
use crate::prep::record::{PrepRecord, SubAnalysisData};
use crate::prep::sync::SyncDebouncer;
use crate::storage::LocalStore;

const EVENT_CAPACITY: usize = 256;

/// Base-fetch state of one key, independent of the sub-analysis slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepStatus {
    loads_in_flight: u32,
    generations_in_flight: u32,
    error: Option<String>,
}

impl PrepStatus {
    /// A load or refresh is fetching the base record.
    pub fn is_loading(&self) -> bool {
        self.loads_in_flight > 0
    }

    /// A user-initiated generation is running.
    pub fn is_generating(&self) -> bool {
        self.generations_in_flight > 0
    }

    /// Reason the last base fetch or generation failed, cleared on the next attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseOp {
    Load,
    Generate,
}

enum Settled {
    Stored(PrepRecord),
    Kept(PrepRecord),
    Failed(ClientError),
}

#[derive(Default)]
struct CacheState {
    records: HashMap<i64, PrepRecord>,
    status: HashMap<i64, PrepStatus>,
    epochs: HashMap<i64, u64>,
    annotations: HashMap<i64, Annotations>,
}

impl CacheState {
    fn epoch(&self, id: i64) -> u64 {
        self.epochs.get(&id).copied().unwrap_or(0)
    }

    fn invalidate(&mut self, id: i64) -> Option<PrepRecord> {
        *self.epochs.entry(id).or_insert(0) += 1;
        self.records.remove(&id)
    }
}

struct Inner {
    backend: Arc<dyn Backend>,
    store: Arc<dyn LocalStore>,
    state: Mutex<CacheState>,
    fetch_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    /// Held from an annotation edit through its device write, per field.
    edit_locks: Mutex<HashMap<(i64, AnnotationField), Arc<tokio::sync::Mutex<()>>>>,
    next_generation: AtomicU64,
    events: broadcast::Sender<PrepEvent>,
    sync: SyncDebouncer,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, CacheState> {
        // State mutations never panic mid-way; a poisoned lock still holds consistent data
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: PrepEvent) {
        let _ = self.events.send(event);
    }

    fn resolve_slot(
        &self,
        tailored_resume_id: i64,
        generation: u64,
        kind: SubAnalysisKind,
        outcome: Result<SubAnalysisData, ApiError>,
    ) {
        let populated = {
            let mut state = self.state();
            let record = match state.records.get_mut(&tailored_resume_id) {
                Some(record) if record.generation == generation => record,
                _ => {
                    debug!(
                        "Dropping stale {:?} result for tailored resume {} (generation {})",
                        kind, tailored_resume_id, generation
                    );
                    return;
                }
            };
            match outcome {
                Ok(data) => {
                    record.apply(data);
                    true
                }
                Err(e) => {
                    warn!(
                        "{:?} failed for interview prep {}: {}",
                        kind, record.interview_prep_id, e
                    );
                    record.fail(kind);
                    false
                }
            }
        };

        self.emit(PrepEvent::SlotUpdated {
            tailored_resume_id,
            kind,
            populated,
        });
    }
}

/// Keyed interview prep cache shared by every screen.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct PrepCache {
    inner: Arc<Inner>,
}

impl PrepCache {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn LocalStore>,
        sync_debounce: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let sync = SyncDebouncer::new(Arc::clone(&backend), sync_debounce);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                state: Mutex::new(CacheState::default()),
                fetch_locks: Mutex::new(HashMap::new()),
                edit_locks: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                events,
                sync,
            }),
        }
    }

    /// Subscribes to change notifications. Lagging receivers miss events but
    /// can always re-read current state.
    pub fn subscribe(&self) -> broadcast::Receiver<PrepEvent> {
        self.inner.events.subscribe()
    }

    /// Cached record, if any. Never touches the network.
    pub fn get(&self, tailored_resume_id: i64) -> Option<PrepRecord> {
        self.inner.state().records.get(&tailored_resume_id).cloned()
    }

    pub fn status(&self, tailored_resume_id: i64) -> PrepStatus {
        self.inner
            .state()
            .status
            .get(&tailored_resume_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the cached record, fetching it on a miss.
    ///
    /// Concurrent loads of the same key share one network request. On failure
    /// nothing is cached and the reason is kept in `status().error()`.
    pub async fn load(&self, tailored_resume_id: i64) -> Result<PrepRecord, ClientError> {
        if let Some(record) = self.get(tailored_resume_id) {
            debug!("Interview prep cache hit for tailored resume {tailored_resume_id}");
            return Ok(record);
        }

        let lock = self.fetch_lock(tailored_resume_id);
        let _guard = lock.lock().await;

        if let Some(record) = self.get(tailored_resume_id) {
            return Ok(record);
        }
        self.fetch_base(tailored_resume_id, BaseOp::Load).await
    }

    /// `load` for callers that can carry on without a record, such as an
    /// annotation edit made before any prep exists. Failures are logged.
    pub async fn try_load(&self, tailored_resume_id: i64) -> Option<PrepRecord> {
        match self.load(tailored_resume_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(
                    "No interview prep for tailored resume {tailored_resume_id}: {}",
                    e.user_message()
                );
                None
            }
        }
    }

    /// Runs the full generation pipeline on the backend and replaces any cached record.
    pub async fn generate(&self, tailored_resume_id: i64) -> Result<PrepRecord, ClientError> {
        info!("Generating interview prep for tailored resume {tailored_resume_id}");
        self.fetch_base(tailored_resume_id, BaseOp::Generate).await
    }

    /// Drops the cached record and everything derived from it, then loads again
    /// from the network.
    pub async fn refresh(&self, tailored_resume_id: i64) -> Result<PrepRecord, ClientError> {
        let removed = self.inner.state().invalidate(tailored_resume_id).is_some();
        if removed {
            self.inner.emit(PrepEvent::RecordRemoved { tailored_resume_id });
        }

        let lock = self.fetch_lock(tailored_resume_id);
        let _guard = lock.lock().await;
        self.fetch_base(tailored_resume_id, BaseOp::Load).await
    }

    /// Deletes the prep on the backend. The cached record is only dropped when
    /// the backend confirms. Device-local annotations are kept.
    pub async fn delete(&self, tailored_resume_id: i64) -> Result<bool, ClientError> {
        let confirmed = self
            .inner
            .backend
            .delete_interview_prep(tailored_resume_id)
            .await?;

        if confirmed {
            {
                let mut state = self.inner.state();
                state.invalidate(tailored_resume_id);
                state.status.remove(&tailored_resume_id);
            }
            info!("Deleted interview prep for tailored resume {tailored_resume_id}");
            self.inner.emit(PrepEvent::RecordRemoved { tailored_resume_id });
        } else {
            warn!("Backend did not confirm deletion of interview prep for tailored resume {tailored_resume_id}");
        }
        Ok(confirmed)
    }

    /// Number of STAR stories linked to a tailored resume. Not cached.
    pub async fn star_story_count(&self, tailored_resume_id: i64) -> Result<usize, ClientError> {
        Ok(self
            .inner
            .backend
            .list_star_stories(tailored_resume_id)
            .await?
            .len())
    }

    fn fetch_lock(&self, tailored_resume_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.inner.fetch_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(tailored_resume_id).or_default())
    }

    fn edit_lock(
        &self,
        tailored_resume_id: i64,
        field: AnnotationField,
    ) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.inner.edit_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry((tailored_resume_id, field)).or_default())
    }

    async fn fetch_base(&self, tailored_resume_id: i64, op: BaseOp) -> Result<PrepRecord, ClientError> {
        let epoch = {
            let mut state = self.inner.state();
            let status = state.status.entry(tailored_resume_id).or_default();
            match op {
                BaseOp::Load => status.loads_in_flight += 1,
                BaseOp::Generate => status.generations_in_flight += 1,
            }
            status.error = None;
            state.epoch(tailored_resume_id)
        };
        self.inner.emit(PrepEvent::StatusChanged { tailored_resume_id });

        let result = match op {
            BaseOp::Load => self.inner.backend.get_interview_prep(tailored_resume_id).await,
            BaseOp::Generate => {
                self.inner
                    .backend
                    .generate_interview_prep(tailored_resume_id)
                    .await
            }
        };

        self.settle(tailored_resume_id, epoch, op, result)
    }

    fn settle(
        &self,
        tailored_resume_id: i64,
        epoch: u64,
        op: BaseOp,
        result: Result<PrepPayload, ApiError>,
    ) -> Result<PrepRecord, ClientError> {
        let outcome = {
            let mut state = self.inner.state();
            let current = state.epoch(tailored_resume_id) == epoch;
            let existing = state.records.get(&tailored_resume_id).cloned();
            let status = state.status.entry(tailored_resume_id).or_default();
            match op {
                BaseOp::Load => status.loads_in_flight = status.loads_in_flight.saturating_sub(1),
                BaseOp::Generate => {
                    status.generations_in_flight = status.generations_in_flight.saturating_sub(1)
                }
            }

            match (result, existing) {
                (Err(e), _) => {
                    if current {
                        status.error = Some(e.to_string());
                    }
                    Settled::Failed(ClientError::Api(e))
                }
                (Ok(_), _) if !current => Settled::Failed(ClientError::Superseded(tailored_resume_id)),
                // A generation finished while this load was in flight; it is newer
                (Ok(_), Some(existing)) if op == BaseOp::Load => Settled::Kept(existing),
                (Ok(payload), _) => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
                    let mut record = PrepRecord::new(tailored_resume_id, payload, generation);
                    for kind in SubAnalysisKind::ALL {
                        record.start(kind);
                    }
                    state.records.insert(tailored_resume_id, record.clone());
                    Settled::Stored(record)
                }
            }
        };

        self.inner.emit(PrepEvent::StatusChanged { tailored_resume_id });

        match outcome {
            Settled::Stored(record) => {
                info!(
                    "Stored interview prep {} for tailored resume {} (generation {})",
                    record.interview_prep_id, tailored_resume_id, record.generation
                );
                self.inner.emit(PrepEvent::RecordStored {
                    tailored_resume_id,
                    interview_prep_id: record.interview_prep_id,
                    generation: record.generation,
                });
                self.spawn_sub_fetches(&record);
                Ok(record)
            }
            Settled::Kept(record) => Ok(record),
            Settled::Failed(ClientError::Superseded(id)) => {
                debug!("Discarding base fetch for tailored resume {id}: invalidated while in flight");
                Err(ClientError::Superseded(id))
            }
            Settled::Failed(e) => {
                warn!(
                    "Interview prep {:?} failed for tailored resume {}: {}",
                    op, tailored_resume_id, e
                );
                Err(e)
            }
        }
    }

    /// Fire-and-forget: one task per slot, none awaited by the caller.
    fn spawn_sub_fetches(&self, record: &PrepRecord) {
        let tailored_resume_id = record.tailored_resume_id;
        let interview_prep_id = record.interview_prep_id;
        let generation = record.generation;

        for kind in SubAnalysisKind::ALL {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                let outcome =
                    fetch_sub_analysis(inner.backend.as_ref(), kind, interview_prep_id).await;
                inner.resolve_slot(tailored_resume_id, generation, kind, outcome);
            });
        }
    }

    // ── Annotations ──────────────────────────────────────────────────────────

    /// In-memory annotations. Empty until hydrated or first edited.
    pub fn annotations(&self, tailored_resume_id: i64) -> Annotations {
        self.inner
            .state()
            .annotations
            .get(&tailored_resume_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Loads annotations from device storage once per key.
    /// Corrupt stored fields are logged and reset rather than failing the screen.
    pub async fn hydrate_annotations(
        &self,
        tailored_resume_id: i64,
    ) -> Result<Annotations, ClientError> {
        let cached = self
            .inner
            .state()
            .annotations
            .get(&tailored_resume_id)
            .cloned();
        if let Some(annotations) = cached {
            return Ok(annotations);
        }

        let mut loaded = Annotations::default();
        for field in AnnotationField::ALL {
            let key = field.storage_key(tailored_resume_id);
            if let Some(raw) = self.inner.store.get(&key).await? {
                if let Err(e) = loaded.set_field_from_json(field, &raw) {
                    warn!("Discarding corrupt local value for {key}: {e}");
                    self.inner.store.remove(&key).await?;
                }
            }
        }

        let mut state = self.inner.state();
        Ok(state
            .annotations
            .entry(tailored_resume_id)
            .or_insert(loaded)
            .clone())
    }

    /// Flips a checklist item and returns its new state.
    pub async fn toggle_check(
        &self,
        tailored_resume_id: i64,
        item_id: &str,
    ) -> Result<bool, ClientError> {
        self.mutate_annotations(tailored_resume_id, AnnotationField::CheckedItems, |a| {
            let checked = a.checked_items.entry(item_id.to_string()).or_insert(false);
            *checked = !*checked;
            Ok(*checked)
        })
        .await
    }

    pub async fn update_note(
        &self,
        tailored_resume_id: i64,
        section_id: &str,
        text: &str,
    ) -> Result<(), ClientError> {
        self.mutate_annotations(tailored_resume_id, AnnotationField::Notes, |a| {
            a.notes.insert(section_id.to_string(), text.to_string());
            Ok(())
        })
        .await
    }

    pub async fn add_custom_question(
        &self,
        tailored_resume_id: i64,
        question: &str,
        category: &str,
    ) -> Result<CustomQuestion, ClientError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::Validation("Question cannot be empty".to_string()));
        }
        let custom = CustomQuestion {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            category: category.trim().to_string(),
        };
        self.mutate_annotations(tailored_resume_id, AnnotationField::CustomQuestions, |a| {
            a.custom_questions.push(custom.clone());
            Ok(custom)
        })
        .await
    }

    /// Removes a custom question; returns whether it existed.
    pub async fn delete_custom_question(
        &self,
        tailored_resume_id: i64,
        question_id: &str,
    ) -> Result<bool, ClientError> {
        self.mutate_annotations(tailored_resume_id, AnnotationField::CustomQuestions, |a| {
            let before = a.custom_questions.len();
            a.custom_questions.retain(|q| q.id != question_id);
            Ok(a.custom_questions.len() != before)
        })
        .await
    }

    /// Sets the interview date (`YYYY-MM-DD`); an empty string clears it.
    pub async fn save_interview_date(
        &self,
        tailored_resume_id: i64,
        date: &str,
    ) -> Result<(), ClientError> {
        let date = date.trim();
        if !date.is_empty() && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(ClientError::Validation(format!(
                "Interview date '{date}' is not a YYYY-MM-DD date"
            )));
        }
        self.mutate_annotations(tailored_resume_id, AnnotationField::InterviewDate, |a| {
            a.interview_date = date.to_string();
            Ok(())
        })
        .await
    }

    /// Waits for every scheduled annotation sync to fire and complete.
    pub async fn flush_pending_syncs(&self) {
        self.inner.sync.flush().await;
    }

    /// Local-first edit: memory, then device storage; the backend sync is
    /// debounced and skipped while no interview prep id is known.
    ///
    /// Edits to one field are serialized up to their device write, so the
    /// stored value and the last scheduled sync always match memory.
    async fn mutate_annotations<R>(
        &self,
        tailored_resume_id: i64,
        field: AnnotationField,
        edit: impl FnOnce(&mut Annotations) -> Result<R, ClientError>,
    ) -> Result<R, ClientError> {
        self.hydrate_annotations(tailored_resume_id).await?;

        let lock = self.edit_lock(tailored_resume_id, field);
        let _guard = lock.lock().await;

        let (output, value, interview_prep_id) = {
            let mut state = self.inner.state();
            let annotations = state.annotations.entry(tailored_resume_id).or_default();
            let output = edit(annotations)?;
            let value = annotations.field_value(field)?;
            let interview_prep_id = state
                .records
                .get(&tailored_resume_id)
                .map(|record| record.interview_prep_id);
            (output, value, interview_prep_id)
        };
        self.inner.emit(PrepEvent::AnnotationsChanged {
            tailored_resume_id,
            field,
        });

        match interview_prep_id {
            Some(prep_id) => {
                self.inner
                    .sync
                    .schedule(tailored_resume_id, field, prep_id, value.clone())
            }
            None => debug!(
                "No interview prep yet for tailored resume {}; {} kept local only",
                tailored_resume_id,
                field.sync_name()
            ),
        }

        self.inner
            .store
            .set(&field.storage_key(tailored_resume_id), &value.to_string())
            .await?;
        Ok(output)
    }
}

async fn fetch_sub_analysis(
    backend: &dyn Backend,
    kind: SubAnalysisKind,
    interview_prep_id: i64,
) -> Result<SubAnalysisData, ApiError> {
    Ok(match kind {
        SubAnalysisKind::ReadinessScore => SubAnalysisData::ReadinessScore(
            backend.get_interview_readiness_score(interview_prep_id).await?,
        ),
        SubAnalysisKind::ValuesAlignment => SubAnalysisData::ValuesAlignment(
            backend.get_values_alignment(interview_prep_id).await?,
        ),
        SubAnalysisKind::CompanyResearch => SubAnalysisData::CompanyResearch(
            backend.get_company_research(interview_prep_id).await?,
        ),
        SubAnalysisKind::StrategicNews => {
            SubAnalysisData::StrategicNews(backend.get_strategic_news(interview_prep_id).await?)
        }
        SubAnalysisKind::CompetitiveIntelligence => SubAnalysisData::CompetitiveIntelligence(
            backend.get_competitive_intelligence(interview_prep_id).await?,
        ),
        SubAnalysisKind::InterviewStrategy => SubAnalysisData::InterviewStrategy(
            backend.get_interview_strategy(interview_prep_id).await?,
        ),
        SubAnalysisKind::ExecutiveInsights => SubAnalysisData::ExecutiveInsights(
            backend.get_executive_insights(interview_prep_id).await?,
        ),
        SubAnalysisKind::Certifications => SubAnalysisData::Certifications(
            backend
                .get_certification_recommendations(interview_prep_id)
                .await?,
        ),
    })
}

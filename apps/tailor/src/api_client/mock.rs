//! In-memory `Backend` for unit tests: records every call, serves canned
//! replies, and can hold individual endpoints until a test releases them.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::api_client::{ApiError, Backend, StarStory, SubAnalysisKind};
use crate::models::analysis::{
    CertificationRecommendations, CompanyResearch, CompetitiveIntelligence, ExecutiveInsights,
    InterviewStrategy, NewsItem, ReadinessScore, ValuesAlignment,
};
use crate::models::batch::{TailorBatchRequest, TailorBatchResponse};
use crate::models::prep::{CompanyProfile, PrepData, PrepPayload};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetPrep(i64),
    GeneratePrep(i64),
    DeletePrep(i64),
    SubAnalysis(SubAnalysisKind, i64),
    Sync(i64, Map<String, Value>),
    Batch(TailorBatchRequest),
    StarStories(i64),
}

#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    Rejected(Option<String>),
    Transport(String),
}

impl<T: Clone> Reply<T> {
    fn to_result(&self) -> Result<T, ApiError> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Rejected(reason) => Err(ApiError::Rejected(reason.clone())),
            Reply::Transport(message) => Err(ApiError::Transport(message.clone())),
        }
    }
}

/// Which endpoints are currently held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Base,
    Slot(SubAnalysisKind),
    Batch,
}

pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    /// tailored resume id -> interview prep id served by get/generate
    prep: Mutex<HashMap<i64, Reply<i64>>>,
    generate: Mutex<HashMap<i64, Reply<i64>>>,
    failing_slots: Mutex<HashSet<SubAnalysisKind>>,
    batch: Mutex<Reply<TailorBatchResponse>>,
    delete_confirms: Mutex<bool>,
    star_stories: Mutex<usize>,
    held: watch::Sender<HashSet<Gate>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        let (held, _) = watch::channel(HashSet::new());
        Self {
            calls: Mutex::new(Vec::new()),
            prep: Mutex::new(HashMap::new()),
            generate: Mutex::new(HashMap::new()),
            failing_slots: Mutex::new(HashSet::new()),
            batch: Mutex::new(Reply::Ok(TailorBatchResponse::default())),
            delete_confirms: Mutex::new(true),
            star_stories: Mutex::new(0),
            held,
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prep(&self, tailored_resume_id: i64, reply: Reply<i64>) {
        self.prep.lock().unwrap().insert(tailored_resume_id, reply);
    }

    pub fn set_generate(&self, tailored_resume_id: i64, reply: Reply<i64>) {
        self.generate
            .lock()
            .unwrap()
            .insert(tailored_resume_id, reply);
    }

    pub fn fail_slot(&self, kind: SubAnalysisKind) {
        self.failing_slots.lock().unwrap().insert(kind);
    }

    pub fn set_batch(&self, reply: Reply<TailorBatchResponse>) {
        *self.batch.lock().unwrap() = reply;
    }

    pub fn set_delete_confirms(&self, confirms: bool) {
        *self.delete_confirms.lock().unwrap() = confirms;
    }

    pub fn set_star_stories(&self, count: usize) {
        *self.star_stories.lock().unwrap() = count;
    }

    pub fn hold(&self, gate: Gate) {
        self.held.send_modify(|held| {
            held.insert(gate);
        });
    }

    pub fn release(&self, gate: Gate) {
        self.held.send_modify(|held| {
            held.remove(&gate);
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn sync_calls(&self) -> Vec<(i64, Map<String, Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Sync(id, data) => Some((id, data)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_for(&self, gate: Gate) {
        let mut rx = self.held.subscribe();
        let _ = rx.wait_for(|held| !held.contains(&gate)).await;
    }

    async fn slot_reply(&self, kind: SubAnalysisKind, interview_prep_id: i64) -> Result<(), ApiError> {
        self.record(Call::SubAnalysis(kind, interview_prep_id));
        self.wait_for(Gate::Slot(kind)).await;
        if self.failing_slots.lock().unwrap().contains(&kind) {
            return Err(ApiError::Transport(format!("{} unavailable", kind.path_segment())));
        }
        Ok(())
    }
}

pub fn payload(tailored_resume_id: i64, interview_prep_id: i64) -> PrepPayload {
    PrepPayload {
        interview_prep_id,
        prep_data: PrepData {
            company_profile: CompanyProfile {
                name: format!("Company {tailored_resume_id}"),
                ..Default::default()
            },
            ..Default::default()
        },
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn get_interview_prep(&self, tailored_resume_id: i64) -> Result<PrepPayload, ApiError> {
        self.record(Call::GetPrep(tailored_resume_id));
        self.wait_for(Gate::Base).await;
        let reply = self
            .prep
            .lock()
            .unwrap()
            .get(&tailored_resume_id)
            .cloned()
            .unwrap_or(Reply::Rejected(Some("No interview prep found".to_string())));
        reply
            .to_result()
            .map(|prep_id| payload(tailored_resume_id, prep_id))
    }

    async fn generate_interview_prep(
        &self,
        tailored_resume_id: i64,
    ) -> Result<PrepPayload, ApiError> {
        self.record(Call::GeneratePrep(tailored_resume_id));
        self.wait_for(Gate::Base).await;
        let reply = self
            .generate
            .lock()
            .unwrap()
            .get(&tailored_resume_id)
            .cloned()
            .unwrap_or(Reply::Rejected(Some("Generation failed".to_string())));
        reply
            .to_result()
            .map(|prep_id| payload(tailored_resume_id, prep_id))
    }

    async fn delete_interview_prep(&self, tailored_resume_id: i64) -> Result<bool, ApiError> {
        self.record(Call::DeletePrep(tailored_resume_id));
        Ok(*self.delete_confirms.lock().unwrap())
    }

    async fn get_interview_readiness_score(
        &self,
        interview_prep_id: i64,
    ) -> Result<ReadinessScore, ApiError> {
        self.slot_reply(SubAnalysisKind::ReadinessScore, interview_prep_id)
            .await?;
        Ok(ReadinessScore {
            overall_score: interview_prep_id as f64,
            readiness_level: "ready".to_string(),
            ..Default::default()
        })
    }

    async fn get_values_alignment(
        &self,
        interview_prep_id: i64,
    ) -> Result<ValuesAlignment, ApiError> {
        self.slot_reply(SubAnalysisKind::ValuesAlignment, interview_prep_id)
            .await?;
        Ok(ValuesAlignment {
            alignment_score: 0.8,
            ..Default::default()
        })
    }

    async fn get_company_research(
        &self,
        interview_prep_id: i64,
    ) -> Result<CompanyResearch, ApiError> {
        self.slot_reply(SubAnalysisKind::CompanyResearch, interview_prep_id)
            .await?;
        Ok(CompanyResearch {
            summary: format!("Research for prep {interview_prep_id}"),
            ..Default::default()
        })
    }

    async fn get_strategic_news(&self, interview_prep_id: i64) -> Result<Vec<NewsItem>, ApiError> {
        self.slot_reply(SubAnalysisKind::StrategicNews, interview_prep_id)
            .await?;
        Ok(vec![NewsItem {
            title: "Quarterly results".to_string(),
            ..Default::default()
        }])
    }

    async fn get_competitive_intelligence(
        &self,
        interview_prep_id: i64,
    ) -> Result<CompetitiveIntelligence, ApiError> {
        self.slot_reply(SubAnalysisKind::CompetitiveIntelligence, interview_prep_id)
            .await?;
        Ok(CompetitiveIntelligence {
            market_position: "leader".to_string(),
            ..Default::default()
        })
    }

    async fn get_interview_strategy(
        &self,
        interview_prep_id: i64,
    ) -> Result<InterviewStrategy, ApiError> {
        self.slot_reply(SubAnalysisKind::InterviewStrategy, interview_prep_id)
            .await?;
        Ok(InterviewStrategy {
            overall_approach: "Lead with impact".to_string(),
            ..Default::default()
        })
    }

    async fn get_executive_insights(
        &self,
        interview_prep_id: i64,
    ) -> Result<ExecutiveInsights, ApiError> {
        self.slot_reply(SubAnalysisKind::ExecutiveInsights, interview_prep_id)
            .await?;
        Ok(ExecutiveInsights {
            leadership_style: "hands-on".to_string(),
            ..Default::default()
        })
    }

    async fn get_certification_recommendations(
        &self,
        interview_prep_id: i64,
    ) -> Result<CertificationRecommendations, ApiError> {
        self.slot_reply(SubAnalysisKind::Certifications, interview_prep_id)
            .await?;
        Ok(CertificationRecommendations::default())
    }

    async fn cache_interview_prep_data(
        &self,
        interview_prep_id: i64,
        user_data: Map<String, Value>,
    ) -> Result<(), ApiError> {
        self.record(Call::Sync(interview_prep_id, user_data));
        Ok(())
    }

    async fn tailor_resume_batch(
        &self,
        request: &TailorBatchRequest,
    ) -> Result<TailorBatchResponse, ApiError> {
        self.record(Call::Batch(request.clone()));
        self.wait_for(Gate::Batch).await;
        let reply = self.batch.lock().unwrap().clone();
        reply.to_result()
    }

    async fn list_star_stories(&self, tailored_resume_id: i64) -> Result<Vec<StarStory>, ApiError> {
        self.record(Call::StarStories(tailored_resume_id));
        let count = *self.star_stories.lock().unwrap();
        Ok((0..count)
            .map(|i| StarStory {
                id: i as i64,
                title: format!("Story {i}"),
                ..Default::default()
            })
            .collect())
    }
}

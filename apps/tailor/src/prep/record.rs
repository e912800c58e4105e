use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api_client::SubAnalysisKind;
use crate::models::analysis::{
    CertificationRecommendations, CompanyResearch, CompetitiveIntelligence, ExecutiveInsights,
    InterviewStrategy, NewsItem, ReadinessScore, ValuesAlignment,
};
use crate::models::prep::{PrepData, PrepPayload};

/// One lazily fetched sub-analysis.
///
/// `absent -> loading -> (populated | absent)`. `loading` is only ever true
/// while a fetch for this slot is in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot<T> {
    pub value: Option<T>,
    pub loading: bool,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
        }
    }
}

impl<T> Slot<T> {
    fn start(&mut self) {
        self.loading = true;
    }

    /// Failures leave the previous value untouched.
    fn resolve(&mut self, value: Option<T>) {
        if value.is_some() {
            self.value = value;
        }
        self.loading = false;
    }
}

/// Payload of one resolved sub-analysis fetch.
#[derive(Debug, Clone)]
pub enum SubAnalysisData {
    ReadinessScore(ReadinessScore),
    ValuesAlignment(ValuesAlignment),
    CompanyResearch(CompanyResearch),
    StrategicNews(Vec<NewsItem>),
    CompetitiveIntelligence(CompetitiveIntelligence),
    InterviewStrategy(InterviewStrategy),
    ExecutiveInsights(ExecutiveInsights),
    Certifications(CertificationRecommendations),
}

/// Cached interview prep for one tailored resume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepRecord {
    pub tailored_resume_id: i64,
    pub interview_prep_id: i64,
    pub prep_data: PrepData,
    pub readiness_score: Slot<ReadinessScore>,
    pub values_alignment: Slot<ValuesAlignment>,
    pub company_research: Slot<CompanyResearch>,
    pub strategic_news: Slot<Vec<NewsItem>>,
    pub competitive_intelligence: Slot<CompetitiveIntelligence>,
    pub interview_strategy: Slot<InterviewStrategy>,
    pub executive_insights: Slot<ExecutiveInsights>,
    pub certification_recommendations: Slot<CertificationRecommendations>,
    /// Tag carried by every sub-fetch issued for this record. Results tagged
    /// with an older generation are dropped.
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
}

impl PrepRecord {
    pub fn new(tailored_resume_id: i64, payload: PrepPayload, generation: u64) -> Self {
        Self {
            tailored_resume_id,
            interview_prep_id: payload.interview_prep_id,
            prep_data: payload.prep_data,
            readiness_score: Slot::default(),
            values_alignment: Slot::default(),
            company_research: Slot::default(),
            strategic_news: Slot::default(),
            competitive_intelligence: Slot::default(),
            interview_strategy: Slot::default(),
            executive_insights: Slot::default(),
            certification_recommendations: Slot::default(),
            generation,
            fetched_at: Utc::now(),
        }
    }

    pub fn start(&mut self, kind: SubAnalysisKind) {
        match kind {
            SubAnalysisKind::ReadinessScore => self.readiness_score.start(),
            SubAnalysisKind::ValuesAlignment => self.values_alignment.start(),
            SubAnalysisKind::CompanyResearch => self.company_research.start(),
            SubAnalysisKind::StrategicNews => self.strategic_news.start(),
            SubAnalysisKind::CompetitiveIntelligence => self.competitive_intelligence.start(),
            SubAnalysisKind::InterviewStrategy => self.interview_strategy.start(),
            SubAnalysisKind::ExecutiveInsights => self.executive_insights.start(),
            SubAnalysisKind::Certifications => self.certification_recommendations.start(),
        }
    }

    /// Stores a successful result.
    pub fn apply(&mut self, data: SubAnalysisData) {
        match data {
            SubAnalysisData::ReadinessScore(v) => self.readiness_score.resolve(Some(v)),
            SubAnalysisData::ValuesAlignment(v) => self.values_alignment.resolve(Some(v)),
            SubAnalysisData::CompanyResearch(v) => self.company_research.resolve(Some(v)),
            SubAnalysisData::StrategicNews(v) => self.strategic_news.resolve(Some(v)),
            SubAnalysisData::CompetitiveIntelligence(v) => {
                self.competitive_intelligence.resolve(Some(v))
            }
            SubAnalysisData::InterviewStrategy(v) => self.interview_strategy.resolve(Some(v)),
            SubAnalysisData::ExecutiveInsights(v) => self.executive_insights.resolve(Some(v)),
            SubAnalysisData::Certifications(v) => {
                self.certification_recommendations.resolve(Some(v))
            }
        }
    }

    /// Clears the loading flag of a failed fetch.
    pub fn fail(&mut self, kind: SubAnalysisKind) {
        match kind {
            SubAnalysisKind::ReadinessScore => self.readiness_score.resolve(None),
            SubAnalysisKind::ValuesAlignment => self.values_alignment.resolve(None),
            SubAnalysisKind::CompanyResearch => self.company_research.resolve(None),
            SubAnalysisKind::StrategicNews => self.strategic_news.resolve(None),
            SubAnalysisKind::CompetitiveIntelligence => self.competitive_intelligence.resolve(None),
            SubAnalysisKind::InterviewStrategy => self.interview_strategy.resolve(None),
            SubAnalysisKind::ExecutiveInsights => self.executive_insights.resolve(None),
            SubAnalysisKind::Certifications => self.certification_recommendations.resolve(None),
        }
    }

    pub fn is_loading(&self, kind: SubAnalysisKind) -> bool {
        match kind {
            SubAnalysisKind::ReadinessScore => self.readiness_score.loading,
            SubAnalysisKind::ValuesAlignment => self.values_alignment.loading,
            SubAnalysisKind::CompanyResearch => self.company_research.loading,
            SubAnalysisKind::StrategicNews => self.strategic_news.loading,
            SubAnalysisKind::CompetitiveIntelligence => self.competitive_intelligence.loading,
            SubAnalysisKind::InterviewStrategy => self.interview_strategy.loading,
            SubAnalysisKind::ExecutiveInsights => self.executive_insights.loading,
            SubAnalysisKind::Certifications => self.certification_recommendations.loading,
        }
    }

    pub fn is_populated(&self, kind: SubAnalysisKind) -> bool {
        match kind {
            SubAnalysisKind::ReadinessScore => self.readiness_score.value.is_some(),
            SubAnalysisKind::ValuesAlignment => self.values_alignment.value.is_some(),
            SubAnalysisKind::CompanyResearch => self.company_research.value.is_some(),
            SubAnalysisKind::StrategicNews => self.strategic_news.value.is_some(),
            SubAnalysisKind::CompetitiveIntelligence => {
                self.competitive_intelligence.value.is_some()
            }
            SubAnalysisKind::InterviewStrategy => self.interview_strategy.value.is_some(),
            SubAnalysisKind::ExecutiveInsights => self.executive_insights.value.is_some(),
            SubAnalysisKind::Certifications => self.certification_recommendations.value.is_some(),
        }
    }

    pub fn any_loading(&self) -> bool {
        SubAnalysisKind::ALL.iter().any(|kind| self.is_loading(*kind))
    }
}

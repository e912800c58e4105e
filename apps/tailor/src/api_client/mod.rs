/// Backend API boundary: the single point of entry for every call the client
/// makes to the tailoring service.
///
/// ARCHITECTURAL RULE: the cache and the batch orchestrator only talk to the
/// service through the `Backend` trait. `HttpBackend` is the production
/// implementation; tests substitute an in-memory one.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::analysis::{
    CertificationRecommendations, CompanyResearch, CompetitiveIntelligence, ExecutiveInsights,
    InterviewStrategy, NewsItem, ReadinessScore, ValuesAlignment,
};
use crate::models::batch::{TailorBatchRequest, TailorBatchResponse};
use crate::models::prep::PrepPayload;

pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpBackend;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout or body read failure.
    #[error("{0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// The service answered `success: false`.
    #[error("{}", .0.as_deref().unwrap_or("Request rejected by server"))]
    Rejected(Option<String>),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Collapses the envelope: `success: false` becomes `ApiError::Rejected`.
    /// A successful envelope without `data` is a parse failure for callers
    /// that need a payload.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(self.error));
        }
        self.data.ok_or_else(|| {
            ApiError::Parse(serde::de::Error::custom(
                "successful response carried no data",
            ))
        })
    }
}

/// Which sub-analysis endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubAnalysisKind {
    ReadinessScore,
    ValuesAlignment,
    CompanyResearch,
    StrategicNews,
    CompetitiveIntelligence,
    InterviewStrategy,
    ExecutiveInsights,
    Certifications,
}

impl SubAnalysisKind {
    pub const ALL: [SubAnalysisKind; 8] = [
        SubAnalysisKind::ReadinessScore,
        SubAnalysisKind::ValuesAlignment,
        SubAnalysisKind::CompanyResearch,
        SubAnalysisKind::StrategicNews,
        SubAnalysisKind::CompetitiveIntelligence,
        SubAnalysisKind::InterviewStrategy,
        SubAnalysisKind::ExecutiveInsights,
        SubAnalysisKind::Certifications,
    ];

    pub fn path_segment(self) -> &'static str {
        match self {
            SubAnalysisKind::ReadinessScore => "readiness-score",
            SubAnalysisKind::ValuesAlignment => "values-alignment",
            SubAnalysisKind::CompanyResearch => "company-research",
            SubAnalysisKind::StrategicNews => "strategic-news",
            SubAnalysisKind::CompetitiveIntelligence => "competitive-intelligence",
            SubAnalysisKind::InterviewStrategy => "interview-strategy",
            SubAnalysisKind::ExecutiveInsights => "executive-insights",
            SubAnalysisKind::Certifications => "certifications",
        }
    }
}

/// A STAR story summary; only counted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StarStory {
    pub id: i64,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The tailoring service as seen by the client.
///
/// Carried as `Arc<dyn Backend>` by `PrepCache` and `BatchOrchestrator`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_interview_prep(&self, tailored_resume_id: i64) -> Result<PrepPayload, ApiError>;

    async fn generate_interview_prep(
        &self,
        tailored_resume_id: i64,
    ) -> Result<PrepPayload, ApiError>;

    /// Returns whether the service confirmed the deletion.
    async fn delete_interview_prep(&self, tailored_resume_id: i64) -> Result<bool, ApiError>;

    async fn get_interview_readiness_score(
        &self,
        interview_prep_id: i64,
    ) -> Result<ReadinessScore, ApiError>;

    async fn get_values_alignment(&self, interview_prep_id: i64)
        -> Result<ValuesAlignment, ApiError>;

    async fn get_company_research(&self, interview_prep_id: i64)
        -> Result<CompanyResearch, ApiError>;

    async fn get_strategic_news(&self, interview_prep_id: i64) -> Result<Vec<NewsItem>, ApiError>;

    async fn get_competitive_intelligence(
        &self,
        interview_prep_id: i64,
    ) -> Result<CompetitiveIntelligence, ApiError>;

    async fn get_interview_strategy(
        &self,
        interview_prep_id: i64,
    ) -> Result<InterviewStrategy, ApiError>;

    async fn get_executive_insights(
        &self,
        interview_prep_id: i64,
    ) -> Result<ExecutiveInsights, ApiError>;

    async fn get_certification_recommendations(
        &self,
        interview_prep_id: i64,
    ) -> Result<CertificationRecommendations, ApiError>;

    /// Best-effort mirror of user annotations: `{"user_data": {field: value}}`.
    async fn cache_interview_prep_data(
        &self,
        interview_prep_id: i64,
        user_data: Map<String, Value>,
    ) -> Result<(), ApiError>;

    async fn tailor_resume_batch(
        &self,
        request: &TailorBatchRequest,
    ) -> Result<TailorBatchResponse, ApiError>;

    async fn list_star_stories(&self, tailored_resume_id: i64) -> Result<Vec<StarStory>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_yields_data() {
        let envelope: Envelope<i64> =
            serde_json::from_value(json!({"success": true, "data": 7})).unwrap();
        assert_eq!(envelope.into_result().unwrap(), 7);
    }

    #[test]
    fn test_envelope_failure_carries_reason() {
        let envelope: Envelope<i64> =
            serde_json::from_value(json!({"success": false, "error": "No prep found"})).unwrap();
        match envelope.into_result() {
            Err(ApiError::Rejected(Some(msg))) => assert_eq!(msg, "No prep found"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_failure_without_reason_has_fallback_display() {
        let envelope: Envelope<i64> =
            serde_json::from_value(json!({"success": false})).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Request rejected by server");
    }

    #[test]
    fn test_envelope_success_without_data_is_parse_error() {
        let envelope: Envelope<i64> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(envelope.into_result(), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_path_segments_are_unique() {
        let mut segments: Vec<_> = SubAnalysisKind::ALL.iter().map(|k| k.path_segment()).collect();
        segments.sort();
        segments.dedup();
        assert_eq!(segments.len(), SubAnalysisKind::ALL.len());
    }
}

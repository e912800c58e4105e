//! reqwest-backed implementation of `Backend`.
//!
//! No automatic retries: every failure goes straight to the caller's failure
//! branch, and the caller decides whether to offer a retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::api_client::{ApiError, Backend, Envelope, StarStory, SubAnalysisKind};
use crate::config::Config;
use crate::models::analysis::{
    CertificationRecommendations, CompanyResearch, CompetitiveIntelligence, ExecutiveInsights,
    InterviewStrategy, NewsEnvelope, NewsItem, ReadinessScore, ValuesAlignment,
};
use crate::models::batch::{TailorBatchRequest, TailorBatchResponse};
use crate::models::prep::PrepPayload;

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and returns the raw envelope.
    /// Non-2xx answers that still carry an envelope are treated as rejections.
    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Backend returned {}: {}", status, body);
            if let Ok(envelope) = serde_json::from_str::<Envelope<Value>>(&body) {
                if !envelope.success {
                    return Err(ApiError::Rejected(envelope.error));
                }
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send_envelope(request).await?.into_result()
    }

    async fn get_sub_analysis<T: DeserializeOwned>(
        &self,
        interview_prep_id: i64,
        kind: SubAnalysisKind,
    ) -> Result<T, ApiError> {
        let path = format!(
            "/api/interview-prep/{interview_prep_id}/{}",
            kind.path_segment()
        );
        debug!("GET {path}");
        self.send(self.client.get(self.url(&path))).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_interview_prep(&self, tailored_resume_id: i64) -> Result<PrepPayload, ApiError> {
        let url = self.url(&format!("/api/interview-prep/{tailored_resume_id}"));
        self.send(self.client.get(url)).await
    }

    async fn generate_interview_prep(
        &self,
        tailored_resume_id: i64,
    ) -> Result<PrepPayload, ApiError> {
        let url = self.url(&format!("/api/interview-prep/generate/{tailored_resume_id}"));
        self.send(self.client.post(url)).await
    }

    async fn delete_interview_prep(&self, tailored_resume_id: i64) -> Result<bool, ApiError> {
        let url = self.url(&format!("/api/interview-prep/{tailored_resume_id}"));
        match self.send_envelope::<Value>(self.client.delete(url)).await {
            Ok(envelope) => Ok(envelope.success),
            Err(ApiError::Rejected(reason)) => {
                warn!(
                    "Delete of interview prep for tailored resume {} rejected: {:?}",
                    tailored_resume_id, reason
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_interview_readiness_score(
        &self,
        interview_prep_id: i64,
    ) -> Result<ReadinessScore, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::ReadinessScore)
            .await
    }

    async fn get_values_alignment(
        &self,
        interview_prep_id: i64,
    ) -> Result<ValuesAlignment, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::ValuesAlignment)
            .await
    }

    async fn get_company_research(
        &self,
        interview_prep_id: i64,
    ) -> Result<CompanyResearch, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::CompanyResearch)
            .await
    }

    async fn get_strategic_news(&self, interview_prep_id: i64) -> Result<Vec<NewsItem>, ApiError> {
        let news: NewsEnvelope = self
            .get_sub_analysis(interview_prep_id, SubAnalysisKind::StrategicNews)
            .await?;
        Ok(news.into())
    }

    async fn get_competitive_intelligence(
        &self,
        interview_prep_id: i64,
    ) -> Result<CompetitiveIntelligence, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::CompetitiveIntelligence)
            .await
    }

    async fn get_interview_strategy(
        &self,
        interview_prep_id: i64,
    ) -> Result<InterviewStrategy, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::InterviewStrategy)
            .await
    }

    async fn get_executive_insights(
        &self,
        interview_prep_id: i64,
    ) -> Result<ExecutiveInsights, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::ExecutiveInsights)
            .await
    }

    async fn get_certification_recommendations(
        &self,
        interview_prep_id: i64,
    ) -> Result<CertificationRecommendations, ApiError> {
        self.get_sub_analysis(interview_prep_id, SubAnalysisKind::Certifications)
            .await
    }

    async fn cache_interview_prep_data(
        &self,
        interview_prep_id: i64,
        user_data: Map<String, Value>,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/interview-prep/{interview_prep_id}/cache"));
        let envelope: Envelope<Value> = self
            .send_envelope(self.client.post(url).json(&json!({ "user_data": user_data })))
            .await?;
        if envelope.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(envelope.error))
        }
    }

    async fn tailor_resume_batch(
        &self,
        request: &TailorBatchRequest,
    ) -> Result<TailorBatchResponse, ApiError> {
        let url = self.url("/api/tailor/batch");
        self.send(self.client.post(url).json(request)).await
    }

    async fn list_star_stories(&self, tailored_resume_id: i64) -> Result<Vec<StarStory>, ApiError> {
        let url = self.url("/api/star-stories");
        self.send(
            self.client
                .get(url)
                .query(&[("tailored_resume_id", tailored_resume_id)]),
        )
        .await
    }
}

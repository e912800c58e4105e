//! Payloads of the per-prep AI sub-analyses.
//!
//! Each one is generated independently by the backend after the base prep
//! bundle exists. Scores arrive as integers or floats depending on the model
//! output, so they are all decoded as `f64`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::prep::Item;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessScore {
    pub overall_score: f64,
    pub readiness_level: String,
    pub category_scores: BTreeMap<String, f64>,
    pub strengths: Vec<Item>,
    pub improvement_areas: Vec<Item>,
    pub recommendations: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuesAlignment {
    pub alignment_score: f64,
    pub matched_values: Vec<Item>,
    pub value_gaps: Vec<Item>,
    pub talking_points: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyResearch {
    pub summary: String,
    pub mission: String,
    pub products: Vec<Item>,
    pub recent_developments: Vec<Item>,
    pub financial_health: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    #[serde(alias = "headline")]
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub published_date: Option<String>,
    #[serde(alias = "impact")]
    pub relevance: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitiveIntelligence {
    pub market_position: String,
    pub competitors: Vec<Item>,
    pub differentiators: Vec<Item>,
    pub challenges: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewStrategy {
    pub overall_approach: String,
    pub key_themes: Vec<Item>,
    pub stories_to_prepare: Vec<Item>,
    pub questions_to_expect: Vec<Item>,
    pub closing_strategy: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutiveInsights {
    pub executives: Vec<Item>,
    pub leadership_style: String,
    pub priorities: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationRecommendations {
    pub recommended_certifications: Vec<Item>,
    pub learning_path: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The strategic-news endpoint has answered both `[...]` and `{"articles": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum NewsEnvelope {
    List(Vec<NewsItem>),
    Wrapped {
        #[serde(alias = "news", alias = "items")]
        articles: Vec<NewsItem>,
    },
}

impl From<NewsEnvelope> for Vec<NewsItem> {
    fn from(envelope: NewsEnvelope) -> Self {
        match envelope {
            NewsEnvelope::List(items) => items,
            NewsEnvelope::Wrapped { articles } => articles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_readiness_score_accepts_integer_scores() {
        let score: ReadinessScore = serde_json::from_value(json!({
            "overall_score": 78,
            "readiness_level": "almost_ready",
            "category_scores": {"technical": 82, "behavioral": 70.5},
            "strengths": ["Systems design"]
        }))
        .unwrap();

        assert!((score.overall_score - 78.0).abs() < f64::EPSILON);
        assert!((score.category_scores["behavioral"] - 70.5).abs() < f64::EPSILON);
        assert_eq!(score.strengths[0].label, "Systems design");
    }

    #[test]
    fn test_news_envelope_accepts_both_shapes() {
        let bare: NewsEnvelope =
            serde_json::from_value(json!([{"title": "Acme raises Series C"}])).unwrap();
        let wrapped: NewsEnvelope = serde_json::from_value(json!({
            "articles": [{"headline": "Acme opens Berlin office", "impact": "hiring"}]
        }))
        .unwrap();

        let bare: Vec<NewsItem> = bare.into();
        let wrapped: Vec<NewsItem> = wrapped.into();
        assert_eq!(bare[0].title, "Acme raises Series C");
        assert_eq!(wrapped[0].title, "Acme opens Berlin office");
        assert_eq!(wrapped[0].relevance.as_deref(), Some("hiring"));
    }

    #[test]
    fn test_competitive_intelligence_with_object_competitors() {
        let ci: CompetitiveIntelligence = serde_json::from_value(json!({
            "market_position": "challenger",
            "competitors": [{"name": "Globex", "description": "incumbent"}, "Initech"]
        }))
        .unwrap();

        assert_eq!(ci.competitors.len(), 2);
        assert_eq!(ci.competitors[0].detail.as_deref(), Some("incumbent"));
        assert_eq!(ci.competitors[1].label, "Initech");
    }
}

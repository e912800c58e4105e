//! Interview prep bundle as returned by the backend.
//!
//! Sections default when absent and keep unmodelled fields in `extra`, so a
//! bundle round-trips without losing anything the backend sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A list entry the backend sends either as a bare string or as an object.
///
/// Normalized once at decode time: `"Rust"` and `{"skill": "Rust", "importance": "high"}`
/// both become an `Item` with `label = "Rust"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawItem")]
pub struct Item {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Item {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItem {
    Text(String),
    Labeled(LabeledObject),
    Other(Value),
}

#[derive(Deserialize)]
struct LabeledObject {
    #[serde(alias = "name", alias = "skill", alias = "title", alias = "question", alias = "value")]
    label: String,
    #[serde(
        default,
        alias = "description",
        alias = "importance",
        alias = "context",
        alias = "reason",
        alias = "purpose"
    )]
    detail: Option<String>,
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        match raw {
            RawItem::Text(label) => Item::new(label),
            RawItem::Labeled(obj) => Item {
                label: obj.label,
                detail: obj.detail,
            },
            // Numbers, unlabeled objects: keep something displayable instead of failing the bundle
            RawItem::Other(value) => Item::new(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub industry: String,
    pub size: String,
    pub headquarters: String,
    pub overview: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuesAndCulture {
    pub stated_values: Vec<Item>,
    pub culture_summary: String,
    pub work_environment: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyAndNews {
    pub strategic_priorities: Vec<Item>,
    pub recent_news: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAnalysis {
    pub job_title: String,
    pub seniority_level: String,
    pub core_responsibilities: Vec<Item>,
    pub must_have_skills: Vec<Item>,
    pub nice_to_have_skills: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One checklist line. `checked_items` annotations are keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    #[serde(alias = "task", alias = "label")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewPreparation {
    pub checklist: Vec<ChecklistItem>,
    pub research_tasks: Vec<Item>,
    pub practice_questions: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidatePositioning {
    pub strengths_to_emphasize: Vec<Item>,
    pub gaps_to_address: Vec<Item>,
    pub resume_focus_areas: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The full prep document. Field names follow the backend's snake_case keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepData {
    pub company_profile: CompanyProfile,
    pub values_and_culture: ValuesAndCulture,
    pub strategy_and_news: StrategyAndNews,
    pub role_analysis: RoleAnalysis,
    pub interview_preparation: InterviewPreparation,
    pub candidate_positioning: CandidatePositioning,
    pub questions_to_ask: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `data` of the get/generate prep endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepPayload {
    pub interview_prep_id: i64,
    #[serde(default)]
    pub prep_data: PrepData,
}

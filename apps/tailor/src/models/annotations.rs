//! User-entered annotations on a prep bundle.
//!
//! Client-owned and persisted on the device per tailored resume. They outlive
//! any cached prep record and are only mirrored to the backend best-effort.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomQuestion {
    pub id: String,
    pub question: String,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    /// checklist item id -> checked
    pub checked_items: BTreeMap<String, bool>,
    /// section id -> free text
    pub notes: BTreeMap<String, String>,
    pub custom_questions: Vec<CustomQuestion>,
    /// `YYYY-MM-DD`, or empty when unset.
    pub interview_date: String,
}

/// One independently persisted and synced annotation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationField {
    CheckedItems,
    Notes,
    CustomQuestions,
    InterviewDate,
}

impl AnnotationField {
    pub const ALL: [AnnotationField; 4] = [
        AnnotationField::CheckedItems,
        AnnotationField::Notes,
        AnnotationField::CustomQuestions,
        AnnotationField::InterviewDate,
    ];

    /// Device storage key for this field of one tailored resume.
    pub fn storage_key(self, tailored_resume_id: i64) -> String {
        match self {
            AnnotationField::CheckedItems => format!("interview-prep-checks-{tailored_resume_id}"),
            AnnotationField::Notes => format!("interview-prep-notes-{tailored_resume_id}"),
            AnnotationField::CustomQuestions => {
                format!("interview-prep-custom-questions-{tailored_resume_id}")
            }
            AnnotationField::InterviewDate => format!("interview-date-{tailored_resume_id}"),
        }
    }

    /// Key under `user_data` in the backend sync call.
    pub fn sync_name(self) -> &'static str {
        match self {
            AnnotationField::CheckedItems => "checked_items",
            AnnotationField::Notes => "notes",
            AnnotationField::CustomQuestions => "custom_questions",
            AnnotationField::InterviewDate => "interview_date",
        }
    }
}

impl Annotations {
    /// JSON value of a single field, as stored on device and sent to the backend.
    pub fn field_value(&self, field: AnnotationField) -> Result<Value, serde_json::Error> {
        match field {
            AnnotationField::CheckedItems => serde_json::to_value(&self.checked_items),
            AnnotationField::Notes => serde_json::to_value(&self.notes),
            AnnotationField::CustomQuestions => serde_json::to_value(&self.custom_questions),
            AnnotationField::InterviewDate => Ok(Value::String(self.interview_date.clone())),
        }
    }

    /// Overwrites a single field from its stored JSON form.
    pub fn set_field_from_json(
        &mut self,
        field: AnnotationField,
        raw: &str,
    ) -> Result<(), serde_json::Error> {
        match field {
            AnnotationField::CheckedItems => self.checked_items = serde_json::from_str(raw)?,
            AnnotationField::Notes => self.notes = serde_json::from_str(raw)?,
            AnnotationField::CustomQuestions => self.custom_questions = serde_json::from_str(raw)?,
            AnnotationField::InterviewDate => self.interview_date = serde_json::from_str(raw)?,
        }
        Ok(())
    }

    pub fn checked_count(&self) -> usize {
        self.checked_items.values().filter(|checked| **checked).count()
    }
}

use serde::Serialize;

use crate::api_client::SubAnalysisKind;
use crate::models::annotations::AnnotationField;

/// Change notifications published by `PrepCache`.
///
/// Events only name what changed; subscribers read the new state back through
/// `PrepCache::get`, `status` or `annotations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PrepEvent {
    StatusChanged {
        tailored_resume_id: i64,
    },
    RecordStored {
        tailored_resume_id: i64,
        interview_prep_id: i64,
        generation: u64,
    },
    SlotUpdated {
        tailored_resume_id: i64,
        kind: SubAnalysisKind,
        populated: bool,
    },
    RecordRemoved {
        tailored_resume_id: i64,
    },
    AnnotationsChanged {
        tailored_resume_id: i64,
        #[serde(skip)]
        field: AnnotationField,
    },
}

impl PrepEvent {
    pub fn tailored_resume_id(&self) -> i64 {
        match self {
            PrepEvent::StatusChanged { tailored_resume_id }
            | PrepEvent::RecordStored {
                tailored_resume_id, ..
            }
            | PrepEvent::SlotUpdated {
                tailored_resume_id, ..
            }
            | PrepEvent::RecordRemoved { tailored_resume_id }
            | PrepEvent::AnnotationsChanged {
                tailored_resume_id, ..
            } => *tailored_resume_id,
        }
    }
}

//! Locally queued result entries. A teacher fills marks offline; the drafts
//! sit in the workspace database until they are submitted as a batch.

use crate::errors::{self, ErrorCode};
use crate::model::{grade_for, EntityRef, NewResult, ResultStatus};
use crate::results::aggregate::{ReviewKey, Reviewable};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedResult {
    pub id: String,
    pub student: EntityRef,
    pub subject: Option<EntityRef>,
    pub exam: EntityRef,
    pub class_name: EntityRef,
    pub marks_obtained: f64,
    pub total_marks: Option<f64>,
    pub remarks: Option<String>,
    pub created_at: String,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DraftInput {
    pub student: Option<EntityRef>,
    pub subject: Option<EntityRef>,
    pub exam: Option<EntityRef>,
    pub class_name: Option<EntityRef>,
    pub marks_obtained: Option<f64>,
    pub total_marks: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DraftError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("total marks must be greater than zero")]
    BadTotal,
    #[error("marks obtained must be between 0 and {0}")]
    MarksOutOfRange(String),
}

impl ErrorCode for DraftError {
    fn error_code(&self) -> &'static str {
        errors::VALIDATION_FAILED
    }
}

impl DraftInput {
    pub fn into_draft(self) -> Result<QueuedResult, DraftError> {
        let student = EntityRef::non_blank(self.student).ok_or(DraftError::Missing("student"))?;
        let exam = EntityRef::non_blank(self.exam).ok_or(DraftError::Missing("exam"))?;
        let class_name = EntityRef::non_blank(self.class_name).ok_or(DraftError::Missing("class"))?;
        let marks = self.marks_obtained.ok_or(DraftError::Missing("marksObtained"))?;
        if let Some(total) = self.total_marks {
            if total <= 0.0 {
                return Err(DraftError::BadTotal);
            }
            if marks < 0.0 || marks > total {
                return Err(DraftError::MarksOutOfRange(
                    crate::results::display::format_number(total),
                ));
            }
        } else if marks < 0.0 {
            return Err(DraftError::MarksOutOfRange("total".into()));
        }
        Ok(QueuedResult {
            id: uuid::Uuid::new_v4().to_string(),
            student,
            subject: EntityRef::non_blank(self.subject),
            exam,
            class_name,
            marks_obtained: marks,
            total_marks: self.total_marks,
            remarks: self
                .remarks
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            created_at: chrono::Utc::now().to_rfc3339(),
            last_error: None,
        })
    }
}

impl QueuedResult {
    pub fn grade_preview(&self) -> Option<&'static str> {
        self.total_marks
            .and_then(|t| grade_for(self.marks_obtained, t, None))
    }

    /// Submissions always enter review as pending.
    pub fn to_new_result(&self) -> NewResult {
        NewResult {
            student: self.student.clone(),
            subject: self.subject.clone(),
            exam: self.exam.clone(),
            class_name: self.class_name.clone(),
            marks_obtained: self.marks_obtained,
            total_marks: self.total_marks,
            remarks: self.remarks.clone(),
            status: ResultStatus::PendingApproval,
        }
    }
}

impl Reviewable for QueuedResult {
    fn review_key(&self) -> ReviewKey {
        ReviewKey::new(Some(self.exam.clone()), Some(self.class_name.clone()))
    }

    fn student_label(&self) -> Option<String> {
        Some(self.student.to_string())
    }

    fn subject_label(&self) -> Option<String> {
        self.subject.as_ref().map(|s| s.to_string())
    }
}

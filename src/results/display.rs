use super::aggregate::{ReviewGroup, ReviewQueues};
use crate::model::ResultRecord;
use serde::Serialize;

pub const PLACEHOLDER: &str = "-";
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub id: Option<i64>,
    pub student: String,
    pub subject: String,
    pub exam: String,
    pub class_name: String,
    pub marks: String,
    pub grade: String,
    pub status: String,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub key: serde_json::Value,
    pub exam_name: String,
    pub class_name: String,
    pub unknown: bool,
    pub record_count: usize,
    pub student_count: usize,
    pub subject_count: usize,
    pub students: Vec<String>,
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    pub results: Vec<ResultRow>,
}

/// `45.0` renders as `45`.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

pub fn format_marks(marks: Option<f64>, total: Option<f64>) -> String {
    match (marks, total) {
        (Some(m), Some(t)) => format!("{}/{}", format_number(m), format_number(t)),
        (Some(m), None) => format_number(m),
        _ => PLACEHOLDER.to_string(),
    }
}

/// RFC 3339 timestamps become `YYYY-MM-DD HH:MM`; anything else passes through.
pub fn format_timestamp(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => ts.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn result_row(r: &ResultRecord) -> ResultRow {
    ResultRow {
        id: r.id,
        student: r.student_label().unwrap_or_else(|| PLACEHOLDER.into()),
        subject: r.subject_label().unwrap_or_else(|| PLACEHOLDER.into()),
        exam: r.exam_label().unwrap_or_else(|| PLACEHOLDER.into()),
        class_name: r
            .class_name
            .as_ref()
            .map(|c| c.to_string())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER.into()),
        marks: format_marks(r.marks_obtained, r.total_marks),
        grade: r
            .grade
            .clone()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| PLACEHOLDER.into()),
        status: r.status.as_str().to_string(),
        remarks: r
            .approval_remarks
            .clone()
            .or_else(|| r.remarks.clone())
            .unwrap_or_default(),
    }
}

pub fn group_summary(g: &ReviewGroup<ResultRecord>) -> GroupSummary {
    let exam_name = g
        .items
        .iter()
        .find_map(|r| r.exam_label())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let class_name = g
        .key
        .class_name
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let approved_by = g
        .items
        .iter()
        .find_map(|r| r.approved_by.as_ref())
        .map(|a| a.to_string());
    let approved_at = g
        .items
        .iter()
        .find_map(|r| r.approved_at.as_deref())
        .map(format_timestamp);

    GroupSummary {
        key: serde_json::to_value(&g.key).unwrap_or_default(),
        exam_name,
        class_name,
        unknown: g.key.is_unknown(),
        record_count: g.items.len(),
        student_count: g.students.len(),
        subject_count: g.subjects.len(),
        students: g.students.clone(),
        subjects: g.subjects.clone(),
        approved_by,
        approved_at,
        results: g.items.iter().map(result_row).collect(),
    }
}

pub fn queues_json(q: &ReviewQueues) -> serde_json::Value {
    let pending: Vec<GroupSummary> = q.pending.iter().map(group_summary).collect();
    let approved: Vec<GroupSummary> = q.approved.iter().map(group_summary).collect();
    serde_json::json!({
        "pending": pending,
        "approved": approved,
        "pendingCount": q.pending.iter().map(|g| g.items.len()).sum::<usize>(),
        "approvedCount": q.approved.iter().map(|g| g.items.len()).sum::<usize>(),
        "otherCount": q.other,
        "warnings": q.warnings,
    })
}

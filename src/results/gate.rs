use crate::model::{EntityRef, ResultRecord, ResultStatus};

/// Only approved results may reach a student-facing view. Applied on every
/// student read whether or not the backend already filtered.
pub fn student_visible<I>(records: I, student: Option<&EntityRef>) -> Vec<ResultRecord>
where
    I: IntoIterator<Item = ResultRecord>,
{
    records
        .into_iter()
        .filter(|r| r.status == ResultStatus::Approved)
        .filter(|r| student.map(|s| r.belongs_to(s)).unwrap_or(true))
        .collect()
}

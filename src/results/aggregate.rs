use crate::model::{EntityRef, ResultRecord, ResultStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Composite (exam, class) key of a review batch. Missing or blank parts
/// make the key part of the unknown bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReviewKey {
    pub exam: Option<EntityRef>,
    #[serde(rename = "class")]
    pub class_name: Option<EntityRef>,
}

impl ReviewKey {
    pub fn new(exam: Option<EntityRef>, class_name: Option<EntityRef>) -> Self {
        ReviewKey {
            exam: EntityRef::non_blank(exam),
            class_name: EntityRef::non_blank(class_name),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.exam.is_none() || self.class_name.is_none()
    }
}

impl fmt::Display for ReviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |v: &Option<EntityRef>| v.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "?".into());
        write!(f, "exam {} / class {}", part(&self.exam), part(&self.class_name))
    }
}

/// Anything that can be batched for review: server records and local drafts.
pub trait Reviewable {
    fn review_key(&self) -> ReviewKey;
    fn student_label(&self) -> Option<String>;
    fn subject_label(&self) -> Option<String>;
}

impl Reviewable for ResultRecord {
    fn review_key(&self) -> ReviewKey {
        ReviewKey::new(self.exam.clone(), self.class_name.clone())
    }

    fn student_label(&self) -> Option<String> {
        ResultRecord::student_label(self)
    }

    fn subject_label(&self) -> Option<String> {
        ResultRecord::subject_label(self)
    }
}

#[derive(Debug, Clone)]
pub struct ReviewGroup<T> {
    pub key: ReviewKey,
    pub items: Vec<T>,
    /// Distinct subjects, first-seen order.
    pub subjects: Vec<String>,
    /// Distinct students, first-seen order.
    pub students: Vec<String>,
}

impl<T: Reviewable> ReviewGroup<T> {
    fn new(key: ReviewKey) -> Self {
        ReviewGroup {
            key,
            items: Vec::new(),
            subjects: Vec::new(),
            students: Vec::new(),
        }
    }

    fn push(&mut self, item: T) {
        if let Some(s) = item.subject_label() {
            if !self.subjects.contains(&s) {
                self.subjects.push(s);
            }
        }
        if let Some(s) = item.student_label() {
            if !self.students.contains(&s) {
                self.students.push(s);
            }
        }
        self.items.push(item);
    }
}

/// Groups by review key. Groups come out in the order their first record
/// was seen, and records keep their input order inside a group.
pub fn group_by_review_key<T, I>(items: I) -> Vec<ReviewGroup<T>>
where
    T: Reviewable,
    I: IntoIterator<Item = T>,
{
    let mut index: HashMap<ReviewKey, usize> = HashMap::new();
    let mut groups: Vec<ReviewGroup<T>> = Vec::new();
    for item in items {
        let key = item.review_key();
        let slot = match index.get(&key) {
            Some(i) => *i,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(ReviewGroup::new(key));
                groups.len() - 1
            }
        };
        groups[slot].push(item);
    }
    groups
}

#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub pending: Vec<ResultRecord>,
    pub approved: Vec<ResultRecord>,
    /// Records in neither list (rejected, draft, published, unknown).
    pub other: usize,
}

pub fn partition(records: Vec<ResultRecord>) -> Partition {
    let mut out = Partition::default();
    for r in records {
        match r.status {
            ResultStatus::PendingApproval => out.pending.push(r),
            ResultStatus::Approved => out.approved.push(r),
            _ => out.other += 1,
        }
    }
    out
}

/// Both review queues of the admin results screen.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueues {
    pub pending: Vec<ReviewGroup<ResultRecord>>,
    pub approved: Vec<ReviewGroup<ResultRecord>>,
    pub other: usize,
    pub warnings: Vec<String>,
}

pub fn review_queues(records: Vec<ResultRecord>) -> ReviewQueues {
    let parts = partition(records);
    let pending = group_by_review_key(parts.pending);
    let approved = group_by_review_key(parts.approved);
    let mut warnings = Vec::new();
    for (queue, groups) in [("pending", &pending), ("approved", &approved)] {
        for g in groups.iter().filter(|g| g.key.is_unknown()) {
            let msg = format!(
                "{} {} result(s) have no exam or class ({})",
                g.items.len(),
                queue,
                g.key
            );
            tracing::warn!("{msg}");
            warnings.push(msg);
        }
    }
    ReviewQueues {
        pending,
        approved,
        other: parts.other,
        warnings,
    }
}

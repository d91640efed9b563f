use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A foreign key as the backend sends it: an integer id, or a code/name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Id(i64),
    Name(String),
}

impl EntityRef {
    /// Drops blank names so that `""` and a missing value land in the same
    /// place. Names that are a canonical integer become ids, so `"1"` and `1`
    /// compare equal.
    pub fn non_blank(v: Option<EntityRef>) -> Option<EntityRef> {
        match v {
            Some(EntityRef::Name(s)) => {
                let t = s.trim();
                if t.is_empty() {
                    return None;
                }
                match t.parse::<i64>() {
                    Ok(id) if id.to_string() == t => Some(EntityRef::Id(id)),
                    _ => Some(EntityRef::Name(t.to_string())),
                }
            }
            other => other,
        }
    }

    /// A user or record name as typed, normalized like `non_blank`.
    pub fn from_name(name: &str) -> Option<EntityRef> {
        EntityRef::non_blank(Some(EntityRef::Name(name.to_string())))
    }

    /// Parses an IPC parameter (number or string).
    pub fn from_json(v: &serde_json::Value) -> Option<EntityRef> {
        match v {
            serde_json::Value::Number(n) => n.as_i64().map(EntityRef::Id),
            serde_json::Value::String(s) => EntityRef::non_blank(Some(EntityRef::Name(s.clone()))),
            _ => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Id(id) => write!(f, "{}", id),
            EntityRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultStatus {
    Draft,
    Published,
    #[default]
    PendingApproval,
    Approved,
    Rejected,
    Unknown,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Draft => "draft",
            ResultStatus::Published => "published",
            ResultStatus::PendingApproval => "pending_approval",
            ResultStatus::Approved => "approved",
            ResultStatus::Rejected => "rejected",
            ResultStatus::Unknown => "unknown",
        }
    }

    /// Lenient parse. The older admin screen used plain `pending`.
    pub fn parse(raw: &str) -> ResultStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => ResultStatus::Draft,
            "published" => ResultStatus::Published,
            "pending_approval" | "pending" | "" => ResultStatus::PendingApproval,
            "approved" => ResultStatus::Approved,
            "rejected" => ResultStatus::Rejected,
            _ => ResultStatus::Unknown,
        }
    }
}

impl Serialize for ResultStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResultStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(ResultStatus::parse).unwrap_or_default())
    }
}

/// Accepts `45`, `45.5`, `"45"` and `null`.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let v: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// One student/subject/exam mark entry as returned by `GET /results/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub student: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_full_name: Option<String>,
    #[serde(default)]
    pub subject: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub exam: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,
    #[serde(default, rename = "class", alias = "class_name")]
    pub class_name: Option<EntityRef>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub marks_obtained: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub status: ResultStatus,
    #[serde(default)]
    pub approved_by: Option<EntityRef>,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_remarks: Option<String>,
}

impl ResultRecord {
    pub fn student_label(&self) -> Option<String> {
        non_blank_str(self.student_name.as_deref())
            .or_else(|| non_blank_str(self.student_full_name.as_deref()))
            .or_else(|| EntityRef::non_blank(self.student.clone()).map(|s| s.to_string()))
    }

    pub fn subject_label(&self) -> Option<String> {
        non_blank_str(self.subject_name.as_deref())
            .or_else(|| EntityRef::non_blank(self.subject.clone()).map(|s| s.to_string()))
    }

    pub fn exam_label(&self) -> Option<String> {
        non_blank_str(self.exam_name.as_deref())
            .or_else(|| EntityRef::non_blank(self.exam.clone()).map(|s| s.to_string()))
    }

    /// True when this record was written for `student`, by key or by name.
    pub fn belongs_to(&self, student: &EntityRef) -> bool {
        if EntityRef::non_blank(self.student.clone()).as_ref() == Some(student) {
            return true;
        }
        match student {
            EntityRef::Name(name) => self
                .student_label()
                .map(|l| l.eq_ignore_ascii_case(name))
                .unwrap_or(false),
            EntityRef::Id(_) => false,
        }
    }
}

fn non_blank_str(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Body of `POST /results/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResult {
    pub student: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<EntityRef>,
    pub exam: EntityRef,
    #[serde(rename = "class")]
    pub class_name: EntityRef,
    pub marks_obtained: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub status: ResultStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

/// Share of the total below which a result is an F when no passing mark is known.
pub const DEFAULT_PASSING_PERCENT: f64 = 33.0;

/// Letter grade from marks. `passing_marks` is in the same unit as `total`.
pub fn grade_for(marks: f64, total: f64, passing_marks: Option<f64>) -> Option<&'static str> {
    if total <= 0.0 || marks < 0.0 {
        return None;
    }
    let pct = marks / total * 100.0;
    let passing_pct = passing_marks
        .map(|p| p / total * 100.0)
        .unwrap_or(DEFAULT_PASSING_PERCENT);
    Some(if pct >= 90.0 {
        "A+"
    } else if pct >= 80.0 {
        "A"
    } else if pct >= 70.0 {
        "B+"
    } else if pct >= 60.0 {
        "B"
    } else if pct >= 50.0 {
        "C+"
    } else if pct >= 40.0 {
        "C"
    } else if pct >= passing_pct {
        "D"
    } else {
        "F"
    })
}

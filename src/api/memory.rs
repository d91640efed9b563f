//! In-process stand-in for the school REST API. It follows the same contract
//! as the real backend (status defaults, batch transitions, unique
//! student/exam pairs, both list shapes) so the daemon can run offline.

use super::{ApiError, ApiRequest, ApiResponse, Method, Transport, RESULTS_APPROVE_PATH, RESULTS_PATH};
use crate::model::{grade_for, EntityRef, ResultRecord, ResultStatus};
use crate::resources::Resource;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Which list shape the fake backend answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Array,
    Paginated { page_size: usize },
}

pub struct MemoryTransport {
    envelope: Envelope,
    actor: Option<String>,
    results: Vec<ResultRecord>,
    collections: BTreeMap<&'static str, Vec<Value>>,
    next_id: i64,
}

impl MemoryTransport {
    pub fn new(envelope: Envelope, actor: Option<String>) -> Self {
        let collections = Resource::ALL
            .into_iter()
            .map(|r| (r.path(), Vec::new()))
            .collect();
        MemoryTransport {
            envelope,
            actor,
            results: Vec::new(),
            collections,
            next_id: 1,
        }
    }

    /// Switches who the backend records as approver, keeping its data.
    pub fn set_actor(&mut self, actor: Option<String>) {
        self.actor = actor;
    }

    pub fn set_envelope(&mut self, envelope: Envelope) {
        self.envelope = envelope;
    }

    fn alloc_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn list_response(&self, path: &str, page: usize, items: Vec<Value>) -> ApiResponse {
        match self.envelope {
            Envelope::Array => ApiResponse::new(200, Value::Array(items)),
            Envelope::Paginated { page_size } => {
                let size = page_size.max(1);
                let count = items.len();
                let start = (page - 1) * size;
                let page_items: Vec<Value> = items.into_iter().skip(start).take(size).collect();
                let next = if start + size < count {
                    json!(format!("{}?page={}", path, page + 1))
                } else {
                    Value::Null
                };
                let previous = if page > 1 {
                    json!(format!("{}?page={}", path, page - 1))
                } else {
                    Value::Null
                };
                ApiResponse::new(
                    200,
                    json!({
                        "count": count,
                        "next": next,
                        "previous": previous,
                        "results": page_items,
                    }),
                )
            }
        }
    }

    fn create_result(&mut self, body: Option<&Value>) -> ApiResponse {
        let Some(obj) = body.and_then(|b| b.as_object()) else {
            return bad_request(json!({ "detail": "Expected a JSON object." }));
        };

        let mut field_errors = Map::new();
        let student = EntityRef::non_blank(ref_field(obj, "student"));
        let exam = EntityRef::non_blank(ref_field(obj, "exam"));
        let marks = obj.get("marks_obtained").and_then(|v| v.as_f64());
        if student.is_none() {
            field_errors.insert("student".into(), json!(["This field is required."]));
        }
        if exam.is_none() {
            field_errors.insert("exam".into(), json!(["This field is required."]));
        }
        match marks {
            None => {
                field_errors.insert("marks_obtained".into(), json!(["This field is required."]));
            }
            Some(m) if m < 0.0 => {
                field_errors.insert(
                    "marks_obtained".into(),
                    json!(["Ensure this value is greater than or equal to 0."]),
                );
            }
            _ => {}
        }
        if !field_errors.is_empty() {
            return bad_request(Value::Object(field_errors));
        }

        let duplicate = self
            .results
            .iter()
            .any(|r| r.student == student && r.exam == exam);
        if duplicate {
            return bad_request(json!({
                "non_field_errors": ["The fields student, exam must make a unique set."]
            }));
        }

        let total = obj.get("total_marks").and_then(|v| v.as_f64());
        let marks = marks.unwrap_or_default();
        let record = ResultRecord {
            id: Some(self.alloc_id()),
            student,
            student_name: str_field(obj, "student_name"),
            subject: EntityRef::non_blank(ref_field(obj, "subject")),
            subject_name: str_field(obj, "subject_name"),
            exam,
            exam_name: str_field(obj, "exam_name"),
            class_name: EntityRef::non_blank(ref_field(obj, "class")),
            marks_obtained: Some(marks),
            total_marks: total,
            grade: total
                .and_then(|t| grade_for(marks, t, None))
                .map(str::to_string),
            status: ResultStatus::PendingApproval,
            remarks: str_field(obj, "remarks"),
            ..Default::default()
        };
        let out = to_body(&record);
        self.results.push(record);
        ApiResponse::new(201, out)
    }

    fn approve(&mut self, body: Option<&Value>) -> ApiResponse {
        let Some(obj) = body.and_then(|b| b.as_object()) else {
            return bad_request(json!({ "detail": "Expected a JSON object." }));
        };
        let exam = EntityRef::non_blank(ref_field(obj, "exam"));
        let class = EntityRef::non_blank(ref_field(obj, "class"));
        let (Some(exam), Some(class)) = (exam, class) else {
            return bad_request(json!({ "detail": "Both exam and class are required." }));
        };
        let target = match obj.get("action").and_then(|v| v.as_str()) {
            Some("approve") => ResultStatus::Approved,
            Some("reject") => ResultStatus::Rejected,
            _ => return bad_request(json!({ "detail": "Action must be approve or reject." })),
        };
        let remarks = str_field(obj, "remarks");
        if target == ResultStatus::Rejected && remarks.is_none() {
            return bad_request(json!({ "detail": "Remarks are required when rejecting results." }));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let approver = self.actor.clone().map(EntityRef::Name);
        let mut updated = 0u64;
        for r in self.results.iter_mut() {
            if r.status != ResultStatus::PendingApproval {
                continue;
            }
            if r.exam.as_ref() != Some(&exam) || r.class_name.as_ref() != Some(&class) {
                continue;
            }
            r.status = target;
            r.approved_by = approver.clone();
            r.approved_at = Some(now.clone());
            r.approval_remarks = remarks.clone();
            updated += 1;
        }
        if updated == 0 {
            return ApiResponse::new(
                404,
                json!({ "detail": "No pending results found for this exam and class." }),
            );
        }
        ApiResponse::new(200, json!({ "updated": updated, "status": target }))
    }

    fn patch_result(&mut self, id: i64, body: Option<&Value>) -> ApiResponse {
        let raw = body
            .and_then(|b| b.get("status"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let status = match raw.trim() {
            "" => None,
            t => Some(ResultStatus::parse(t)).filter(|s| *s != ResultStatus::Unknown),
        };
        let Some(status) = status else {
            return bad_request(json!({ "status": [format!("\"{}\" is not a valid choice.", raw)] }));
        };
        let approver = self.actor.clone().map(EntityRef::Name);
        let Some(record) = self.results.iter_mut().find(|r| r.id == Some(id)) else {
            return not_found();
        };
        record.status = status;
        if matches!(status, ResultStatus::Approved | ResultStatus::Rejected) {
            record.approved_by = approver;
            record.approved_at = Some(chrono::Utc::now().to_rfc3339());
        }
        ApiResponse::new(200, to_body(record))
    }

    fn collection_request(&mut self, path: &'static str, req: &ApiRequest, page: usize) -> ApiResponse {
        match req.method {
            Method::Get => {
                let items = self.collections.get(path).cloned().unwrap_or_default();
                self.list_response(path, page, items)
            }
            Method::Post => {
                let Some(Value::Object(mut obj)) = req.body.clone() else {
                    return bad_request(json!({ "detail": "Expected a JSON object." }));
                };
                let id = self.alloc_id();
                obj.insert("id".into(), json!(id));
                let created = Value::Object(obj);
                self.collections
                    .entry(path)
                    .or_default()
                    .push(created.clone());
                ApiResponse::new(201, created)
            }
            _ => ApiResponse::new(405, json!({ "detail": "Method not allowed." })),
        }
    }

    fn item_request(&mut self, path: &'static str, id: i64, req: &ApiRequest) -> ApiResponse {
        let items = self.collections.entry(path).or_default();
        let Some(pos) = items
            .iter()
            .position(|v| v.get("id").and_then(|i| i.as_i64()) == Some(id))
        else {
            return not_found();
        };
        match req.method {
            Method::Get => ApiResponse::new(200, items[pos].clone()),
            Method::Patch => {
                let Some(Value::Object(patch)) = req.body.as_ref() else {
                    return bad_request(json!({ "detail": "Expected a JSON object." }));
                };
                if let Value::Object(existing) = &mut items[pos] {
                    for (k, v) in patch {
                        if k != "id" {
                            existing.insert(k.clone(), v.clone());
                        }
                    }
                }
                ApiResponse::new(200, items[pos].clone())
            }
            Method::Delete => {
                items.remove(pos);
                ApiResponse::new(204, Value::Null)
            }
            Method::Post => ApiResponse::new(405, json!({ "detail": "Method not allowed." })),
        }
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let (path, page) = split_page(&req.path);

        if path == RESULTS_PATH {
            return Ok(match req.method {
                Method::Get => {
                    let items = self.results.iter().map(to_body).collect();
                    self.list_response(RESULTS_PATH, page, items)
                }
                Method::Post => self.create_result(req.body.as_ref()),
                _ => ApiResponse::new(405, json!({ "detail": "Method not allowed." })),
            });
        }
        if path == RESULTS_APPROVE_PATH {
            return Ok(match req.method {
                Method::Post => self.approve(req.body.as_ref()),
                _ => ApiResponse::new(405, json!({ "detail": "Method not allowed." })),
            });
        }
        for r in Resource::ALL {
            if path == r.path() {
                return Ok(self.collection_request(r.path(), req, page));
            }
        }
        for r in Resource::ALL {
            if let Some(id) = item_id(path, r.path()) {
                return Ok(self.item_request(r.path(), id, req));
            }
        }
        if let Some(id) = item_id(path, RESULTS_PATH) {
            return Ok(match req.method {
                Method::Patch => self.patch_result(id, req.body.as_ref()),
                Method::Get => match self.results.iter().find(|r| r.id == Some(id)) {
                    Some(r) => ApiResponse::new(200, to_body(r)),
                    None => not_found(),
                },
                _ => ApiResponse::new(405, json!({ "detail": "Method not allowed." })),
            });
        }
        Ok(not_found())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

fn split_page(raw: &str) -> (&str, usize) {
    let Some((path, query)) = raw.split_once('?') else {
        return (raw, 1);
    };
    let page = query
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == "page")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    (path, page)
}

fn item_id(path: &str, collection: &str) -> Option<i64> {
    path.strip_prefix(collection)?
        .strip_suffix('/')?
        .parse::<i64>()
        .ok()
}

fn ref_field(obj: &Map<String, Value>, key: &str) -> Option<EntityRef> {
    obj.get(key).and_then(EntityRef::from_json)
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_body(record: &ResultRecord) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

fn bad_request(body: Value) -> ApiResponse {
    ApiResponse::new(400, body)
}

fn not_found() -> ApiResponse {
    ApiResponse::new(404, json!({ "detail": "Not found." }))
}

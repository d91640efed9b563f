use crate::db;
use crate::drafts::{DraftInput, QueuedResult};
use crate::errors::{self, ErrorCode};
use crate::ipc::helpers::{
    get_opt_f64, get_opt_ref, get_opt_str, get_required_str, no_session, no_workspace,
    require_db, require_role, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use crate::results::aggregate::{group_by_review_key, ReviewKey};
use crate::store::QueryKey;
use serde_json::json;

/// Result fields as the UI sends them, shared with `results.create`.
pub fn draft_input(params: &serde_json::Value) -> Result<DraftInput, HandlerErr> {
    Ok(DraftInput {
        student: get_opt_ref(params, "student")?,
        subject: get_opt_ref(params, "subject")?,
        exam: get_opt_ref(params, "exam")?,
        class_name: get_opt_ref(params, "class")?,
        marks_obtained: get_opt_f64(params, "marksObtained")?,
        total_marks: get_opt_f64(params, "totalMarks")?,
        remarks: get_opt_str(params, "remarks"),
    })
}

fn draft_json(d: &QueuedResult) -> serde_json::Value {
    let mut v = json!(d);
    v["gradePreview"] = json!(d.grade_preview());
    v
}

fn in_group(filter: &ReviewKey, d: &QueuedResult) -> bool {
    filter.exam.as_ref().map_or(true, |e| *e == d.exam)
        && filter.class_name.as_ref().map_or(true, |c| *c == d.class_name)
}

fn drafts_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    // Drafts can be queued offline; a connected student may not queue any.
    if let Some(session) = state.session.as_ref() {
        require_role(session, &[Role::Admin, Role::Teacher], "queueing results")?;
    }
    let conn = require_db(state)?;
    let draft = draft_input(params)?
        .into_draft()
        .map_err(HandlerErr::from_error)?;
    db::drafts_insert(conn, &draft).map_err(HandlerErr::db)?;
    tracing::debug!(draft = %draft.id, "draft queued");
    Ok(json!({ "draft": draft_json(&draft) }))
}

fn drafts_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let drafts = db::drafts_list(conn).map_err(HandlerErr::db)?;
    let count = drafts.len();
    let groups: Vec<serde_json::Value> = group_by_review_key(drafts)
        .into_iter()
        .map(|g| {
            json!({
                "key": g.key,
                "studentCount": g.students.len(),
                "subjectCount": g.subjects.len(),
                "students": g.students,
                "subjects": g.subjects,
                "failedCount": g.items.iter().filter(|d| d.last_error.is_some()).count(),
                "drafts": g.items.iter().map(draft_json).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(json!({ "count": count, "groups": groups }))
}

fn drafts_remove(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let conn = require_db(state)?;
    if !db::drafts_delete(conn, &id).map_err(HandlerErr::db)? {
        return Err(HandlerErr::new(errors::NOT_FOUND, "draft not found"));
    }
    Ok(json!({ "ok": true }))
}

/// Posts queued drafts one by one. A failed draft stays queued with its
/// error; the others still go out.
fn drafts_submit(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let filter = ReviewKey::new(get_opt_ref(params, "exam")?, get_opt_ref(params, "class")?);

    let AppState {
        db: conn,
        session,
        store,
        ..
    } = state;
    let conn = conn.as_ref().ok_or_else(no_workspace)?;
    let session = session.as_mut().ok_or_else(no_session)?;
    require_role(session, &[Role::Admin, Role::Teacher], "submitting results")?;

    let drafts = db::drafts_list(conn).map_err(HandlerErr::db)?;
    let mut submitted = 0usize;
    let mut failed = 0usize;
    let mut outcomes = Vec::new();
    for d in drafts.into_iter().filter(|d| in_group(&filter, d)) {
        match session.api.create_result(&d.to_new_result()) {
            Ok(created) => {
                submitted += 1;
                let mut outcome = json!({ "id": d.id, "ok": true, "resultId": created.id });
                // The result exists upstream now; a local failure is reported,
                // not allowed to hide it.
                if let Err(e) = db::drafts_delete(conn, &d.id) {
                    tracing::warn!(draft = %d.id, "submitted draft could not be removed: {e:#}");
                    outcome["localError"] = json!(format!("{e:#}"));
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(draft = %d.id, "draft submission failed: {message}");
                failed += 1;
                let mut outcome = json!({
                    "id": d.id,
                    "ok": false,
                    "code": e.error_code(),
                    "message": message,
                });
                if let Err(db_err) = db::drafts_set_error(conn, &d.id, Some(&message)) {
                    tracing::warn!(draft = %d.id, "could not record draft error: {db_err:#}");
                    outcome["localError"] = json!(format!("{db_err:#}"));
                }
                outcomes.push(outcome);
            }
        }
    }
    if submitted > 0 {
        store.invalidate(QueryKey::Results);
    }
    let remaining = match db::drafts_count(conn) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!("could not count remaining drafts: {e:#}");
            None
        }
    };
    tracing::info!(submitted, failed, ?remaining, "drafts submitted");
    Ok(json!({
        "submitted": submitted,
        "failed": failed,
        "remaining": remaining,
        "outcomes": outcomes,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "drafts.add" => drafts_add(state, &req.params),
        "drafts.list" => drafts_list(state),
        "drafts.remove" => drafts_remove(state, &req.params),
        "drafts.submit" => drafts_submit(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, res))
}

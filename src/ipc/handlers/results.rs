use crate::ipc::handlers::drafts::draft_input;
use crate::ipc::helpers::{
    get_bool, get_opt_ref, get_opt_str, get_required_i64, get_required_str, require_role,
    respond, session_parts, HandlerErr,
};
use crate::ipc::types::{AppState, Request, Session};
use crate::model::{EntityRef, ResultStatus, Role};
use crate::results::aggregate::{review_queues, ReviewKey};
use crate::results::approval::{self, ApprovalAction};
use crate::results::display::{queues_json, result_row, ResultRow};
use crate::results::gate;
use crate::store::QueryKey;
use serde_json::json;

/// The student a student session is allowed to read.
fn own_student(session: &Session) -> Result<EntityRef, HandlerErr> {
    session
        .user
        .as_deref()
        .and_then(EntityRef::from_name)
        .ok_or_else(|| HandlerErr::new(crate::errors::FORBIDDEN, "student session has no user"))
}

fn results_list(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (session, store) = session_parts(state)?;
    if get_bool(params, "refresh") {
        store.invalidate(QueryKey::Results);
    }
    let mut records = store
        .results(&mut session.api)
        .map_err(HandlerErr::from_error)?;
    if session.role == Role::Student {
        let own = own_student(session)?;
        records = gate::student_visible(records, Some(&own));
    }
    if let Some(raw) = get_opt_str(params, "status") {
        let wanted = ResultStatus::parse(&raw);
        records.retain(|r| r.status == wanted);
    }
    let rows: Vec<ResultRow> = records.iter().map(result_row).collect();
    Ok(json!({
        "count": rows.len(),
        "results": rows,
        "cacheSeq": store.seq(QueryKey::Results),
    }))
}

fn results_review_groups(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (session, store) = session_parts(state)?;
    require_role(session, &[Role::Admin, Role::Teacher], "reviewing results")?;
    if get_bool(params, "refresh") {
        store.invalidate(QueryKey::Results);
    }
    let records = store
        .results(&mut session.api)
        .map_err(HandlerErr::from_error)?;
    let mut out = queues_json(&review_queues(records));
    out["cacheSeq"] = json!(store.seq(QueryKey::Results));
    Ok(out)
}

fn results_approve(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let raw_action = get_required_str(params, "action")?;
    let action = ApprovalAction::parse(&raw_action)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown action: {}", raw_action)))?;
    let key = ReviewKey::new(get_opt_ref(params, "exam")?, get_opt_ref(params, "class")?);
    let remarks = params.get("remarks").and_then(|v| v.as_str());

    // Input problems are reported before session or role checks.
    approval::validate(&key, action, remarks).map_err(HandlerErr::from_error)?;

    let (session, store) = session_parts(state)?;
    require_role(session, &[Role::Admin], "approving results")?;
    let outcome = approval::submit_approval(&mut session.api, store, &key, action, remarks)
        .map_err(HandlerErr::from_error)?;

    let queues = outcome.records.map(|r| queues_json(&review_queues(r)));
    Ok(json!({
        "action": outcome.action,
        "group": key,
        "updated": outcome.updated,
        "queues": queues,
        "refreshError": outcome.refresh_error,
        "cacheSeq": store.seq(QueryKey::Results),
    }))
}

fn results_set_status(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_i64(params, "id")?;
    let raw = get_required_str(params, "status")?;
    let status = match ResultStatus::parse(&raw) {
        s @ (ResultStatus::Approved | ResultStatus::Rejected) => s,
        _ => return Err(HandlerErr::bad_params("status must be approved or rejected")),
    };

    let (session, store) = session_parts(state)?;
    require_role(session, &[Role::Admin], "changing result status")?;
    let record = session
        .api
        .set_result_status(id, status)
        .map_err(HandlerErr::from_error)?;
    store.invalidate(QueryKey::Results);
    tracing::info!(id, status = status.as_str(), "result status overridden");
    Ok(json!({ "result": result_row(&record) }))
}

fn results_create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let draft = draft_input(params)?
        .into_draft()
        .map_err(HandlerErr::from_error)?;

    let (session, store) = session_parts(state)?;
    require_role(session, &[Role::Admin, Role::Teacher], "submitting results")?;
    let created = session
        .api
        .create_result(&draft.to_new_result())
        .map_err(HandlerErr::from_error)?;
    store.invalidate(QueryKey::Results);
    Ok(json!({ "result": result_row(&created) }))
}

fn results_for_student(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let requested = get_opt_ref(params, "student")?;
    let (session, store) = session_parts(state)?;

    // Students only ever see their own results.
    let student = if session.role == Role::Student {
        let own = own_student(session)?;
        if requested.as_ref().is_some_and(|r| *r != own) {
            return Err(HandlerErr::new(
                crate::errors::FORBIDDEN,
                "students can only read their own results",
            ));
        }
        Some(own)
    } else {
        requested
    };

    let records = store
        .results(&mut session.api)
        .map_err(HandlerErr::from_error)?;
    let visible = gate::student_visible(records, student.as_ref());
    let rows: Vec<ResultRow> = visible.iter().map(result_row).collect();
    Ok(json!({
        "student": student,
        "count": rows.len(),
        "results": rows,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "results.list" => results_list(state, &req.params),
        "results.reviewGroups" => results_review_groups(state, &req.params),
        "results.approve" => results_approve(state, &req.params),
        "results.setStatus" => results_set_status(state, &req.params),
        "results.create" => results_create(state, &req.params),
        "results.forStudent" => results_for_student(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, res))
}

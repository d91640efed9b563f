use crate::errors;
use crate::ipc::helpers::{
    get_bool, get_required_i64, get_required_str, require_role, respond, session_parts, HandlerErr,
};
use crate::ipc::types::{AppState, Request, Session};
use crate::model::Role;
use crate::resources::Resource;
use crate::store::QueryKey;
use serde_json::json;

fn resource_param(params: &serde_json::Value) -> Result<Resource, HandlerErr> {
    let raw = get_required_str(params, "resource")?;
    Resource::parse(&raw).ok_or_else(|| HandlerErr {
        code: errors::BAD_PARAMS,
        message: format!("unknown resource: {}", raw),
        details: Some(json!({
            "known": Resource::ALL.iter().map(|r| r.name()).collect::<Vec<_>>(),
        })),
    })
}

fn data_param(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    match params.get("data") {
        Some(v @ serde_json::Value::Object(_)) => Ok(v.clone()),
        _ => Err(HandlerErr::bad_params("data must be an object")),
    }
}

fn check_read(session: &Session, resource: Resource) -> Result<(), HandlerErr> {
    if session.role == Role::Student && !resource.student_readable() {
        return Err(HandlerErr::new(
            errors::FORBIDDEN,
            format!("students cannot read {}", resource.name()),
        ));
    }
    Ok(())
}

fn check_write(session: &Session, resource: Resource) -> Result<(), HandlerErr> {
    let what = format!("changing {}", resource.name());
    if resource.admin_writes_only() {
        require_role(session, &[Role::Admin], &what)
    } else {
        require_role(session, &[Role::Admin, Role::Teacher], &what)
    }
}

fn resources_list(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let resource = resource_param(params)?;
    let (session, store) = session_parts(state)?;
    check_read(session, resource)?;
    let key = QueryKey::Resource(resource);
    if get_bool(params, "refresh") {
        store.invalidate(key);
    }
    let items = store
        .values(&mut session.api, resource)
        .map_err(HandlerErr::from_error)?;
    Ok(json!({
        "resource": resource.name(),
        "count": items.len(),
        "items": items,
        "cacheSeq": store.seq(key),
    }))
}

fn resources_create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let resource = resource_param(params)?;
    let data = data_param(params)?;
    let (session, store) = session_parts(state)?;
    check_write(session, resource)?;
    let item = session
        .api
        .create_value(resource.path(), data)
        .map_err(HandlerErr::from_error)?;
    store.invalidate(QueryKey::Resource(resource));
    Ok(json!({ "resource": resource.name(), "item": item }))
}

fn resources_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let resource = resource_param(params)?;
    let id = get_required_i64(params, "id")?;
    let data = data_param(params)?;
    let (session, store) = session_parts(state)?;
    check_write(session, resource)?;
    let item = session
        .api
        .update_value(&resource.item_path(id), data)
        .map_err(HandlerErr::from_error)?;
    store.invalidate(QueryKey::Resource(resource));
    Ok(json!({ "resource": resource.name(), "item": item }))
}

fn resources_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let resource = resource_param(params)?;
    let id = get_required_i64(params, "id")?;
    let (session, store) = session_parts(state)?;
    check_write(session, resource)?;
    session
        .api
        .delete_value(&resource.item_path(id))
        .map_err(HandlerErr::from_error)?;
    store.invalidate(QueryKey::Resource(resource));
    tracing::info!(resource = resource.name(), id, "record deleted");
    Ok(json!({ "resource": resource.name(), "deleted": id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "resources.list" => resources_list(state, &req.params),
        "resources.create" => resources_create(state, &req.params),
        "resources.update" => resources_update(state, &req.params),
        "resources.delete" => resources_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, res))
}

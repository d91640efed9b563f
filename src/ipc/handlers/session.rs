use crate::api::http::HttpTransport;
use crate::api::memory::{Envelope, MemoryTransport};
use crate::api::{ApiClient, Transport};
use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_bool, get_opt_str, respond, HandlerErr};
use crate::ipc::types::{AppState, BackendKind, Request, Session};
use crate::model::Role;
use crate::store::QueryStore;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Settings key for the last successful connection. Never holds the token.
pub const SAVED_SESSION_KEY: &str = "session.last";

const DEFAULT_PAGE_SIZE: usize = 10;

fn positive_u64(params: &serde_json::Value, key: &str) -> Result<Option<u64>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a positive integer", key))),
    }
}

fn status_json(session: &Session, store: &QueryStore) -> serde_json::Value {
    json!({
        "connected": true,
        "role": session.role,
        "user": session.user,
        "backend": session.backend.as_str(),
        "target": session.api.describe(),
        "connectedAt": session.connected_at,
        "requestsSent": session.api.requests_sent(),
        "cache": store.snapshot(),
    })
}

fn session_connect(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let role = match get_opt_str(params, "role") {
        Some(raw) => Role::parse(&raw)
            .ok_or_else(|| HandlerErr::bad_params(format!("unknown role: {}", raw)))?,
        None => state
            .config
            .role
            .ok_or_else(|| HandlerErr::bad_params("missing role"))?,
    };
    let user = get_opt_str(params, "user").or_else(|| state.config.user.clone());
    let max_pages = positive_u64(params, "maxPages")?
        .map(|n| n as usize)
        .unwrap_or(state.config.max_pages);

    let backend = match get_opt_str(params, "backend").as_deref() {
        None | Some("http") => BackendKind::Http,
        Some("memory") => BackendKind::Memory,
        Some(other) => return Err(HandlerErr::bad_params(format!("unknown backend: {}", other))),
    };

    let api_base = get_opt_str(params, "apiBase").unwrap_or_else(|| state.config.api_base.clone());
    let mut memory = None;
    let transport: Box<dyn Transport> = match backend {
        BackendKind::Http => {
            let token = get_opt_str(params, "token").or_else(|| state.config.api_token.clone());
            let timeout = positive_u64(params, "timeoutSecs")?
                .map(Duration::from_secs)
                .or(state.config.timeout);
            let http = HttpTransport::new(&api_base, token, timeout).map_err(HandlerErr::from_error)?;
            Box::new(http)
        }
        BackendKind::Memory => {
            let envelope = match get_opt_str(params, "envelope").as_deref() {
                None | Some("array") => Envelope::Array,
                Some("paginated") => Envelope::Paginated {
                    page_size: positive_u64(params, "pageSize")?
                        .map(|n| n as usize)
                        .unwrap_or(DEFAULT_PAGE_SIZE),
                },
                Some(other) => {
                    return Err(HandlerErr::bad_params(format!("unknown envelope: {}", other)))
                }
            };
            // keepData carries the previous in-memory backend over to the new
            // identity; otherwise every connect starts empty.
            let kept = if get_bool(params, "keepData") {
                state.session.as_ref().and_then(|s| s.memory.clone())
            } else {
                None
            };
            let shared = match kept {
                Some(shared) => {
                    {
                        let mut backend = shared.borrow_mut();
                        backend.set_actor(user.clone());
                        backend.set_envelope(envelope);
                    }
                    tracing::debug!("reusing in-memory backend");
                    shared
                }
                None => Rc::new(RefCell::new(MemoryTransport::new(envelope, user.clone()))),
            };
            memory = Some(Rc::clone(&shared));
            Box::new(shared)
        }
    };

    let session = Session {
        role,
        user: user.clone(),
        backend,
        api: ApiClient::new(transport, max_pages),
        memory,
        connected_at: chrono::Utc::now().to_rfc3339(),
    };
    tracing::info!(
        role = role.as_str(),
        backend = backend.as_str(),
        target = %session.api.describe(),
        "session connected"
    );

    if let Some(conn) = state.db.as_ref() {
        let saved = json!({
            "backend": backend.as_str(),
            "apiBase": api_base,
            "role": role,
            "user": user,
            "maxPages": max_pages,
        });
        if let Err(e) = db::settings_set_json(conn, SAVED_SESSION_KEY, &saved) {
            tracing::warn!("could not save session settings: {e:#}");
        }
    }

    // Cached data belongs to the previous identity.
    state.store.clear();
    let result = status_json(&session, &state.store);
    state.session = Some(session);
    Ok(result)
}

fn handle_session_connect(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, session_connect(state, &req.params))
}

fn handle_session_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.as_ref() {
        Some(s) => ok(&req.id, status_json(s, &state.store)),
        None => ok(&req.id, json!({ "connected": false })),
    }
}

fn handle_session_disconnect(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_connected = state.session.take().is_some();
    state.store.clear();
    if was_connected {
        tracing::info!("session disconnected");
    }
    ok(&req.id, json!({ "disconnected": was_connected }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.connect" => Some(handle_session_connect(state, req)),
        "session.status" => Some(handle_session_status(state, req)),
        "session.disconnect" => Some(handle_session_disconnect(state, req)),
        _ => None,
    }
}

use super::handlers;
use super::types::{AppState, Request};
use crate::errors;
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::session::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::results::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::drafts::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::resources::try_handle(state, &req) {
        return resp;
    }

    tracing::debug!(method = %req.method, "no handler");
    err(
        &req.id,
        errors::NOT_IMPLEMENTED,
        format!("unknown method: {}", req.method),
        None,
    )
}

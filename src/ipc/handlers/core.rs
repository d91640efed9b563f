use crate::db;
use crate::errors;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::session::SAVED_SESSION_KEY;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "connected": state.session.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, errors::BAD_PARAMS, "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            // A broken settings row must not keep the workspace closed.
            let saved = db::settings_get_json(&conn, SAVED_SESSION_KEY).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable saved session: {e:#}");
                None
            });
            let draft_count = match db::drafts_count(&conn) {
                Ok(n) => n,
                Err(e) => return err(&req.id, errors::DB_QUERY_FAILED, format!("{e:#}"), None),
            };
            tracing::info!(workspace = %path.display(), drafts = draft_count, "workspace opened");

            state.workspace = Some(path.clone());
            state.db = Some(conn);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "draftCount": draft_count,
                    "savedSession": saved,
                }),
            )
        }
        Err(e) => err(&req.id, errors::DB_OPEN_FAILED, format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}

//! Parameter parsing and access checks shared by the handler families.

use super::error::{err, ok};
use super::types::{AppState, Session};
use crate::errors::{self, ErrorCode};
use crate::model::{EntityRef, Role};
use crate::store::QueryStore;
use rusqlite::Connection;
use std::fmt::Display;

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::new(errors::BAD_PARAMS, message)
    }

    /// Carries the code and details of any domain error.
    pub fn from_error<E: ErrorCode + Display>(e: E) -> Self {
        HandlerErr {
            code: e.error_code(),
            message: e.to_string(),
            details: e.error_details(),
        }
    }

    pub fn db(e: anyhow::Error) -> Self {
        HandlerErr::new(errors::DB_QUERY_FAILED, format!("{e:#}"))
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    get_opt_str(params, key).ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Trimmed string parameter; blank counts as absent.
pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A reference parameter, either a number or a string. `null` and blank
/// strings are absent; anything else is a bad parameter.
pub fn get_opt_ref(params: &serde_json::Value, key: &str) -> Result<Option<EntityRef>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v @ serde_json::Value::String(_)) => Ok(EntityRef::from_json(v)),
        Some(v @ serde_json::Value::Number(n)) if n.as_i64().is_some() => Ok(EntityRef::from_json(v)),
        Some(_) => Err(HandlerErr::bad_params(format!(
            "{} must be an integer id or a name",
            key
        ))),
    }
}

pub fn get_opt_f64(params: &serde_json::Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| HandlerErr::bad_params(format!("{} must be a number", key))),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a number", key))),
    }
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_bool(params: &serde_json::Value, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

pub fn no_workspace() -> HandlerErr {
    HandlerErr::new(errors::NO_WORKSPACE, "select a workspace first")
}

pub fn no_session() -> HandlerErr {
    HandlerErr::new(errors::NO_SESSION, "connect a session first")
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(no_workspace)
}

/// The live session and the query store, borrowed together.
pub fn session_parts(state: &mut AppState) -> Result<(&mut Session, &mut QueryStore), HandlerErr> {
    let AppState { session, store, .. } = state;
    match session.as_mut() {
        Some(s) => Ok((s, store)),
        None => Err(no_session()),
    }
}

pub fn require_role(session: &Session, allowed: &[Role], what: &str) -> Result<(), HandlerErr> {
    if allowed.contains(&session.role) {
        return Ok(());
    }
    Err(HandlerErr {
        code: errors::FORBIDDEN,
        message: format!("{} is not allowed for role {}", what, session.role.as_str()),
        details: Some(serde_json::json!({ "role": session.role })),
    })
}

pub fn respond(id: &str, res: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match res {
        Ok(result) => ok(id, result),
        Err(e) => e.response(id),
    }
}

//! Response envelopes. Every line schoold writes is one of these.

use crate::errors;
use serde_json::json;

fn error_object(code: &str, message: String, details: Option<serde_json::Value>) -> serde_json::Value {
    let mut error = json!({ "code": code, "message": message });
    if let Some(d) = details {
        error["details"] = d;
    }
    error
}

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({ "id": id, "ok": true, "result": result })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    json!({
        "id": id,
        "ok": false,
        "error": error_object(code, message.into(), details),
    })
}

/// Answer to a line that is not a request. There is no id to echo.
pub fn bad_json(message: impl Into<String>) -> serde_json::Value {
    json!({
        "ok": false,
        "error": error_object(errors::BAD_JSON, message.into(), None),
    })
}

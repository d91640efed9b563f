//! List bodies arrive either as a bare array or as a paginated envelope
//! `{count, next, previous, results}`. Both become one `Collection`.

use super::ApiError;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub items: Vec<Value>,
    pub count: Option<u64>,
    pub next: Option<String>,
}

impl Collection {
    pub fn from_body(body: Value) -> Result<Collection, ApiError> {
        match body {
            Value::Array(items) => Ok(Collection {
                items,
                count: None,
                next: None,
            }),
            Value::Object(mut obj) => {
                let items = match obj.remove("results") {
                    Some(Value::Array(items)) => items,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(ApiError::Decode(format!(
                            "expected `results` to be an array, got {}",
                            json_kind(&other)
                        )))
                    }
                };
                let count = obj.get("count").and_then(|v| v.as_u64());
                let next = obj
                    .get("next")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Ok(Collection { items, count, next })
            }
            Value::Null => Ok(Collection::default()),
            other => Err(ApiError::Decode(format!(
                "expected a list or an object with `results`, got {}",
                json_kind(&other)
            ))),
        }
    }
}

pub(crate) fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! REST boundary. Transports move raw JSON; `ApiClient` owns status
//! handling, error-message extraction, pagination and decoding so every
//! transport behaves the same above this line.

pub mod collection;
pub mod http;
pub mod memory;

use crate::errors::{self, ErrorCode};
use crate::model::{NewResult, ResultRecord, ResultStatus};
use collection::Collection;
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub const RESULTS_PATH: &str = "/results/";
pub const RESULTS_APPROVE_PATH: &str = "/results/approve/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(method: Method, path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        ApiResponse { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Network { message: String },
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Network { .. } => errors::NETWORK_ERROR,
            ApiError::Http { .. } => errors::HTTP_ERROR,
            ApiError::Decode(_) => errors::DECODE_ERROR,
        }
    }

    fn error_details(&self) -> Option<Value> {
        match self {
            ApiError::Http { status, .. } => Some(json!({ "status": status })),
            _ => None,
        }
    }
}

pub trait Transport {
    fn send(&mut self, req: &ApiRequest) -> Result<ApiResponse, ApiError>;

    /// Short label for status reporting, e.g. the base URL.
    fn describe(&self) -> String;
}

/// A transport shared with the session, so its state can outlive one client.
impl<T: Transport> Transport for Rc<RefCell<T>> {
    fn send(&mut self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.borrow_mut().send(req)
    }

    fn describe(&self) -> String {
        self.borrow().describe()
    }
}

/// Picks the most useful human message out of an error body: `detail`,
/// then `message`, then DRF-style field errors, then `fallback`.
pub fn extract_message(body: &Value, fallback: &str) -> String {
    if let Some(s) = body.get("detail").and_then(|v| v.as_str()) {
        if !s.trim().is_empty() {
            return s.to_string();
        }
    }
    if let Some(s) = body.get("message").and_then(|v| v.as_str()) {
        if !s.trim().is_empty() {
            return s.to_string();
        }
    }
    if let Some(obj) = body.as_object() {
        let mut parts: Vec<String> = Vec::new();
        for (field, v) in obj {
            let msgs: Vec<&str> = match v {
                Value::String(s) => vec![s.as_str()],
                Value::Array(items) => items.iter().filter_map(|i| i.as_str()).collect(),
                _ => Vec::new(),
            };
            if msgs.is_empty() {
                continue;
            }
            if field == "non_field_errors" {
                parts.push(msgs.join(" "));
            } else {
                parts.push(format!("{}: {}", field, msgs.join(" ")));
            }
        }
        if !parts.is_empty() {
            return parts.join("; ");
        }
    }
    fallback.to_string()
}

/// Reply of `POST /results/approve/`. Backends may omit the count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalReply {
    pub updated: Option<u64>,
}

pub struct ApiClient {
    transport: Box<dyn Transport>,
    max_pages: usize,
    requests_sent: u64,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>, max_pages: usize) -> Self {
        ApiClient {
            transport,
            max_pages: max_pages.max(1),
            requests_sent: 0,
        }
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    fn call(&mut self, req: ApiRequest, fallback: &str) -> Result<Value, ApiError> {
        tracing::debug!(method = req.method.as_str(), path = %req.path, "backend request");
        self.requests_sent += 1;
        let resp = self.transport.send(&req)?;
        if resp.is_success() {
            return Ok(resp.body);
        }
        let message = extract_message(&resp.body, fallback);
        tracing::warn!(
            method = req.method.as_str(),
            path = %req.path,
            status = resp.status,
            "backend rejected request: {message}"
        );
        Err(ApiError::Http {
            status: resp.status,
            message,
        })
    }

    /// Fetches every page of a list endpoint, up to the page cap.
    pub fn list_values(&mut self, path: &str) -> Result<Vec<Value>, ApiError> {
        let mut items: Vec<Value> = Vec::new();
        let mut next = Some(path.to_string());
        let mut pages = 0usize;
        let mut expected: Option<u64> = None;
        while let Some(page_path) = next.take() {
            if pages == self.max_pages {
                tracing::warn!(path, pages, ?expected, "page cap reached; list truncated");
                break;
            }
            let body = self.call(ApiRequest::get(page_path), "Failed to load data")?;
            let page = Collection::from_body(body)?;
            expected = page.count.or(expected);
            items.extend(page.items);
            next = page.next;
            pages += 1;
        }
        Ok(items)
    }

    pub fn create_value(&mut self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.call(
            ApiRequest::with_body(Method::Post, path, body),
            "Failed to create record",
        )
    }

    pub fn update_value(&mut self, path: &str, patch: Value) -> Result<Value, ApiError> {
        self.call(
            ApiRequest::with_body(Method::Patch, path, patch),
            "Failed to update record",
        )
    }

    pub fn delete_value(&mut self, path: &str) -> Result<(), ApiError> {
        self.call(
            ApiRequest {
                method: Method::Delete,
                path: path.to_string(),
                body: None,
            },
            "Failed to delete record",
        )
        .map(|_| ())
    }

    /// Loads all result records. Entries that are not objects are skipped.
    pub fn list_results(&mut self) -> Result<Vec<ResultRecord>, ApiError> {
        let raw = self.list_values(RESULTS_PATH)?;
        let mut out = Vec::with_capacity(raw.len());
        for (i, v) in raw.into_iter().enumerate() {
            match serde_json::from_value::<ResultRecord>(v) {
                Ok(r) => out.push(r),
                Err(e) => tracing::warn!(index = i, "skipping malformed result entry: {e}"),
            }
        }
        Ok(out)
    }

    pub fn create_result(&mut self, new: &NewResult) -> Result<ResultRecord, ApiError> {
        let body = serde_json::to_value(new).map_err(|e| ApiError::Decode(e.to_string()))?;
        let created = self.call(
            ApiRequest::with_body(Method::Post, RESULTS_PATH, body),
            "Failed to submit result",
        )?;
        decode_record(created)
    }

    pub fn approve_batch<B: Serialize>(&mut self, batch: &B) -> Result<ApprovalReply, ApiError> {
        let body = serde_json::to_value(batch).map_err(|e| ApiError::Decode(e.to_string()))?;
        let reply = self.call(
            ApiRequest::with_body(Method::Post, RESULTS_APPROVE_PATH, body),
            "Failed to update results",
        )?;
        Ok(ApprovalReply {
            updated: reply.get("updated").and_then(|v| v.as_u64()),
        })
    }

    pub fn set_result_status(
        &mut self,
        id: i64,
        status: ResultStatus,
    ) -> Result<ResultRecord, ApiError> {
        let updated = self.call(
            ApiRequest::with_body(
                Method::Patch,
                format!("{}{}/", RESULTS_PATH, id),
                json!({ "status": status }),
            ),
            "Failed to update result",
        )?;
        decode_record(updated)
    }
}

fn decode_record(v: Value) -> Result<ResultRecord, ApiError> {
    serde_json::from_value(v).map_err(|e| ApiError::Decode(format!("result record: {e}")))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    #[test]
    fn message_prefers_detail_then_message() {
        let body = json!({ "detail": "Not found.", "message": "other" });
        assert_eq!(extract_message(&body, "fallback"), "Not found.");
        let body = json!({ "message": "Login failed" });
        assert_eq!(extract_message(&body, "fallback"), "Login failed");
    }

    #[test]
    fn message_falls_back_to_field_errors_then_fallback() {
        let body = json!({ "non_field_errors": ["The fields student, exam must make a unique set."] });
        assert_eq!(
            extract_message(&body, "fallback"),
            "The fields student, exam must make a unique set."
        );
        let body = json!({ "marks_obtained": ["A valid integer is required."] });
        assert_eq!(
            extract_message(&body, "fallback"),
            "marks_obtained: A valid integer is required."
        );
        assert_eq!(extract_message(&Value::Null, "fallback"), "fallback");
        assert_eq!(extract_message(&json!("<html>"), "fallback"), "fallback");
    }

    #[test]
    fn list_follows_next_links() {
        let (transport, seen) = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(
                200,
                json!({ "count": 3, "next": "/results/?page=2", "results": [{ "id": 1 }, { "id": 2 }] }),
            )),
            Ok(ApiResponse::new(
                200,
                json!({ "count": 3, "next": null, "results": [{ "id": 3 }] }),
            )),
        ]);
        let mut api = ApiClient::new(Box::new(transport), 10);
        let records = api.list_results().expect("list");
        assert_eq!(records.len(), 3);
        assert_eq!(seen.borrow()[1].path, "/results/?page=2");
        assert_eq!(api.requests_sent(), 2);
    }

    #[test]
    fn page_cap_truncates() {
        let (transport, _) = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            200,
            json!({ "next": "/notes/?page=2", "results": [{ "id": 1 }] }),
        ))]);
        let mut api = ApiClient::new(Box::new(transport), 1);
        let items = api.list_values("/notes/").expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(api.requests_sent(), 1);
    }

    #[test]
    fn http_failure_carries_extracted_message_and_status() {
        let (transport, _) = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            403,
            json!({ "detail": "You do not have permission to perform this action." }),
        ))]);
        let mut api = ApiClient::new(Box::new(transport), 10);
        let err = api.list_results().expect_err("forbidden");
        match err {
            ApiError::Http { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "You do not have permission to perform this action.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let (transport, _) = ScriptedTransport::new(vec![Ok(ApiResponse::new(
            200,
            json!([{ "id": 1, "status": "approved" }, "garbage", { "id": 2 }]),
        ))]);
        let mut api = ApiClient::new(Box::new(transport), 10);
        let records = api.list_results().expect("list");
        assert_eq!(records.len(), 2);
    }
}

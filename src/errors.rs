//! Error codes shared by every error enum that can reach the IPC boundary.

pub const BAD_JSON: &str = "bad_json";
pub const NOT_IMPLEMENTED: &str = "not_implemented";
pub const BAD_PARAMS: &str = "bad_params";
pub const VALIDATION_FAILED: &str = "validation_failed";
pub const FORBIDDEN: &str = "forbidden";
pub const NO_SESSION: &str = "no_session";
pub const NO_WORKSPACE: &str = "no_workspace";
pub const NETWORK_ERROR: &str = "network_error";
pub const HTTP_ERROR: &str = "http_error";
pub const DECODE_ERROR: &str = "decode_error";
pub const DB_OPEN_FAILED: &str = "db_open_failed";
pub const DB_QUERY_FAILED: &str = "db_query_failed";
pub const NOT_FOUND: &str = "not_found";

/// Every error that is reported to the UI shell maps to one stable code.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;

    /// Structured extras for the `error.details` field.
    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }
}

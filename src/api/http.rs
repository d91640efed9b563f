use super::{ApiError, ApiRequest, ApiResponse, Method, Transport};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;

/// Blocking HTTP transport against the school REST API.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Paginated envelopes return absolute `next` links; those are used as-is.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&req.path);
        let mut builder = match req.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        builder = builder.header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.header(AUTHORIZATION, format!("Token {token}"));
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().map_err(|e| ApiError::Network {
            message: format!("{} {} failed: {e}", req.method.as_str(), url),
        })?;
        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| ApiError::Network {
            message: format!("failed to read response from {url}: {e}"),
        })?;

        // Error pages are often HTML; keep them as a string so the caller can
        // still fall back to a generic message.
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ApiResponse::new(status, body))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

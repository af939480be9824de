//! Backend transport: the seam between controllers and the REST API.
//!
//! A [`Transport`] sends one [`ApiRequest`] and yields the decoded JSON body
//! for 2xx answers, or a [`TransportError`] carrying whatever the backend
//! said. The `{success, message, ...}` envelope is interpreted one level up,
//! in [`envelope`].

mod envelope;
mod http;

pub use envelope::{call, Envelope};
pub use http::HttpSession;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP {status} {status_text}")]
    Status { status: u16, status_text: String, payload: Option<Value> },

    #[error("network: {0}")]
    Network(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// One REST call. Paths are absolute (`/api/...`) and joined onto the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new(Method::GET, path) }
    pub fn post(path: impl Into<String>, body: Value) -> Self { Self::new(Method::POST, path).with_body(body) }
    pub fn put(path: impl Into<String>, body: Value) -> Self { Self::new(Method::PUT, path).with_body(body) }
    pub fn patch(path: impl Into<String>) -> Self { Self::new(Method::PATCH, path).with_body(Value::Object(Default::default())) }
    pub fn delete(path: impl Into<String>) -> Self { Self::new(Method::DELETE, path) }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<Value, TransportError>;
}

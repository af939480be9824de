use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::{ApiRequest, Transport, TransportError};

/// Cookie-carrying HTTP session against the backend.
///
/// The session cookie set by `/api/login` is kept in the client's cookie jar
/// and replayed on every request, the same way a browser sends credentials.
#[derive(Clone)]
pub struct HttpSession {
    base: Url,
    client: reqwest::Client,
}

impl HttpSession {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base: base_url, client })
    }
}

#[async_trait]
impl Transport for HttpSession {
    async fn send(&self, req: ApiRequest) -> Result<Value, TransportError> {
        let url = self
            .base
            .join(&req.path)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", req.path, e)))?;
        let mut rb = self.client.request(req.method.clone(), url);
        if !req.query.is_empty() {
            rb = rb.query(&req.query);
        }
        if let Some(body) = &req.body {
            rb = rb.json(body);
        }
        let resp = rb.send().await.map_err(|e| TransportError::Network(e.to_string()))?;
        let status = resp.status();
        tracing::debug!(target: "transport", method = %req.method, path = %req.path, status = status.as_u16(), "response");
        let text = resp.text().await.map_err(|e| TransportError::Network(e.to_string()))?;
        // Error pages are not always JSON; keep the payload only when it parses.
        let payload: Option<Value> = if text.trim().is_empty() { None } else { serde_json::from_str(&text).ok() };
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                payload,
            });
        }
        payload.ok_or_else(|| TransportError::Decode(format!("non-JSON body from {}", req.path)))
    }
}

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{ApiRequest, Transport, TransportError};
use crate::error::{AppError, CONNECTIVITY_MESSAGE};

/// The `{success, message, ...}` wrapper every backend answer uses.
/// Everything besides `success` and `message` lands in `data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Envelope {
    pub fn parse(v: Value) -> Result<Self, TransportError> {
        serde_json::from_value(v).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Server message when present and non-empty, else `default`.
    pub fn message_or(&self, default: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, TransportError> {
        let v = self
            .data
            .get(key)
            .cloned()
            .ok_or_else(|| TransportError::Decode(format!("missing field '{}'", key)))?;
        serde_json::from_value(v).map_err(|e| TransportError::Decode(format!("field '{}': {}", key, e)))
    }
}

/// Send `req` and interpret the envelope.
///
/// `success=false` becomes [`AppError::Server`] with the server message (or
/// `fallback`); rejected requests are classified by [`AppError::from_transport`]
/// with the generic connectivity message as last resort.
pub async fn call(transport: &dyn Transport, req: ApiRequest, fallback: &str) -> Result<Envelope, AppError> {
    let method = req.method.clone();
    let path = req.path.clone();
    let body = match transport.send(req).await {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(target: "transport", %method, path = %path, error = %e, "request rejected");
            return Err(AppError::from_transport(&e, CONNECTIVITY_MESSAGE));
        }
    };
    let env = Envelope::parse(body).map_err(|e| AppError::from_transport(&e, CONNECTIVITY_MESSAGE))?;
    if env.success {
        Ok(env)
    } else {
        tracing::debug!(target: "transport", %method, path = %path, message = ?env.message, "success=false");
        Err(AppError::server("rejected".to_string(), env.message_or(fallback)))
    }
}

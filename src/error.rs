//! Unified console error model.
//! Every user action ends in at most one of these; each variant carries a
//! stable code and a human-readable message that is shown as a notification
//! or inline form message.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::transport::TransportError;
use crate::ui::Severity;

/// Fallback shown when the backend cannot be reached and sent no message.
pub const CONNECTIVITY_MESSAGE: &str = "Connection error. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Rejected locally; no request was issued.
    Validation { code: String, message: String },
    /// The backend answered `success=false` (or an error status with a message).
    Server { code: String, message: String },
    /// Network failure or an error status without a usable payload.
    Transport { code: String, message: String },
    Auth { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Server { code, .. }
            | AppError::Transport { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Server { message, .. }
            | AppError::Transport { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn server<S: Into<String>>(code: S, msg: S) -> Self { AppError::Server { code: code.into(), message: msg.into() } }
    pub fn transport<S: Into<String>>(code: S, msg: S) -> Self { AppError::Transport { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn is_validation(&self) -> bool { matches!(self, AppError::Validation { .. }) }

    /// Severity used when the error is surfaced as a notification.
    pub fn severity(&self) -> Severity {
        match self {
            AppError::Validation { .. } => Severity::Warning,
            AppError::Server { .. }
            | AppError::Transport { .. }
            | AppError::Auth { .. }
            | AppError::Internal { .. } => Severity::Error,
        }
    }

    /// Classify a rejected request. A payload message from the backend wins
    /// over the generic fallback; otherwise the status text, then `fallback`.
    pub fn from_transport(err: &TransportError, fallback: &str) -> Self {
        match err {
            TransportError::Status { status, status_text, payload } => {
                let server_msg = payload
                    .as_ref()
                    .and_then(|p| p.get("message"))
                    .and_then(|m| m.as_str())
                    .filter(|m| !m.is_empty());
                match server_msg {
                    Some(m) => AppError::Server { code: format!("http_{}", status), message: m.to_string() },
                    None if !status_text.is_empty() => AppError::Transport { code: format!("http_{}", status), message: status_text.clone() },
                    None => AppError::Transport { code: format!("http_{}", status), message: fallback.to_string() },
                }
            }
            TransportError::Network(_) => AppError::transport("network", fallback),
            TransportError::Decode(_) => AppError::transport("decode", fallback),
            TransportError::InvalidRequest(m) => AppError::internal("invalid_request", m.as_str()),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        AppError::from_transport(&err, CONNECTIVITY_MESSAGE)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}

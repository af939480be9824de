//! User-facing notification and confirmation seams.
//!
//! Controllers never print; they report through a [`Notifier`] and ask
//! through a [`Confirmer`]. The terminal front-end supplies implementations
//! backed by stderr and stdin; tests supply recording ones.

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Fire-and-forget toast.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Asynchronous yes/no dialog. Resolves to the user's choice.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Confirmer that always gives the same answer.
pub struct FixedConfirmer(pub bool);

#[async_trait]
impl Confirmer for FixedConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!(target: "notify", prompt, answer = self.0, "auto-confirm");
        self.0
    }
}

//! Console configuration: defaults, then `ADMIN_CONSOLE_*` environment
//! variables, then command-line flags (applied by the binary).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Backend base URL, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    /// Quiet period before a search-text change reloads the list.
    pub debounce_ms: u64,
    /// Pause between a login/logout confirmation and the redirect.
    pub redirect_delay_ms: u64,
    /// Role preselected when creating a user.
    pub default_role_id: i64,
    pub request_timeout_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            debounce_ms: 500,
            redirect_delay_ms: 500,
            default_role_id: 2,
            request_timeout_secs: 30,
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source; unparsable values keep the default.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = get("ADMIN_CONSOLE_URL").filter(|s| !s.trim().is_empty()) {
            cfg.base_url = v.trim().to_string();
        }
        if let Some(v) = get("ADMIN_CONSOLE_DEBOUNCE_MS").and_then(|s| s.trim().parse().ok()) {
            cfg.debounce_ms = v;
        }
        if let Some(v) = get("ADMIN_CONSOLE_REDIRECT_DELAY_MS").and_then(|s| s.trim().parse().ok()) {
            cfg.redirect_delay_ms = v;
        }
        if let Some(v) = get("ADMIN_CONSOLE_DEFAULT_ROLE_ID").and_then(|s| s.trim().parse().ok()) {
            cfg.default_role_id = v;
        }
        if let Some(v) = get("ADMIN_CONSOLE_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            cfg.request_timeout_secs = v;
        }
        cfg
    }

    pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }
    pub fn redirect_delay(&self) -> Duration { Duration::from_millis(self.redirect_delay_ms) }
    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::guard::LOGIN_PATH;
use super::session::{SessionContext, SessionWriter};
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::router::Navigator;
use crate::transport::{call, ApiRequest, Transport};
use crate::ui::{Confirmer, Notifier, Severity};

pub const HOME_PATH: &str = "/";

/// What `/api/check-session` reports about the cookie session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionProbe {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub user: Option<SessionIdentity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub rol_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    /// Message from the backend, shown inline on the login form.
    pub message: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogoutOutcome {
    Cancelled,
    LoggedOut,
}

/// Owns every write to the session: `fetch_current_user`, `login` and `logout`.
pub struct AuthSessionManager {
    transport: Arc<dyn Transport>,
    session: SessionContext,
    writer: SessionWriter,
    navigator: Navigator,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    redirect_delay: Duration,
}

impl AuthSessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: SessionContext,
        navigator: Navigator,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
        redirect_delay: Duration,
    ) -> Self {
        let writer = session.writer();
        Self { transport, session, writer, navigator, notifier, confirmer, redirect_delay }
    }

    pub fn session(&self) -> &SessionContext { &self.session }

    /// Refresh the session from `/api/user/current`. Failures are absorbed:
    /// the session is cleared and `None` returned.
    pub async fn fetch_current_user(&self) -> Option<User> {
        let res = call(self.transport.as_ref(), ApiRequest::get("/api/user/current"), "No active session").await;
        let user = res.ok().and_then(|env| match env.field::<User>("user") {
            Ok(u) => Some(u),
            Err(e) => {
                tracing::warn!(target: "session", error = %e, "current user payload unreadable");
                None
            }
        });
        match user {
            Some(u) => {
                tracing::debug!(target: "session", user_id = u.id, "current user loaded");
                self.writer.authenticate(u.clone());
                Some(u)
            }
            None => {
                self.writer.clear();
                None
            }
        }
    }

    /// Read-only pre-login probe. Never touches the session.
    pub async fn check_session(&self) -> SessionProbe {
        match self.transport.send(ApiRequest::get("/api/check-session")).await {
            Ok(body) => {
                let ok = body.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
                if !ok {
                    return SessionProbe::default();
                }
                serde_json::from_value(body).unwrap_or_default()
            }
            Err(e) => {
                tracing::debug!(target: "session", error = %e, "session probe failed");
                SessionProbe::default()
            }
        }
    }

    pub async fn login(&self, usuario: &str, contrasena: &str) -> AppResult<LoginOutcome> {
        if usuario.is_empty() || contrasena.is_empty() {
            return Err(AppError::validation("credentials_required", "Please enter username and password"));
        }
        let body = serde_json::json!({ "usuario": usuario, "contrasena": contrasena });
        let env = call(self.transport.as_ref(), ApiRequest::post("/api/login", body), "Invalid credentials").await?;
        let message = env.message_or("Login successful");
        tracing::info!(target: "session", usuario, "login accepted");

        let user = self.fetch_current_user().await;
        self.notifier.notify("Login successful. Welcome!", Severity::Success);
        self.schedule_navigation(HOME_PATH, false, self.redirect_delay);
        Ok(LoginOutcome { message, user })
    }

    /// Confirm, end the backend session, clear local state and force a
    /// navigation to login followed by a full reload.
    pub async fn logout(&self) -> AppResult<LogoutOutcome> {
        if !self.confirmer.confirm("Are you sure you want to log out?").await {
            return Ok(LogoutOutcome::Cancelled);
        }
        let res = call(self.transport.as_ref(), ApiRequest::post("/api/logout", serde_json::json!({})), "Unknown error").await;
        self.writer.clear();
        match res {
            Ok(_) => {
                tracing::info!(target: "session", "logged out");
                self.notifier.notify("Session closed successfully", Severity::Success);
                self.schedule_navigation(LOGIN_PATH, true, self.redirect_delay);
                Ok(LogoutOutcome::LoggedOut)
            }
            Err(e) => {
                tracing::warn!(target: "session", error = %e, "logout request failed");
                self.notifier.notify(&format!("Error closing session: {}", e.message()), Severity::Error);
                self.schedule_navigation(LOGIN_PATH, true, Duration::ZERO);
                Err(e)
            }
        }
    }

    fn schedule_navigation(&self, path: &'static str, reload: bool, delay: Duration) {
        let nav = self.navigator.clone();
        let go = move || {
            nav.go(path);
            if reload {
                nav.reload();
            }
        };
        if delay.is_zero() {
            go();
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                go();
            });
        }
    }
}

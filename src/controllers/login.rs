use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{AppError, AppResult};
use crate::identity::{AuthSessionManager, LoginOutcome, HOME_PATH};
use crate::router::Navigator;

/// Style of the inline message under the login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMessageKind {
    Warning,
    Success,
    Danger,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub usuario: String,
    pub contrasena: String,
    pub message: Option<(String, FormMessageKind)>,
}

pub struct LoginController {
    auth: Arc<AuthSessionManager>,
    navigator: Navigator,
    form: Mutex<LoginForm>,
}

impl LoginController {
    pub fn new(auth: Arc<AuthSessionManager>, navigator: Navigator) -> Self {
        Self { auth, navigator, form: Mutex::new(LoginForm::default()) }
    }

    pub fn form(&self) -> LoginForm { self.form.lock().clone() }

    pub fn reset(&self) { *self.form.lock() = LoginForm::default(); }

    /// Runs when the view activates. Someone already signed in skips the form.
    pub async fn enter(&self) -> bool {
        let probe = self.auth.check_session().await;
        if !probe.logged_in {
            return false;
        }
        tracing::debug!(target: "session", "session already active; leaving login");
        if self.auth.fetch_current_user().await.is_some() {
            self.navigator.go(HOME_PATH);
            return true;
        }
        false
    }

    pub fn set_usuario(&self, v: &str) {
        let mut f = self.form.lock();
        f.usuario = v.to_string();
        f.message = None;
    }

    pub fn set_contrasena(&self, v: &str) {
        let mut f = self.form.lock();
        f.contrasena = v.to_string();
        f.message = None;
    }

    pub async fn submit(&self) -> AppResult<LoginOutcome> {
        let (usuario, contrasena) = {
            let f = self.form.lock();
            (f.usuario.clone(), f.contrasena.clone())
        };
        let res = self.auth.login(&usuario, &contrasena).await;
        let shown = match &res {
            Ok(out) => (out.message.clone(), FormMessageKind::Success),
            Err(e @ AppError::Validation { .. }) => (e.message().to_string(), FormMessageKind::Warning),
            Err(e) => (e.message().to_string(), FormMessageKind::Danger),
        };
        self.form.lock().message = Some(shown);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{SessionContext, SessionGuard};
    use crate::router::Router;
    use crate::testing::{RecordingNotifier, ScriptedConfirmer, StubTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    fn setup() -> (Arc<StubTransport>, Navigator, LoginController) {
        let t = Arc::new(StubTransport::new());
        let session = SessionContext::new();
        let nav = Navigator::new(Router::standard(), SessionGuard::new(session.clone()));
        let auth = Arc::new(AuthSessionManager::new(
            t.clone(),
            session,
            nav.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ScriptedConfirmer::new(true)),
            Duration::from_millis(500),
        ));
        (t, nav.clone(), LoginController::new(auth, nav))
    }

    #[tokio::test]
    async fn validation_message_is_a_warning_and_editing_clears_it() {
        let (t, _, ctl) = setup();
        ctl.set_usuario("admin");
        assert!(ctl.submit().await.is_err());
        let f = ctl.form();
        assert_eq!(f.message, Some(("Please enter username and password".into(), FormMessageKind::Warning)));
        assert!(t.requests().is_empty());

        ctl.set_contrasena("x");
        assert!(ctl.form().message.is_none());
    }

    #[tokio::test]
    async fn rejected_credentials_show_danger() {
        let (t, _, ctl) = setup();
        t.reply(Method::POST, "/api/login", json!({"success": false, "message": "Invalid credentials"}));
        ctl.set_usuario("admin");
        ctl.set_contrasena("nope");
        assert!(ctl.submit().await.is_err());
        assert_eq!(ctl.form().message, Some(("Invalid credentials".into(), FormMessageKind::Danger)));
    }

    #[tokio::test]
    async fn enter_with_live_session_goes_home() {
        let (t, nav, ctl) = setup();
        nav.go("/login");
        t.reply(Method::GET, "/api/check-session", json!({"success": true, "logged_in": true, "user": {"id": 1}}));
        t.reply(Method::GET, "/api/user/current", json!({"success": true, "user": {"id": 1, "nombre": "admin", "email": "a@x"}}));
        assert!(ctl.enter().await);
        assert_eq!(nav.current_path(), "/");
    }

    #[tokio::test]
    async fn enter_without_session_stays() {
        let (t, nav, ctl) = setup();
        nav.go("/login");
        t.reply(Method::GET, "/api/check-session", json!({"success": true, "logged_in": false}));
        assert!(!ctl.enter().await);
        assert_eq!(nav.current_path(), "/login");
    }
}

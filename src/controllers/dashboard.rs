use std::sync::Arc;

use crate::identity::{AuthSessionManager, LOGIN_PATH};
use crate::models::User;
use crate::router::Navigator;

pub struct DashboardController {
    auth: Arc<AuthSessionManager>,
    navigator: Navigator,
}

impl DashboardController {
    pub fn new(auth: Arc<AuthSessionManager>, navigator: Navigator) -> Self { Self { auth, navigator } }

    /// Confirm the session is still alive; bounce to login when it is not.
    pub async fn enter(&self) -> Option<User> {
        let user = self.auth.fetch_current_user().await;
        if user.is_none() {
            self.navigator.go(LOGIN_PATH);
        }
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{SessionContext, SessionGuard};
    use crate::router::Router;
    use crate::testing::{RecordingNotifier, ScriptedConfirmer, StubTransport};
    use crate::transport::TransportError;
    use reqwest::Method;
    use std::time::Duration;

    #[tokio::test]
    async fn expired_session_bounces_to_login() {
        let t = Arc::new(StubTransport::new());
        let session = SessionContext::new();
        let nav = Navigator::new(Router::standard(), SessionGuard::new(session.clone()));
        let auth = Arc::new(AuthSessionManager::new(
            t.clone(),
            session,
            nav.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ScriptedConfirmer::new(true)),
            Duration::ZERO,
        ));
        t.fail(Method::GET, "/api/user/current", TransportError::Network("down".into()));
        let d = DashboardController::new(auth, nav.clone());
        assert!(d.enter().await.is_none());
        assert_eq!(nav.current_path(), "/login");
    }
}

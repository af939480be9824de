use super::SessionContext;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(&'static str),
}

/// Route guard. Checks in-memory session state only; never issues requests.
#[derive(Clone)]
pub struct SessionGuard {
    session: SessionContext,
}

impl SessionGuard {
    pub fn new(session: SessionContext) -> Self { Self { session } }

    pub fn check(&self, path: &str) -> GuardDecision {
        if path == LOGIN_PATH {
            return GuardDecision::Proceed;
        }
        let s = self.session.snapshot();
        if !s.logged_in && s.current_user.is_none() {
            tracing::debug!(target: "router", path, "unauthenticated; redirecting to login");
            GuardDecision::Redirect(LOGIN_PATH)
        } else {
            GuardDecision::Proceed
        }
    }
}

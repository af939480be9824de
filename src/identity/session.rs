use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::User;

/// Who is logged in, as last reported by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub current_user: Option<User>,
    pub logged_in: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.logged_in || self.current_user.is_some()
    }
}

/// Shared, read-mostly session handle.
///
/// Any component may read it; only the holder of the [`SessionWriter`]
/// (the auth session manager) may change it.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Session>>,
}

impl SessionContext {
    pub fn new() -> Self { Self::default() }

    pub fn snapshot(&self) -> Session { self.inner.read().clone() }

    pub fn current_user(&self) -> Option<User> { self.inner.read().current_user.clone() }

    pub fn logged_in(&self) -> bool { self.inner.read().logged_in }

    pub fn is_authenticated(&self) -> bool { self.inner.read().is_authenticated() }

    pub(crate) fn writer(&self) -> SessionWriter {
        SessionWriter { inner: Arc::clone(&self.inner) }
    }
}

pub(crate) struct SessionWriter {
    inner: Arc<RwLock<Session>>,
}

impl SessionWriter {
    pub(crate) fn authenticate(&self, user: User) {
        tracing::debug!(target: "session", user_id = user.id, "authenticated");
        let mut s = self.inner.write();
        s.current_user = Some(user);
        s.logged_in = true;
    }

    pub(crate) fn clear(&self) {
        tracing::debug!(target: "session", "cleared");
        let mut s = self.inner.write();
        s.current_user = None;
        s.logged_in = false;
    }
}

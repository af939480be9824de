//! Client-side routes and navigation.
//!
//! The [`Router`] maps paths to views; the [`Navigator`] owns the current
//! location, runs the session guard on every navigation attempt and
//! broadcasts location changes (including full reloads) to the console.

use std::sync::Arc;

use tokio::sync::watch;

use crate::identity::{GuardDecision, SessionGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Login,
    Users,
    Roles,
}

#[derive(Debug, Clone)]
struct Route {
    pattern: &'static str,
    view: View,
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    otherwise: &'static str,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new(), otherwise: "/" }
    }

    /// `/` dashboard, `/login`, `/users`, `/roles`; anything else goes to `/`.
    pub fn standard() -> Self {
        Self::new()
            .when("/", View::Dashboard)
            .when("/login", View::Login)
            .when("/users", View::Users)
            .when("/roles", View::Roles)
            .otherwise("/")
    }

    pub fn when(mut self, pattern: &'static str, view: View) -> Self {
        self.routes.push(Route { pattern, view });
        self
    }

    pub fn otherwise(mut self, redirect: &'static str) -> Self {
        self.otherwise = redirect;
        self
    }

    pub fn lookup(&self, path: &str) -> Option<View> {
        self.routes.iter().find(|r| r.pattern == path).map(|r| r.view)
    }

    /// Resolve to a routed `(path, view)`, following the `otherwise` redirect
    /// for unmatched paths. `None` only if the redirect target is unrouted too.
    pub fn resolve(&self, path: &str) -> Option<(String, View)> {
        let path = normalize_path(path);
        if let Some(view) = self.lookup(&path) {
            return Some((path, view));
        }
        let fallback = normalize_path(self.otherwise);
        self.lookup(&fallback).map(|v| (fallback, v))
    }
}

impl Default for Router {
    fn default() -> Self { Self::standard() }
}

/// Accepts `users`, `/users/`, `#/users` and `/users?x=1` as `/users`.
pub fn normalize_path(raw: &str) -> String {
    let mut p = raw.trim();
    p = p.strip_prefix('#').unwrap_or(p);
    if let Some(i) = p.find(['?', '#']) {
        p = &p[..i];
    }
    let p = p.trim_end_matches('/');
    if p.is_empty() {
        "/".to_string()
    } else if p.starts_with('/') {
        p.to_string()
    } else {
        format!("/{}", p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// `None` before the first navigation.
    pub view: Option<View>,
    /// Bumped by every navigation, including repeats of the same path.
    pub seq: u64,
    /// Bumped by [`Navigator::reload`].
    pub reload_epoch: u64,
}

#[derive(Clone)]
pub struct Navigator {
    router: Arc<Router>,
    guard: SessionGuard,
    tx: Arc<watch::Sender<Location>>,
}

impl Navigator {
    pub fn new(router: Router, guard: SessionGuard) -> Self {
        let (tx, _rx) = watch::channel(Location { path: String::new(), view: None, seq: 0, reload_epoch: 0 });
        Self { router: Arc::new(router), guard, tx: Arc::new(tx) }
    }

    /// Navigate to `path`. Unmatched paths follow the router's redirect and
    /// protected paths bounce to login when the guard says so. Returns the
    /// location actually entered.
    pub fn go(&self, path: &str) -> Location {
        let (mut path, mut view) = match self.router.resolve(path) {
            Some(r) => r,
            None => {
                tracing::warn!(target: "router", path, "no route and no usable fallback");
                return self.current();
            }
        };
        if let GuardDecision::Redirect(to) = self.guard.check(&path) {
            if let Some((p, v)) = self.router.resolve(to) {
                path = p;
                view = v;
            }
        }
        let mut entered = None;
        self.tx.send_modify(|loc| {
            loc.path = path.clone();
            loc.view = Some(view);
            loc.seq += 1;
            entered = Some(loc.clone());
        });
        tracing::debug!(target: "router", path = %path, ?view, "navigated");
        entered.unwrap_or_else(|| self.current())
    }

    /// Discard all in-memory page state and re-enter the current location.
    pub fn reload(&self) -> Location {
        let mut entered = None;
        self.tx.send_modify(|loc| {
            loc.reload_epoch += 1;
            loc.seq += 1;
            entered = Some(loc.clone());
        });
        tracing::debug!(target: "router", "reload requested");
        entered.unwrap_or_else(|| self.current())
    }

    pub fn current(&self) -> Location { self.tx.borrow().clone() }

    pub fn current_path(&self) -> String { self.tx.borrow().path.clone() }

    pub fn subscribe(&self) -> watch::Receiver<Location> { self.tx.subscribe() }
}

//! Console wiring: one session, one navigator, one controller per view.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::config::ConsoleConfig;
use crate::controllers::{DashboardController, LoginController, RolesController, UsersController};
use crate::identity::{AuthSessionManager, SessionContext, SessionGuard};
use crate::router::{Location, Navigator, Router, View};
use crate::transport::Transport;
use crate::ui::{Confirmer, Notifier};

#[derive(Default)]
struct Applied {
    seq: u64,
    reload_epoch: u64,
}

pub struct Console {
    config: ConsoleConfig,
    session: SessionContext,
    navigator: Navigator,
    auth: Arc<AuthSessionManager>,
    login: LoginController,
    dashboard: DashboardController,
    users: Arc<UsersController>,
    roles: Arc<RolesController>,
    applied: AsyncMutex<Applied>,
}

impl Console {
    pub fn new(
        config: ConsoleConfig,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Arc<Self> {
        let session = SessionContext::new();
        let navigator = Navigator::new(Router::standard(), SessionGuard::new(session.clone()));
        let auth = Arc::new(AuthSessionManager::new(
            transport.clone(),
            session.clone(),
            navigator.clone(),
            notifier.clone(),
            confirmer.clone(),
            config.redirect_delay(),
        ));
        let users = Arc::new(UsersController::new(transport.clone(), notifier.clone(), confirmer.clone(), config.clone()));
        let roles = Arc::new(RolesController::new(transport, notifier, confirmer, config.clone()));
        Arc::new(Self {
            login: LoginController::new(auth.clone(), navigator.clone()),
            dashboard: DashboardController::new(auth.clone(), navigator.clone()),
            config,
            session,
            navigator,
            auth,
            users,
            roles,
            applied: AsyncMutex::new(Applied::default()),
        })
    }

    pub fn config(&self) -> &ConsoleConfig { &self.config }
    pub fn session(&self) -> &SessionContext { &self.session }
    pub fn navigator(&self) -> &Navigator { &self.navigator }
    pub fn auth(&self) -> &AuthSessionManager { &self.auth }
    pub fn login(&self) -> &LoginController { &self.login }
    pub fn users(&self) -> &Arc<UsersController> { &self.users }
    pub fn roles(&self) -> &Arc<RolesController> { &self.roles }
    pub fn location(&self) -> Location { self.navigator.current() }

    /// Startup: learn who is signed in, then enter `initial`.
    pub async fn start(&self, initial: &str) -> Location {
        self.auth.fetch_current_user().await;
        self.navigate(initial).await
    }

    pub async fn navigate(&self, path: &str) -> Location {
        self.navigator.go(path);
        self.sync().await
    }

    pub async fn reload(&self) -> Location {
        self.navigator.reload();
        self.sync().await
    }

    /// Activate whatever the navigator points at, following navigations made
    /// during activation, until the location settles.
    pub async fn sync(&self) -> Location {
        let mut applied = self.applied.lock().await;
        loop {
            let loc = self.navigator.current();
            if loc.seq == applied.seq {
                return loc;
            }
            applied.seq = loc.seq;
            if loc.reload_epoch != applied.reload_epoch {
                applied.reload_epoch = loc.reload_epoch;
                tracing::info!(target: "router", path = %loc.path, "reloading console");
                self.reset_views();
                self.auth.fetch_current_user().await;
                // Re-run the guard against the refreshed session.
                self.navigator.go(&loc.path);
                continue;
            }
            self.activate(&loc).await;
        }
    }

    /// Keep the console in step with navigations issued from background
    /// tasks, such as the delayed redirect after login.
    pub fn spawn_router_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.navigator.subscribe();
        let console = Arc::downgrade(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(c) = console.upgrade() else { break };
                c.sync().await;
            }
        })
    }

    fn reset_views(&self) {
        self.login.reset();
        self.users.reset();
        self.roles.reset();
    }

    async fn activate(&self, loc: &Location) {
        tracing::debug!(target: "router", path = %loc.path, view = ?loc.view, "activating view");
        match loc.view {
            Some(View::Login) => {
                self.login.enter().await;
            }
            Some(View::Dashboard) => {
                self.dashboard.enter().await;
            }
            Some(View::Users) => {
                let _ = self.users.load(true).await;
            }
            Some(View::Roles) => {
                let _ = self.roles.load(true).await;
            }
            None => {}
        }
    }
}

//! Session identity for the console.
//! Keep the public surface thin and split implementation across sub-modules.

mod session;
mod guard;
mod manager;

pub use session::{Session, SessionContext};
pub use guard::{GuardDecision, SessionGuard, LOGIN_PATH};
pub use manager::{AuthSessionManager, LoginOutcome, LogoutOutcome, SessionIdentity, SessionProbe, HOME_PATH};

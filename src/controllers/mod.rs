//! Per-view controllers. Each owns its view state and talks to the backend
//! through the shared transport; none of them prints.

mod dashboard;
mod list;
mod login;
mod roles;
mod users;

pub use dashboard::DashboardController;
pub use list::{Editor, ListController, ListFilter, LoadOutcome, MutationOutcome, NoFilter, Phase, Resource};
pub use login::{FormMessageKind, LoginController, LoginForm};
pub use roles::{RoleResource, RolesController, ROLE_NAME_MAX};
pub use users::{UserResource, UsersController};

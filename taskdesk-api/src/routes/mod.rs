/// HTTP route handlers
///
/// - [`health`]: liveness and dependency checks
/// - [`auth`]: registration, login, token refresh, password change
/// - [`users`]: profile and account management
/// - [`tasks`]: task CRUD, status changes, and the cache read-through

pub mod auth;
pub mod health;
pub mod notifications;
pub mod tasks;
pub mod users;

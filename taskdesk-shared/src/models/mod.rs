/// Database models for Taskdesk
///
/// All models own their CRUD operations as associated functions taking a
/// `&PgPool`, mirroring the table they map to.
///
/// # Models
///
/// - `user`: User accounts, roles, and login security counters
/// - `task`: Task records, the visibility set, and filtered list queries
/// - `notification`: Task activity log and notification fan-out

pub mod notification;
pub mod task;
pub mod user;

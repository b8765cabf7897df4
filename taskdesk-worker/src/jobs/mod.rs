/// Background jobs
///
/// Each job exposes an `async fn run(...)` that takes its dependencies
/// directly (the database pool, and a mailer where the job emails), so
/// the scheduler, tests, and operators can all invoke it the same way.
///
/// # Jobs
///
/// - [`deadline`]: reminds assignees about tasks due within a day
/// - [`digest`]: daily summary of open tasks per active user
/// - [`sync`]: pulls tasks from configured external sources
/// - [`cleanup`]: deletes aged activity and read notifications

pub mod cleanup;
pub mod deadline;
pub mod digest;
pub mod sync;

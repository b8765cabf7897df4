//! # Taskdesk Worker
//!
//! Background job runner for Taskdesk. Hosts the scheduled jobs that the
//! API never runs inline: deadline reminders, daily digests, external
//! task sync, and retention cleanup.
//!
//! ## Modules
//!
//! - `jobs`: the individual jobs, each callable on its own
//! - `mailer`: outbound email seam with log and mock transports
//! - `scheduler`: runs the jobs on their cadences with clean shutdown

pub mod jobs;
pub mod mailer;
pub mod scheduler;

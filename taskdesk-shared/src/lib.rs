//! # Taskdesk Shared Library
//!
//! Shared types and business logic used by the Taskdesk API server and the
//! background worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models (tasks, users, notifications)
//! - `auth`: Passwords, JWT tokens, and the task authorization policy
//! - `cache`: Redis-backed read-through cache for task reads
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod cache;
pub mod db;
pub mod models;

/// Current version of the Taskdesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

/// Redis-backed caching layer
///
/// # Modules
///
/// - [`client`]: connection management and health checks
/// - [`keys`]: cache key formats
/// - [`task_cache`]: the read-through task cache and its invalidation
///
/// The cache is an availability optimization, never a source of truth: all
/// entries carry a TTL, reads fall back to the database on a miss, and
/// every operation fails open when Redis is unreachable.

pub mod client;
pub mod keys;
pub mod task_cache;

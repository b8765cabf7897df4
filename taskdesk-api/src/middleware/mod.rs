/// HTTP middleware
///
/// - [`rate_limit`]: per-IP login throttling backed by Redis
/// - [`security`]: security response headers

pub mod rate_limit;
pub mod security;

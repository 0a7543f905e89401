//! Service identity and request size slack.

pub const SERVICE_NAME: &str = "PDF Conversion Service";

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Headroom on top of the payload limits for multipart framing and JSON escaping. Bodies
/// inside the headroom reach validation and get a precise 413.
pub const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

/// Upper bound on every dependency check of `/health`.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

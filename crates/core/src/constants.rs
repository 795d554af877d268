//! Constants used throughout the ED core crate.
//!
//! Defaults and environment variable names live here so the binaries and the core agree on them.

/// Default dashboard refresh interval.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Prefix of generated folios (`ED-YYYYMMDD-NNNN`).
pub const DEFAULT_FOLIO_PREFIX: &str = "ED";

/// Default bind address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

pub const ENV_REST_ADDR: &str = "ED_REST_ADDR";
pub const ENV_POLL_INTERVAL_SECS: &str = "ED_POLL_INTERVAL_SECS";
/// Optional YAML file seeding patients, records and the specialty roster.
pub const ENV_ROSTER: &str = "ED_ROSTER";
pub const ENV_API_KEY: &str = "API_KEY";

/// Prefix of the per-level wait target variables, e.g. `ED_TARGET_URGENT_MINUTES`.
pub const ENV_TARGET_PREFIX: &str = "ED_TARGET_";
pub const ENV_TARGET_SUFFIX: &str = "_MINUTES";

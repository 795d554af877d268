//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Request
//! handling never reads process-wide environment variables; the binaries call the
//! `*_from_env_value(s)` parsers below with whatever they read at startup.

use crate::constants::{DEFAULT_FOLIO_PREFIX, DEFAULT_POLL_INTERVAL_SECS};
use crate::urgency::{UrgencyLevel, WaitTargets};
use crate::{TriageError, TriageResult};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    poll_interval: Duration,
    wait_targets: WaitTargets,
    folio_prefix: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if `poll_interval` is zero or `folio_prefix` is
    /// blank or contains anything other than ASCII alphanumerics.
    pub fn new(
        poll_interval: Duration,
        wait_targets: WaitTargets,
        folio_prefix: String,
    ) -> TriageResult<Self> {
        if poll_interval.is_zero() {
            return Err(TriageError::InvalidInput(
                "poll interval must be greater than zero".into(),
            ));
        }

        let folio_prefix = folio_prefix.trim().to_string();
        if folio_prefix.is_empty() || !folio_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TriageError::InvalidInput(
                "folio prefix must be non-empty ASCII alphanumerics".into(),
            ));
        }

        Ok(Self {
            poll_interval,
            wait_targets,
            folio_prefix,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn wait_targets(&self) -> WaitTargets {
        self.wait_targets
    }

    pub fn folio_prefix(&self) -> &str {
        &self.folio_prefix
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            wait_targets: WaitTargets::default(),
            folio_prefix: DEFAULT_FOLIO_PREFIX.to_string(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the dashboard poll interval (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default interval.
pub fn poll_interval_from_env_value(value: Option<String>) -> TriageResult<Duration> {
    let Some(value) = non_blank(value) else {
        return Ok(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
    };
    let secs = value.parse::<u64>().map_err(|_| {
        TriageError::InvalidInput(format!("poll interval '{value}' is not a whole number"))
    })?;
    if secs == 0 {
        return Err(TriageError::InvalidInput(
            "poll interval must be greater than zero".into(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Build wait targets from optional per-level minute values.
///
/// `lookup` is called once per level with that level (e.g. to read `ED_TARGET_URGENT_MINUTES`);
/// missing or blank values keep the level's default. The combined result must keep more severe
/// levels at shorter or equal targets.
pub fn wait_targets_from_env_values(
    mut lookup: impl FnMut(UrgencyLevel) -> Option<String>,
) -> TriageResult<WaitTargets> {
    let mut bounds = WaitTargets::default().bounds();
    for level in UrgencyLevel::ALL {
        if let Some(value) = non_blank(lookup(level)) {
            let minutes = value.parse::<u64>().map_err(|_| {
                TriageError::InvalidInput(format!(
                    "wait target for {level} ('{value}') is not a whole number of minutes"
                ))
            })?;
            let secs = minutes.checked_mul(60).ok_or_else(|| {
                TriageError::InvalidInput(format!(
                    "wait target for {level} ('{value}') is too large"
                ))
            })?;
            bounds[level.index()] = Duration::from_secs(secs);
        }
    }
    WaitTargets::from_bounds(bounds)
}

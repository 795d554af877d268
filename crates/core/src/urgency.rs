//! Urgency levels and their target wait-time bounds.
//!
//! Severity order is declared explicitly through [`UrgencyLevel::severity_rank`]; the `Ord`
//! implementation is built on that rank rather than on the order the variants happen to be
//! written in.

use crate::error::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Severity tier assigned at triage. `Critical` is the most severe.
///
/// `Ambulatory` patients are routed to scheduled outpatient visits and are never served by the
/// acute "next patient" operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Critical,
    Urgent,
    Moderate,
    Low,
    Ambulatory,
}

impl UrgencyLevel {
    /// All levels, most severe first.
    pub const ALL: [UrgencyLevel; 5] = [
        UrgencyLevel::Critical,
        UrgencyLevel::Urgent,
        UrgencyLevel::Moderate,
        UrgencyLevel::Low,
        UrgencyLevel::Ambulatory,
    ];

    /// Levels served by the acute queue, most severe first.
    pub const ACUTE: [UrgencyLevel; 4] = [
        UrgencyLevel::Critical,
        UrgencyLevel::Urgent,
        UrgencyLevel::Moderate,
        UrgencyLevel::Low,
    ];

    /// 0 is the most severe.
    pub const fn severity_rank(self) -> u8 {
        match self {
            UrgencyLevel::Critical => 0,
            UrgencyLevel::Urgent => 1,
            UrgencyLevel::Moderate => 2,
            UrgencyLevel::Low => 3,
            UrgencyLevel::Ambulatory => 4,
        }
    }

    pub const fn is_acute(self) -> bool {
        !matches!(self, UrgencyLevel::Ambulatory)
    }

    /// Default target wait before a patient at this level should be seen.
    pub const fn default_target(self) -> Duration {
        let minutes = match self {
            UrgencyLevel::Critical => 0,
            UrgencyLevel::Urgent => 10,
            UrgencyLevel::Moderate => 30,
            UrgencyLevel::Low => 120,
            UrgencyLevel::Ambulatory => 240,
        };
        Duration::from_secs(minutes * 60)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "critical",
            UrgencyLevel::Urgent => "urgent",
            UrgencyLevel::Moderate => "moderate",
            UrgencyLevel::Low => "low",
            UrgencyLevel::Ambulatory => "ambulatory",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self.severity_rank() as usize
    }
}

impl Ord for UrgencyLevel {
    /// More severe levels sort first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity_rank().cmp(&other.severity_rank())
    }
}

impl PartialOrd for UrgencyLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UrgencyLevel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        UrgencyLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown urgency level '{s}'")))
    }
}

/// Per-level target wait bounds used for estimation (never enforced).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitTargets([Duration; 5]);

impl Default for WaitTargets {
    fn default() -> Self {
        Self(UrgencyLevel::ALL.map(UrgencyLevel::default_target))
    }
}

impl WaitTargets {
    pub fn bound(&self, level: UrgencyLevel) -> Duration {
        self.0[level.index()]
    }

    /// Builds targets from bounds listed most severe first.
    ///
    /// Bounds must be monotonic: a more severe level may not have a longer target than a
    /// less severe one.
    pub fn from_bounds(bounds: [Duration; 5]) -> TriageResult<Self> {
        if let Some(i) = bounds.windows(2).position(|pair| pair[0] > pair[1]) {
            return Err(TriageError::InvalidInput(format!(
                "target for {} is longer than the target for {}",
                UrgencyLevel::ALL[i],
                UrgencyLevel::ALL[i + 1]
            )));
        }
        Ok(Self(bounds))
    }

    /// Overrides one level's bound, keeping the ordering rule of [`Self::from_bounds`].
    pub fn with_bound(self, level: UrgencyLevel, bound: Duration) -> TriageResult<Self> {
        let mut bounds = self.0;
        bounds[level.index()] = bound;
        Self::from_bounds(bounds)
    }

    pub fn bounds(&self) -> [Duration; 5] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_most_severe_first() {
        let mut levels = vec![
            UrgencyLevel::Low,
            UrgencyLevel::Ambulatory,
            UrgencyLevel::Critical,
            UrgencyLevel::Moderate,
            UrgencyLevel::Urgent,
        ];
        levels.sort();

        assert_eq!(levels, UrgencyLevel::ALL.to_vec());
        assert!(UrgencyLevel::Critical < UrgencyLevel::Low);
    }

    #[test]
    fn test_ambulatory_is_not_acute() {
        assert!(!UrgencyLevel::Ambulatory.is_acute());
        assert!(UrgencyLevel::ACUTE.iter().all(|l| l.is_acute()));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            "Critical".parse::<UrgencyLevel>().unwrap(),
            UrgencyLevel::Critical
        );
        assert_eq!(
            " ambulatory ".parse::<UrgencyLevel>().unwrap(),
            UrgencyLevel::Ambulatory
        );
        assert!("red".parse::<UrgencyLevel>().is_err());
    }

    #[test]
    fn test_default_targets_are_monotonic() {
        let targets = WaitTargets::default();
        for pair in UrgencyLevel::ALL.windows(2) {
            assert!(targets.bound(pair[0]) <= targets.bound(pair[1]));
        }
        assert_eq!(
            targets.bound(UrgencyLevel::Urgent),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_with_bound_rejects_inverted_targets() {
        let result = WaitTargets::default()
            .with_bound(UrgencyLevel::Urgent, Duration::from_secs(60 * 60 * 5));
        assert!(result.is_err());

        let ok = WaitTargets::default()
            .with_bound(UrgencyLevel::Urgent, Duration::from_secs(15 * 60))
            .unwrap();
        assert_eq!(ok.bound(UrgencyLevel::Urgent), Duration::from_secs(900));
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&UrgencyLevel::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }
}

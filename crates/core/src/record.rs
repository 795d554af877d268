//! Triage records and their lifecycle.
//!
//! ```text
//! AwaitingIntake -> AwaitingTriage -> Queued(level) -> InAttention -> Completed
//! ```
//!
//! `Queued(Ambulatory)` is filed in the ambulatory partition rather than the acute queue. Only
//! `Queued(_)` records are members of the [`crate::TriageQueue`].

use crate::error::{TriageError, TriageResult};
use crate::urgency::UrgencyLevel;
use chrono::{DateTime, Utc};
use ed_types::{Folio, NonEmptyText, Specialty};
use ed_uuid::{PatientId, TriageId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    AwaitingIntake,
    AwaitingTriage,
    Queued(UrgencyLevel),
    InAttention,
    Completed,
}

impl LifecycleState {
    /// True for the states loaded into the queue at startup (anything not yet attended).
    pub fn is_awaiting(self) -> bool {
        matches!(
            self,
            LifecycleState::AwaitingIntake
                | LifecycleState::AwaitingTriage
                | LifecycleState::Queued(_)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::AwaitingIntake => f.write_str("awaiting intake"),
            LifecycleState::AwaitingTriage => f.write_str("awaiting triage"),
            LifecycleState::Queued(level) => write!(f, "queued ({level})"),
            LifecycleState::InAttention => f.write_str("in attention"),
            LifecycleState::Completed => f.write_str("completed"),
        }
    }
}

/// The patient a triage episode belongs to, copied by value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    pub id: PatientId,
    pub name: NonEmptyText,
}

/// One ED visit, from arrival registration to the end of attention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub id: TriageId,
    pub folio: Folio,
    pub patient: PatientRef,
    pub arrived_at: DateTime<Utc>,
    #[serde(default)]
    pub triaged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub urgency: Option<UrgencyLevel>,
    #[serde(default)]
    pub specialty: Option<Specialty>,
    pub state: LifecycleState,
    /// Tie-break sequence assigned by the queue on insertion. Only meaningful while queued.
    #[serde(default, skip_deserializing)]
    pub sequence: Option<u64>,
}

impl TriageRecord {
    /// A freshly registered arrival in state `AwaitingIntake`.
    pub fn arrival(folio: Folio, patient: PatientRef, arrived_at: DateTime<Utc>) -> Self {
        Self {
            id: TriageId::new(),
            folio,
            patient,
            arrived_at,
            triaged_at: None,
            urgency: None,
            specialty: None,
            state: LifecycleState::AwaitingIntake,
            sequence: None,
        }
    }

    /// How long the patient has been waiting since arrival. Zero if `now` precedes arrival.
    pub fn waiting_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.arrived_at).to_std().unwrap_or_default()
    }

    pub fn begin_intake(&mut self) -> TriageResult<()> {
        self.require(LifecycleState::AwaitingIntake, "intake can only start on arrival")?;
        self.state = LifecycleState::AwaitingTriage;
        Ok(())
    }

    /// Records the outcome of triage. The record still has to be added to the queue, which
    /// moves it to `Queued(level)`.
    pub fn complete_triage(
        &mut self,
        level: UrgencyLevel,
        specialty: Option<Specialty>,
        at: DateTime<Utc>,
    ) -> TriageResult<()> {
        if !matches!(
            self.state,
            LifecycleState::AwaitingIntake | LifecycleState::AwaitingTriage
        ) {
            return Err(self.invalid(format!("cannot complete triage while {}", self.state)));
        }
        self.urgency = Some(level);
        self.specialty = specialty;
        self.triaged_at = Some(at);
        self.state = LifecycleState::AwaitingTriage;
        Ok(())
    }

    pub fn complete_attention(&mut self) -> TriageResult<()> {
        self.require(
            LifecycleState::InAttention,
            "attention can only be completed for a patient in attention",
        )?;
        self.state = LifecycleState::Completed;
        Ok(())
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> TriageError {
        TriageError::InvalidState {
            id: self.id,
            reason: reason.into(),
        }
    }

    fn require(&self, expected: LifecycleState, reason: &str) -> TriageResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(format!("{reason} (currently {})", self.state)))
        }
    }
}

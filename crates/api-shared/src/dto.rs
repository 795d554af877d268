//! Wire types for the REST API.
//!
//! Identifiers travel as canonical 32-character hex strings, timestamps as RFC 3339 and urgency
//! levels as lowercase names.

use chrono::{DateTime, SecondsFormat, Utc};
use ed_core::{
    DashboardSnapshot, Doctor, HistoryEvent, HistoryEventKind, LevelStats, PatientIndexEntry,
    PatientRef, SearchMode, Specialty, TriageRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterPatientReq {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub name: String,
}

impl From<&PatientRef> for PatientRes {
    fn from(patient: &PatientRef) -> Self {
        Self {
            id: patient.id.to_string(),
            name: patient.name.to_string(),
        }
    }
}

impl From<&PatientIndexEntry> for PatientRes {
    fn from(entry: &PatientIndexEntry) -> Self {
        Self {
            id: entry.patient_id.to_string(),
            name: entry.name.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchModeParam {
    Exact,
    #[default]
    Prefix,
    Contains,
}

impl From<SearchModeParam> for SearchMode {
    fn from(mode: SearchModeParam) -> Self {
        match mode {
            SearchModeParam::Exact => SearchMode::Exact,
            SearchModeParam::Prefix => SearchMode::Prefix,
            SearchModeParam::Contains => SearchMode::Contains,
        }
    }
}

#[derive(Clone, Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchPatientsQuery {
    /// Name or partial name.
    pub q: String,
    #[serde(default)]
    #[param(inline)]
    pub mode: SearchModeParam,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchPatientsRes {
    pub patients: Vec<PatientRes>,
}

// ============================================================================
// Triage records
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterArrivalReq {
    pub patient_id: String,
    /// Generated as `ED-YYYYMMDD-NNNN` when omitted.
    #[serde(default)]
    pub folio: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteTriageReq {
    /// One of `critical`, `urgent`, `moderate`, `low`, `ambulatory`.
    pub urgency: String,
    #[serde(default)]
    pub specialty: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TriageRecordRes {
    pub id: String,
    pub folio: String,
    pub patient: PatientRes,
    pub arrived_at: String,
    pub triaged_at: Option<String>,
    pub urgency: Option<String>,
    pub specialty: Option<String>,
    pub state: String,
}

impl From<&TriageRecord> for TriageRecordRes {
    fn from(record: &TriageRecord) -> Self {
        Self {
            id: record.id.to_string(),
            folio: record.folio.to_string(),
            patient: PatientRes::from(&record.patient),
            arrived_at: rfc3339(record.arrived_at),
            triaged_at: record.triaged_at.map(rfc3339),
            urgency: record.urgency.map(|level| level.to_string()),
            specialty: record.specialty.as_ref().map(ToString::to_string),
            state: record.state.to_string(),
        }
    }
}

/// Result of "who is next" style requests; `patient` is null when nobody is waiting.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct NextPatientRes {
    pub patient: Option<TriageRecordRes>,
}

impl From<Option<TriageRecord>> for NextPatientRes {
    fn from(record: Option<TriageRecord>) -> Self {
        Self {
            patient: record.as_ref().map(TriageRecordRes::from),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryEventRes {
    pub timestamp: String,
    pub kind: String,
    pub description: String,
    pub actor_id: String,
    pub actor_name: String,
}

impl From<&HistoryEvent> for HistoryEventRes {
    fn from(event: &HistoryEvent) -> Self {
        let kind = match event.kind {
            HistoryEventKind::Arrival => "arrival",
            HistoryEventKind::IntakeStarted => "intake_started",
            HistoryEventKind::TriageCompleted => "triage_completed",
            HistoryEventKind::CalledForAttention => "called_for_attention",
            HistoryEventKind::AttentionCompleted => "attention_completed",
        };
        Self {
            timestamp: rfc3339(event.timestamp),
            kind: kind.to_string(),
            description: event.description.clone(),
            actor_id: event.actor.user_id.to_string(),
            actor_name: event.actor.display_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryRes {
    pub events: Vec<HistoryEventRes>,
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LevelStatsRes {
    pub critical: usize,
    pub urgent: usize,
    pub moderate: usize,
    pub low: usize,
    pub ambulatory: usize,
    pub total: usize,
}

impl From<LevelStats> for LevelStatsRes {
    fn from(stats: LevelStats) -> Self {
        Self {
            critical: stats.critical,
            urgent: stats.urgent,
            moderate: stats.moderate,
            low: stats.low,
            ambulatory: stats.ambulatory,
            total: stats.total(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LevelEstimateRes {
    pub level: String,
    pub estimated_wait_minutes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub taken_at: String,
    pub stats: LevelStatsRes,
    pub has_critical: bool,
    pub next: Option<TriageRecordRes>,
    pub longest_waiting: Option<TriageRecordRes>,
    pub estimates: Vec<LevelEstimateRes>,
    pub overdue: usize,
}

impl From<&DashboardSnapshot> for DashboardRes {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        Self {
            taken_at: rfc3339(snapshot.taken_at),
            stats: snapshot.stats.into(),
            has_critical: snapshot.has_critical,
            next: snapshot.next.as_ref().map(TriageRecordRes::from),
            longest_waiting: snapshot.longest_waiting.as_ref().map(TriageRecordRes::from),
            estimates: snapshot
                .estimates
                .iter()
                .map(|(level, wait)| LevelEstimateRes {
                    level: level.to_string(),
                    estimated_wait_minutes: wait.as_secs() / 60,
                })
                .collect(),
            overdue: snapshot.overdue,
        }
    }
}

// ============================================================================
// Specialty roster
// ============================================================================

fn active_by_default() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignDoctorReq {
    /// Existing doctor id to update; a new id is issued when omitted.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DoctorRes {
    pub id: String,
    pub name: String,
    pub active: bool,
}

impl From<&Doctor> for DoctorRes {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id.to_string(),
            name: doctor.name.to_string(),
            active: doctor.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SpecialtyDoctorsRes {
    pub specialty: String,
    pub doctors: Vec<DoctorRes>,
}

impl From<&(Specialty, Vec<Doctor>)> for SpecialtyDoctorsRes {
    fn from((specialty, doctors): &(Specialty, Vec<Doctor>)) -> Self {
        Self {
            specialty: specialty.to_string(),
            doctors: doctors.iter().map(DoctorRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RosterRes {
    pub specialties: Vec<SpecialtyDoctorsRes>,
}

#[derive(Clone, Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableDoctorQuery {
    /// Day of the slot, `YYYY-MM-DD`.
    pub date: String,
    /// Start of the slot, `HH:MM`.
    pub time: String,
}

/// `doctor` is null when no active doctor of the specialty is free.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailableDoctorRes {
    pub doctor: Option<DoctorRes>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ed_core::{Folio, LifecycleState, NonEmptyText, PatientId, UrgencyLevel};

    fn record() -> TriageRecord {
        let patient = PatientRef {
            id: PatientId::new(),
            name: NonEmptyText::new("Clara Fuentes").unwrap(),
        };
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 0).unwrap();
        TriageRecord::arrival(Folio::new("ED-20261018-0004").unwrap(), patient, at)
    }

    #[test]
    fn test_record_res_formats_fields() {
        let mut record = record();
        record.urgency = Some(UrgencyLevel::Moderate);
        record.state = LifecycleState::Queued(UrgencyLevel::Moderate);

        let res = TriageRecordRes::from(&record);
        assert_eq!(res.id.len(), 32);
        assert_eq!(res.arrived_at, "2026-10-18T09:15:00Z");
        assert_eq!(res.urgency.as_deref(), Some("moderate"));
        assert_eq!(res.state, "queued (moderate)");
        assert_eq!(res.patient.name, "Clara Fuentes");
    }

    #[test]
    fn test_assign_doctor_defaults_to_active() {
        let req: AssignDoctorReq = serde_json::from_str(r#"{"name":"Dr. Vera"}"#).unwrap();
        assert!(req.active);
        assert!(req.id.is_none());
    }

    #[test]
    fn test_search_mode_defaults_to_prefix() {
        let query: SearchPatientsQuery = serde_json::from_str(r#"{"q":"cla"}"#).unwrap();
        assert_eq!(SearchMode::from(query.mode), SearchMode::Prefix);

        let query: SearchPatientsQuery =
            serde_json::from_str(r#"{"q":"cla","mode":"contains"}"#).unwrap();
        assert_eq!(SearchMode::from(query.mode), SearchMode::Contains);
    }
}

//! Persistence boundary.
//!
//! [`TriageStore`] is the contract the service expects from the database layer. The core never
//! touches disk or network itself; [`MemoryStore`] is an in-process implementation used by the
//! tests, the CLI and the demo server, optionally seeded from a YAML file ([`SeedFile`]).

use crate::error::StoreError;
use crate::record::{LifecycleState, PatientRef, TriageRecord};
use crate::roster::Doctor;
use crate::urgency::UrgencyLevel;
use chrono::{DateTime, Utc};
use ed_types::{Folio, NonEmptyText, Specialty};
use ed_uuid::{PatientId, TriageId};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait TriageStore: Send + Sync {
    fn load_records(&self) -> StoreResult<Vec<TriageRecord>>;
    fn get_record(&self, id: &TriageId) -> StoreResult<Option<TriageRecord>>;
    fn save_record(&self, record: &TriageRecord) -> StoreResult<()>;
    fn load_patients(&self) -> StoreResult<Vec<PatientRef>>;
    fn get_patient(&self, id: &PatientId) -> StoreResult<Option<PatientRef>>;
    fn save_patient(&self, patient: &PatientRef) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<TriageId, TriageRecord>>,
    patients: RwLock<HashMap<PatientId, PatientRef>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with the patients and records of a seed file.
    pub fn seeded(seed: &SeedFile) -> Self {
        let store = Self::new();
        {
            let mut patients = store.patients.write();
            for patient in &seed.patients {
                patients.insert(patient.id, patient.clone());
            }
            let mut records = store.records.write();
            for record in &seed.records {
                patients
                    .entry(record.patient.id)
                    .or_insert_with(|| record.patient.clone());
                records.insert(record.id, record.clone());
            }
        }
        store
    }
}

impl TriageStore for MemoryStore {
    fn load_records(&self) -> StoreResult<Vec<TriageRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn get_record(&self, id: &TriageId) -> StoreResult<Option<TriageRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn save_record(&self, record: &TriageRecord) -> StoreResult<()> {
        self.records.write().insert(record.id, record.clone());
        Ok(())
    }

    fn load_patients(&self) -> StoreResult<Vec<PatientRef>> {
        Ok(self.patients.read().values().cloned().collect())
    }

    fn get_patient(&self, id: &PatientId) -> StoreResult<Option<PatientRef>> {
        Ok(self.patients.read().get(id).cloned())
    }

    fn save_patient(&self, patient: &PatientRef) -> StoreResult<()> {
        self.patients.write().insert(patient.id, patient.clone());
        Ok(())
    }
}

// ============================================================================
// Seed files
// ============================================================================

/// Contents of a YAML seed file: patients, the day's triage records and the specialty roster.
///
/// ```yaml
/// patients:
///   - name: Ana Torres
/// records:
///   - folio: ED-20261018-0001
///     patient: { name: Luis Soto }
///     arrived_at: 2026-10-18T08:05:00Z
///     urgency: urgent
///     specialty: Cardiology
/// doctors:
///   - specialty: Cardiology
///     name: Dr. Salas
/// ```
///
/// Identifiers are optional; missing ones are generated.
#[derive(Debug, Default)]
pub struct SeedFile {
    pub patients: Vec<PatientRef>,
    pub records: Vec<TriageRecord>,
    pub doctors: Vec<(Specialty, Doctor)>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedWire {
    #[serde(default)]
    patients: Vec<PatientWire>,
    #[serde(default)]
    records: Vec<RecordWire>,
    #[serde(default)]
    doctors: Vec<DoctorWire>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PatientWire {
    #[serde(default)]
    id: Option<PatientId>,
    name: NonEmptyText,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordWire {
    #[serde(default)]
    id: Option<TriageId>,
    folio: Folio,
    patient: PatientWire,
    arrived_at: DateTime<Utc>,
    #[serde(default)]
    triaged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    urgency: Option<UrgencyLevel>,
    #[serde(default)]
    specialty: Option<Specialty>,
    #[serde(default)]
    state: Option<LifecycleState>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DoctorWire {
    specialty: Specialty,
    #[serde(default)]
    id: Option<ed_uuid::DoctorId>,
    name: NonEmptyText,
    #[serde(default)]
    active: Option<bool>,
}

impl PatientWire {
    fn into_domain(self) -> PatientRef {
        PatientRef {
            id: self.id.unwrap_or_default(),
            name: self.name,
        }
    }
}

impl RecordWire {
    fn into_domain(self) -> TriageRecord {
        // Without an explicit state, a record that already carries an urgency level has been
        // triaged and is waiting to be queued.
        let state = self.state.unwrap_or(match self.urgency {
            Some(_) => LifecycleState::AwaitingTriage,
            None => LifecycleState::AwaitingIntake,
        });
        TriageRecord {
            id: self.id.unwrap_or_default(),
            folio: self.folio,
            patient: self.patient.into_domain(),
            arrived_at: self.arrived_at,
            triaged_at: self.triaged_at,
            urgency: self.urgency,
            specialty: self.specialty,
            state,
            sequence: None,
        }
    }
}

impl SeedFile {
    /// Parses seed YAML, reporting the path of the first offending field on failure.
    pub fn parse(yaml_text: &str) -> StoreResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire: SeedWire = serde_path_to_error::deserialize(deserializer).map_err(|err| {
            let path = err.path().to_string();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            StoreError::RosterParse {
                path,
                source: err.into_inner(),
            }
        })?;

        Ok(Self {
            patients: wire
                .patients
                .into_iter()
                .map(PatientWire::into_domain)
                .collect(),
            records: wire
                .records
                .into_iter()
                .map(RecordWire::into_domain)
                .collect(),
            doctors: wire
                .doctors
                .into_iter()
                .map(|d| {
                    let doctor = Doctor {
                        id: d.id.unwrap_or_default(),
                        name: d.name,
                        active: d.active.unwrap_or(true),
                    };
                    (d.specialty, doctor)
                })
                .collect(),
        })
    }
}

//! # Triage service
//!
//! Thin orchestration over the in-memory structures: every mutating call is authorised first,
//! then applied to the record, persisted through the [`TriageStore`] and appended to the
//! [`HistoryLog`]. Store calls never happen while the queue lock is held; the queue only ever
//! sees owned records.
//!
//! The service is `Send + Sync` and meant to be shared behind an `Arc` by the REST handlers, the
//! dashboard poller and any worker threads.

use crate::auth::{Actor, Authorizer, Permission};
use crate::config::CoreConfig;
use crate::history::{HistoryEvent, HistoryEventKind, HistoryLog};
use crate::name_index::{PatientIndexEntry, PatientNameIndex, SearchMode};
use crate::queue::{DashboardSnapshot, TriageQueue};
use crate::record::{LifecycleState, PatientRef, TriageRecord};
use crate::roster::{Doctor, DoctorAvailability, SpecialtyRoster};
use crate::store::TriageStore;
use crate::urgency::UrgencyLevel;
use crate::{ServiceError, ServiceResult, TriageError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use ed_types::{Folio, NonEmptyText, Specialty};
use ed_uuid::{PatientId, TriageId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of [`TriageService::load_operational_day`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Records added to the queue.
    pub queued: usize,
    /// Awaiting records of the day that have not been triaged yet.
    pub pending_triage: Vec<TriageId>,
    /// Records the queue refused (e.g. a duplicated folio); each one is logged.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct FolioCounter {
    day: Option<NaiveDate>,
    last: u32,
}

pub struct TriageService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn TriageStore>,
    authorizer: Arc<dyn Authorizer>,
    queue: TriageQueue,
    names: RwLock<PatientNameIndex>,
    history: HistoryLog,
    roster: RwLock<SpecialtyRoster>,
    folios: Mutex<FolioCounter>,
    /// Held for a whole record transition (read, queue change, save, history) so concurrent
    /// callers apply transitions of the same record one at a time and in lifecycle order.
    /// Taken before the queue lock, never while holding it.
    transitions: Mutex<()>,
}

impl TriageService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn TriageStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let queue = TriageQueue::new(cfg.wait_targets());
        Self {
            cfg,
            store,
            authorizer,
            queue,
            names: RwLock::new(PatientNameIndex::new()),
            history: HistoryLog::new(),
            roster: RwLock::new(SpecialtyRoster::new()),
            folios: Mutex::new(FolioCounter::default()),
            transitions: Mutex::new(()),
        }
    }

    /// Handle to the queue, for read-only snapshot accessors.
    pub fn queue(&self) -> &TriageQueue {
        &self.queue
    }

    /// Populates the name index and queue from the store.
    ///
    /// Every stored patient is indexed. Records in an awaiting state that arrived on `day` (UTC)
    /// are enqueued in arrival order if they carry an urgency level; the rest of the day's awaiting
    /// records are reported as pending triage. Records the queue rejects are logged and skipped.
    pub fn load_operational_day(&self, day: NaiveDate) -> ServiceResult<LoadSummary> {
        let patients = self.store.load_patients()?;
        let mut records: Vec<TriageRecord> = self
            .store
            .load_records()?
            .into_iter()
            .filter(|r| r.state.is_awaiting() && r.arrived_at.date_naive() == day)
            .collect();
        records.sort_by(|a, b| {
            (a.arrived_at, a.folio.as_str()).cmp(&(b.arrived_at, b.folio.as_str()))
        });

        {
            let mut names = self.names.write();
            for patient in patients {
                names.insert(patient.name, patient.id);
            }
            for record in &records {
                names.insert(record.patient.name.clone(), record.patient.id);
            }
        }

        let mut summary = LoadSummary::default();
        for record in records {
            self.sync_folio_counter(day, &record.folio);
            if record.urgency.is_none() {
                summary.pending_triage.push(record.id);
                continue;
            }
            let id = record.id;
            match self.queue.add_patient(record) {
                Ok(_) => summary.queued += 1,
                Err(err) => {
                    tracing::warn!(%id, error = %err, "skipping record while loading the day");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            %day,
            queued = summary.queued,
            pending = summary.pending_triage.len(),
            skipped = summary.skipped,
            "operational day loaded"
        );
        Ok(summary)
    }

    /// Seeds the specialty roster at startup. Not subject to authorisation.
    pub fn load_roster(&self, doctors: impl IntoIterator<Item = (Specialty, Doctor)>) {
        let mut roster = self.roster.write();
        for (specialty, doctor) in doctors {
            roster.assign_doctor(specialty, doctor);
        }
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    pub fn register_patient(&self, actor: &Actor, name: &str) -> ServiceResult<PatientRef> {
        self.authorize(actor, Permission::RegisterPatient)?;

        let patient = PatientRef {
            id: PatientId::new(),
            name: NonEmptyText::new(name)?,
        };
        self.store.save_patient(&patient)?;
        self.names.write().insert(patient.name.clone(), patient.id);

        tracing::info!(patient_id = %patient.id, "patient registered");
        Ok(patient)
    }

    pub fn search_patients(&self, query: &str, mode: SearchMode) -> Vec<PatientIndexEntry> {
        self.names.read().search(mode, query)
    }

    // ------------------------------------------------------------------
    // Triage lifecycle
    // ------------------------------------------------------------------

    /// Registers an arrival for a known patient. Without a folio the next one of the day is
    /// generated (`ED-YYYYMMDD-NNNN`).
    pub fn register_arrival(
        &self,
        actor: &Actor,
        patient_id: PatientId,
        folio: Option<&str>,
    ) -> ServiceResult<TriageRecord> {
        self.authorize(actor, Permission::RegisterArrival)?;

        let patient = self
            .store
            .get_patient(&patient_id)?
            .ok_or(ServiceError::PatientNotFound(patient_id))?;
        let now = Utc::now();
        let folio = match folio {
            Some(folio) => {
                let folio = Folio::new(folio)?;
                self.sync_folio_counter(now.date_naive(), &folio);
                folio
            }
            None => self.next_folio(now)?,
        };

        let record = TriageRecord::arrival(folio, patient, now);
        self.store.save_record(&record)?;
        self.history.record(
            record.id,
            HistoryEventKind::Arrival,
            format!("arrival registered with folio {}", record.folio),
            actor.history_ref(),
        );

        tracing::info!(id = %record.id, folio = %record.folio, "arrival registered");
        Ok(record)
    }

    pub fn begin_intake(&self, actor: &Actor, id: TriageId) -> ServiceResult<TriageRecord> {
        self.authorize(actor, Permission::PerformTriage)?;
        let _transition = self.transitions.lock();

        let mut record = self.record(&id)?;
        record.begin_intake()?;
        self.store.save_record(&record)?;
        self.history.record(
            id,
            HistoryEventKind::IntakeStarted,
            "intake started",
            actor.history_ref(),
        );
        Ok(record)
    }

    /// Records the triage outcome and enqueues the patient.
    ///
    /// If persisting fails after the record was queued, it is taken back out of the queue
    /// before the store error is returned.
    pub fn complete_triage(
        &self,
        actor: &Actor,
        id: TriageId,
        level: UrgencyLevel,
        specialty: Option<Specialty>,
    ) -> ServiceResult<TriageRecord> {
        self.authorize(actor, Permission::PerformTriage)?;
        let _transition = self.transitions.lock();

        let mut record = self.record(&id)?;
        record.complete_triage(level, specialty, Utc::now())?;
        let sequence = self.queue.add_patient(record.clone())?;
        record.sequence = Some(sequence);
        record.state = LifecycleState::Queued(level);

        if let Err(err) = self.store.save_record(&record) {
            self.queue.remove_patient(&id);
            tracing::error!(%id, error = %err, "failed to persist triage; dequeued again");
            return Err(err.into());
        }

        let description = match &record.specialty {
            Some(specialty) => format!("triaged as {level}, specialty {specialty}"),
            None => format!("triaged as {level}"),
        };
        self.history.record(
            id,
            HistoryEventKind::TriageCompleted,
            description,
            actor.history_ref(),
        );

        tracing::info!(%id, folio = %record.folio, %level, "triage completed");
        Ok(record)
    }

    /// Calls a specific queued patient for attention.
    ///
    /// # Errors
    ///
    /// [`TriageError::NotFound`] for an unknown record and [`TriageError::InvalidState`] for one
    /// that is not currently queued (including one another caller has just called).
    pub fn call_patient(&self, actor: &Actor, id: TriageId) -> ServiceResult<TriageRecord> {
        self.authorize(actor, Permission::CallPatient)?;
        let _transition = self.transitions.lock();

        match self.queue.remove_patient(&id) {
            Some(record) => self.finish_call(actor, record),
            None => {
                let record = self.record(&id)?;
                Err(record.invalid(format!("is not queued ({})", record.state)).into())
            }
        }
    }

    /// Calls whoever is next in acute care, or returns `None` when nobody is waiting.
    ///
    /// A candidate removed in between through the shared queue handle is skipped and the next
    /// one fetched instead.
    pub fn call_next(&self, actor: &Actor) -> ServiceResult<Option<TriageRecord>> {
        self.authorize(actor, Permission::CallPatient)?;
        let _transition = self.transitions.lock();

        loop {
            let Some(candidate) = self.queue.next_patient() else {
                return Ok(None);
            };
            match self.queue.remove_patient(&candidate.id) {
                Some(record) => return self.finish_call(actor, record).map(Some),
                None => {
                    tracing::debug!(id = %candidate.id, "candidate taken by another caller");
                }
            }
        }
    }

    pub fn call_next_ambulatory(&self, actor: &Actor) -> ServiceResult<Option<TriageRecord>> {
        self.authorize(actor, Permission::CallPatient)?;
        let _transition = self.transitions.lock();

        self.queue
            .next_ambulatory_patient()
            .map(|record| self.finish_call(actor, record))
            .transpose()
    }

    pub fn complete_attention(&self, actor: &Actor, id: TriageId) -> ServiceResult<TriageRecord> {
        self.authorize(actor, Permission::CompleteAttention)?;
        let _transition = self.transitions.lock();

        let mut record = self.record(&id)?;
        record.complete_attention()?;
        self.store.save_record(&record)?;
        self.history.record(
            id,
            HistoryEventKind::AttentionCompleted,
            "attention completed",
            actor.history_ref(),
        );

        tracing::info!(%id, folio = %record.folio, "attention completed");
        Ok(record)
    }

    /// The persisted copy of a record.
    pub fn record(&self, id: &TriageId) -> ServiceResult<TriageRecord> {
        self.store
            .get_record(id)?
            .ok_or(ServiceError::Triage(TriageError::NotFound(*id)))
    }

    pub fn history_for(&self, id: &TriageId) -> Vec<HistoryEvent> {
        self.history.events_for(id)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        self.queue.snapshot(now)
    }

    // ------------------------------------------------------------------
    // Specialty roster
    // ------------------------------------------------------------------

    pub fn assign_doctor(
        &self,
        actor: &Actor,
        specialty: Specialty,
        doctor: Doctor,
    ) -> ServiceResult<()> {
        self.authorize(actor, Permission::ManageRoster)?;

        tracing::info!(%specialty, doctor_id = %doctor.id, active = doctor.active, "roster updated");
        self.roster.write().assign_doctor(specialty, doctor);
        Ok(())
    }

    pub fn doctors_for(&self, specialty: &Specialty) -> Vec<Doctor> {
        self.roster.read().doctors_for(specialty)
    }

    /// Every specialty on the roster with its active doctors, specialties in name order.
    pub fn roster_overview(&self) -> Vec<(Specialty, Vec<Doctor>)> {
        let roster = self.roster.read();
        roster
            .specialties()
            .map(|specialty| (specialty.clone(), roster.doctors_for(specialty)))
            .collect()
    }

    pub fn pick_doctor(
        &self,
        specialty: &Specialty,
        date: NaiveDate,
        time: NaiveTime,
        availability: &dyn DoctorAvailability,
    ) -> Option<Doctor> {
        self.roster
            .read()
            .pick_available(specialty, date, time, availability)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn authorize(&self, actor: &Actor, permission: Permission) -> ServiceResult<()> {
        if self.authorizer.is_permitted(actor, permission) {
            return Ok(());
        }
        tracing::warn!(user_id = %actor.user_id, ?permission, "permission denied");
        Err(ServiceError::Unauthorized {
            user: actor.display_name.clone(),
            permission,
        })
    }

    /// Persists a record the queue has just handed out and logs the call.
    fn finish_call(&self, actor: &Actor, record: TriageRecord) -> ServiceResult<TriageRecord> {
        self.store.save_record(&record)?;
        self.history.record(
            record.id,
            HistoryEventKind::CalledForAttention,
            format!("called for attention ({})", record.folio),
            actor.history_ref(),
        );
        tracing::info!(id = %record.id, folio = %record.folio, "patient called");
        Ok(record)
    }

    fn next_folio(&self, now: DateTime<Utc>) -> ServiceResult<Folio> {
        let day = now.date_naive();
        let number = {
            let mut counter = self.folios.lock();
            if counter.day != Some(day) {
                *counter = FolioCounter {
                    day: Some(day),
                    last: 0,
                };
            }
            counter.last += 1;
            counter.last
        };
        let text = format!(
            "{}-{}-{number:04}",
            self.cfg.folio_prefix(),
            day.format("%Y%m%d")
        );
        Ok(Folio::new(text)?)
    }

    /// Moves the daily folio counter past a folio already issued for `day`.
    fn sync_folio_counter(&self, day: NaiveDate, folio: &Folio) {
        let expected = format!("{}-{}-", self.cfg.folio_prefix(), day.format("%Y%m%d"));
        let Some(number) = folio
            .as_str()
            .strip_prefix(&expected)
            .and_then(|n| n.parse::<u32>().ok())
        else {
            return;
        };

        let mut counter = self.folios.lock();
        if counter.day != Some(day) {
            *counter = FolioCounter {
                day: Some(day),
                last: 0,
            };
        }
        counter.last = counter.last.max(number);
    }
}

//! Specialty to doctor assignment.
//!
//! The roster only knows who is qualified for which specialty. Whether a doctor is free at a
//! given date and time is answered by a [`DoctorAvailability`] collaborator (the scheduling
//! calendar), which is outside this crate.

use chrono::{NaiveDate, NaiveTime};
use ed_types::{NonEmptyText, Specialty};
use ed_uuid::DoctorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn active_by_default() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: NonEmptyText,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

/// Answers whether a doctor can take a slot.
pub trait DoctorAvailability {
    fn is_free(&self, doctor: &Doctor, date: NaiveDate, time: NaiveTime) -> bool;
}

impl<F> DoctorAvailability for F
where
    F: Fn(&Doctor, NaiveDate, NaiveTime) -> bool,
{
    fn is_free(&self, doctor: &Doctor, date: NaiveDate, time: NaiveTime) -> bool {
        self(doctor, date, time)
    }
}

#[derive(Debug, Default)]
pub struct SpecialtyRoster {
    by_specialty: BTreeMap<Specialty, Vec<Doctor>>,
}

impl SpecialtyRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a doctor for a specialty. Registering the same doctor id again replaces the
    /// earlier entry in place (e.g. to deactivate it) and keeps its position.
    pub fn assign_doctor(&mut self, specialty: Specialty, doctor: Doctor) {
        let doctors = self.by_specialty.entry(specialty).or_default();
        match doctors.iter_mut().find(|d| d.id == doctor.id) {
            Some(existing) => *existing = doctor,
            None => doctors.push(doctor),
        }
    }

    /// Active doctors for a specialty, in registration order.
    pub fn doctors_for(&self, specialty: &Specialty) -> Vec<Doctor> {
        self.by_specialty
            .get(specialty)
            .map(|doctors| doctors.iter().filter(|d| d.active).cloned().collect())
            .unwrap_or_default()
    }

    /// First active doctor for `specialty` that `availability` reports free, or `None` when
    /// nobody is.
    pub fn pick_available(
        &self,
        specialty: &Specialty,
        date: NaiveDate,
        time: NaiveTime,
        availability: &dyn DoctorAvailability,
    ) -> Option<Doctor> {
        self.by_specialty
            .get(specialty)?
            .iter()
            .filter(|d| d.active)
            .find(|d| availability.is_free(d, date, time))
            .cloned()
    }

    pub fn specialties(&self) -> impl Iterator<Item = &Specialty> {
        self.by_specialty.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(name: &str) -> Doctor {
        Doctor {
            id: DoctorId::new(),
            name: NonEmptyText::new(name).unwrap(),
            active: true,
        }
    }

    fn slot() -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_doctors_for_lists_active_in_order() {
        let mut roster = SpecialtyRoster::new();
        let cardio = Specialty::new("Cardiology").unwrap();
        let mut inactive = doctor("Dr. Ortega");
        inactive.active = false;
        roster.assign_doctor(cardio.clone(), doctor("Dr. Salas"));
        roster.assign_doctor(cardio.clone(), inactive);
        roster.assign_doctor(cardio.clone(), doctor("Dr. Nieto"));

        let names: Vec<_> = roster
            .doctors_for(&cardio)
            .into_iter()
            .map(|d| d.name.into_inner())
            .collect();
        assert_eq!(names, vec!["Dr. Salas", "Dr. Nieto"]);
    }

    #[test]
    fn test_reassigning_replaces_in_place() {
        let mut roster = SpecialtyRoster::new();
        let trauma = Specialty::new("Traumatology").unwrap();
        let first = doctor("Dr. Vidal");
        roster.assign_doctor(trauma.clone(), first.clone());
        roster.assign_doctor(trauma.clone(), doctor("Dr. Cano"));

        let mut deactivated = first;
        deactivated.active = false;
        roster.assign_doctor(Specialty::new("traumatology").unwrap(), deactivated);

        let doctors = roster.doctors_for(&trauma);
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].name.as_str(), "Dr. Cano");
    }

    #[test]
    fn test_pick_available_returns_first_free() {
        let mut roster = SpecialtyRoster::new();
        let paeds = Specialty::new("Paediatrics").unwrap();
        let busy = doctor("Dr. Busy");
        let free = doctor("Dr. Free");
        let busy_id = busy.id;
        roster.assign_doctor(paeds.clone(), busy);
        roster.assign_doctor(paeds.clone(), free.clone());

        let (date, time) = slot();
        let availability = move |d: &Doctor, _: NaiveDate, _: NaiveTime| d.id != busy_id;

        assert_eq!(
            roster.pick_available(&paeds, date, time, &availability),
            Some(free)
        );
    }

    #[test]
    fn test_pick_available_none_when_exhausted() {
        let mut roster = SpecialtyRoster::new();
        let neuro = Specialty::new("Neurology").unwrap();
        roster.assign_doctor(neuro.clone(), doctor("Dr. Mora"));

        let (date, time) = slot();
        let nobody = |_: &Doctor, _: NaiveDate, _: NaiveTime| false;

        assert!(roster.pick_available(&neuro, date, time, &nobody).is_none());
        assert!(roster
            .pick_available(&Specialty::new("Dermatology").unwrap(), date, time, &nobody)
            .is_none());
    }
}

//! The triage priority queue.
//!
//! Records are partitioned by urgency level. Acute levels are served in strict severity order
//! and FIFO within a level (by the tie-break sequence assigned on insertion); ambulatory
//! patients sit in their own partition that only [`TriageQueue::next_ambulatory_patient`]
//! drains. There is no time-based escalation across levels.
//!
//! A `TriageQueue` is a cheap cloneable handle. All partitions sit behind a single
//! `parking_lot::RwLock`, so every method is atomic on its own. Sequences such as
//! `next_patient` followed by `remove_patient` are *not* atomic as a pair: another caller may
//! remove the record in between, in which case `remove_patient` returns `None` and the caller
//! should fetch again.

use crate::error::{TriageError, TriageResult};
use crate::record::{LifecycleState, TriageRecord};
use crate::urgency::{UrgencyLevel, WaitTargets};
use chrono::{DateTime, Utc};
use ed_uuid::TriageId;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Partitions {
    /// One bucket per level, indexed by severity rank, keyed by tie-break sequence.
    buckets: [BTreeMap<u64, TriageRecord>; 5],
    by_id: HashMap<TriageId, (UrgencyLevel, u64)>,
    by_folio: HashMap<String, TriageId>,
    next_sequence: u64,
}

impl Partitions {
    fn bucket(&self, level: UrgencyLevel) -> &BTreeMap<u64, TriageRecord> {
        &self.buckets[level.index()]
    }

    fn first_in(&self, level: UrgencyLevel) -> Option<&TriageRecord> {
        self.bucket(level).first_key_value().map(|(_, record)| record)
    }

    fn next_acute(&self) -> Option<&TriageRecord> {
        UrgencyLevel::ACUTE
            .into_iter()
            .find_map(move |level| self.first_in(level))
    }

    fn get(&self, id: &TriageId) -> Option<&TriageRecord> {
        let (level, sequence) = self.by_id.get(id)?;
        self.bucket(*level).get(sequence)
    }

    fn take(&mut self, id: &TriageId) -> Option<TriageRecord> {
        let (level, sequence) = self.by_id.remove(id)?;
        let mut record = self.buckets[level.index()].remove(&sequence)?;
        self.by_folio.remove(record.folio.as_str());
        record.state = LifecycleState::InAttention;
        Some(record)
    }

    fn longest_waiting(&self) -> Option<&TriageRecord> {
        UrgencyLevel::ACUTE
            .into_iter()
            .flat_map(move |level| self.bucket(level).values())
            .min_by_key(|record| (record.arrived_at, record.sequence))
    }

    fn stats(&self) -> LevelStats {
        LevelStats {
            critical: self.bucket(UrgencyLevel::Critical).len(),
            urgent: self.bucket(UrgencyLevel::Urgent).len(),
            moderate: self.bucket(UrgencyLevel::Moderate).len(),
            low: self.bucket(UrgencyLevel::Low).len(),
            ambulatory: self.bucket(UrgencyLevel::Ambulatory).len(),
        }
    }

    fn estimate(&self, targets: &WaitTargets, level: UrgencyLevel) -> Duration {
        let depth = u32::try_from(self.bucket(level).len()).unwrap_or(u32::MAX);
        targets
            .bound(level)
            .checked_mul(depth)
            .unwrap_or(Duration::MAX)
    }

    fn overdue(&self, targets: &WaitTargets, now: DateTime<Utc>) -> Vec<&TriageRecord> {
        UrgencyLevel::ALL
            .into_iter()
            .flat_map(move |level| {
                let bound = targets.bound(level);
                self.bucket(level)
                    .values()
                    .filter(move |record| record.waiting_for(now) > bound)
            })
            .collect()
    }
}

/// Queued patient counts per urgency level, taken as one consistent snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub critical: usize,
    pub urgent: usize,
    pub moderate: usize,
    pub low: usize,
    pub ambulatory: usize,
}

impl LevelStats {
    pub fn count(&self, level: UrgencyLevel) -> usize {
        match level {
            UrgencyLevel::Critical => self.critical,
            UrgencyLevel::Urgent => self.urgent,
            UrgencyLevel::Moderate => self.moderate,
            UrgencyLevel::Low => self.low,
            UrgencyLevel::Ambulatory => self.ambulatory,
        }
    }

    pub fn acute_total(&self) -> usize {
        self.critical + self.urgent + self.moderate + self.low
    }

    pub fn total(&self) -> usize {
        self.acute_total() + self.ambulatory
    }
}

/// Everything a dashboard refresh needs, read under a single lock acquisition.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardSnapshot {
    pub taken_at: DateTime<Utc>,
    pub stats: LevelStats,
    pub has_critical: bool,
    pub next: Option<TriageRecord>,
    pub longest_waiting: Option<TriageRecord>,
    /// Estimated wait per level, most severe first.
    pub estimates: Vec<(UrgencyLevel, Duration)>,
    pub overdue: usize,
}

#[derive(Clone, Default)]
pub struct TriageQueue {
    inner: Arc<RwLock<Partitions>>,
    targets: WaitTargets,
}

impl TriageQueue {
    pub fn new(targets: WaitTargets) -> Self {
        Self {
            inner: Arc::default(),
            targets,
        }
    }

    pub fn targets(&self) -> &WaitTargets {
        &self.targets
    }

    /// Enqueues a triaged record and returns the tie-break sequence it was given.
    ///
    /// # Errors
    ///
    /// - [`TriageError::InvalidState`] if no urgency level is set, or the record is already in
    ///   attention or completed.
    /// - [`TriageError::Duplicate`] if a record with the same id or folio is already queued.
    pub fn add_patient(&self, mut record: TriageRecord) -> TriageResult<u64> {
        let Some(level) = record.urgency else {
            return Err(record.invalid("cannot be queued without an urgency level"));
        };
        if matches!(
            record.state,
            LifecycleState::InAttention | LifecycleState::Completed
        ) {
            return Err(record.invalid(format!("cannot be queued while {}", record.state)));
        }

        let mut parts = self.inner.write();
        if parts.by_id.contains_key(&record.id) {
            return Err(TriageError::Duplicate {
                key: "id",
                value: record.id.to_string(),
            });
        }
        if parts.by_folio.contains_key(record.folio.as_str()) {
            return Err(TriageError::Duplicate {
                key: "folio",
                value: record.folio.to_string(),
            });
        }

        let sequence = parts.next_sequence;
        parts.next_sequence += 1;

        record.sequence = Some(sequence);
        record.state = LifecycleState::Queued(level);

        tracing::debug!(id = %record.id, folio = %record.folio, %level, sequence, "queued");

        parts.by_id.insert(record.id, (level, sequence));
        parts
            .by_folio
            .insert(record.folio.as_str().to_owned(), record.id);
        parts.buckets[level.index()].insert(sequence, record);

        Ok(sequence)
    }

    /// Who should be seen next in acute care, without removing them.
    pub fn next_patient(&self) -> Option<TriageRecord> {
        self.inner.read().next_acute().cloned()
    }

    /// Pops the earliest ambulatory patient. The returned record is in `InAttention`.
    pub fn next_ambulatory_patient(&self) -> Option<TriageRecord> {
        let mut parts = self.inner.write();
        let id = parts.first_in(UrgencyLevel::Ambulatory)?.id;
        parts.take(&id)
    }

    /// Removes a record from whichever partition holds it.
    ///
    /// Idempotent: returns `None` when the record is not queued (never queued, or already
    /// removed by another caller). The returned record has been moved to `InAttention`;
    /// persisting that is the caller's job.
    pub fn remove_patient(&self, id: &TriageId) -> Option<TriageRecord> {
        let removed = self.inner.write().take(id);
        if let Some(record) = &removed {
            tracing::debug!(id = %record.id, folio = %record.folio, "removed from queue");
        }
        removed
    }

    pub fn find_by_id(&self, id: &TriageId) -> Option<TriageRecord> {
        self.inner.read().get(id).cloned()
    }

    pub fn find_by_folio(&self, folio: &str) -> Option<TriageRecord> {
        let parts = self.inner.read();
        let id = parts.by_folio.get(folio.trim())?;
        parts.get(id).cloned()
    }

    /// `target_bound(level) × depth(level)`: a conservative estimate from the current queue
    /// shape alone.
    pub fn wait_time_estimate(&self, level: UrgencyLevel) -> Duration {
        self.inner.read().estimate(&self.targets, level)
    }

    pub fn has_critical_patients(&self) -> bool {
        !self.inner.read().bucket(UrgencyLevel::Critical).is_empty()
    }

    /// Earliest arrival across the acute partitions. This is frequently not
    /// [`Self::next_patient`]: a long-waiting low-urgency patient is never "next" while more
    /// severe patients are queued.
    pub fn longest_waiting_patient(&self) -> Option<TriageRecord> {
        self.inner.read().longest_waiting().cloned()
    }

    pub fn stats_per_level(&self) -> LevelStats {
        self.inner.read().stats()
    }

    /// Queued records (any level) that have waited longer than their level's target,
    /// most severe first and FIFO within a level.
    pub fn overdue_patients(&self, now: DateTime<Utc>) -> Vec<TriageRecord> {
        self.inner
            .read()
            .overdue(&self.targets, now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> DashboardSnapshot {
        let parts = self.inner.read();
        let stats = parts.stats();
        DashboardSnapshot {
            taken_at: now,
            stats,
            has_critical: stats.critical > 0,
            next: parts.next_acute().cloned(),
            longest_waiting: parts.longest_waiting().cloned(),
            estimates: UrgencyLevel::ALL
                .into_iter()
                .map(|level| (level, parts.estimate(&self.targets, level)))
                .collect(),
            overdue: parts.overdue(&self.targets, now).len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::triaged;
    use std::collections::HashSet;
    use std::thread;

    fn queue() -> TriageQueue {
        TriageQueue::default()
    }

    #[test]
    fn test_same_level_is_fifo() {
        let q = queue();
        let a = triaged("F001", 0, UrgencyLevel::Critical);
        let b = triaged("F002", 1, UrgencyLevel::Critical);
        let a_id = a.id;
        q.add_patient(a).unwrap();
        q.add_patient(b).unwrap();

        assert_eq!(q.next_patient().unwrap().id, a_id);
    }

    #[test]
    fn test_severity_beats_arrival_order() {
        let q = queue();
        let c = triaged("F003", 0, UrgencyLevel::Low);
        let d = triaged("F004", 5, UrgencyLevel::Critical);
        let d_id = d.id;
        q.add_patient(c).unwrap();
        q.add_patient(d).unwrap();

        assert_eq!(q.next_patient().unwrap().id, d_id);
    }

    #[test]
    fn test_ambulatory_only_served_from_its_own_partition() {
        let q = queue();
        let e = triaged("F005", 0, UrgencyLevel::Ambulatory);
        let e_id = e.id;
        q.add_patient(e).unwrap();

        assert!(q.next_patient().is_none());

        let popped = q.next_ambulatory_patient().unwrap();
        assert_eq!(popped.id, e_id);
        assert_eq!(popped.state, LifecycleState::InAttention);
        assert!(q.next_ambulatory_patient().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_removed_patient_is_never_next() {
        let q = queue();
        let f = triaged("F006", 0, UrgencyLevel::Urgent);
        let f_id = f.id;
        q.add_patient(f).unwrap();

        let removed = q.remove_patient(&f_id).unwrap();
        assert_eq!(removed.state, LifecycleState::InAttention);
        assert!(q.next_patient().is_none());
        assert!(q.find_by_folio("F006").is_none());
    }

    #[test]
    fn test_stats_per_level_counts_every_level() {
        let q = queue();
        let levels = [
            UrgencyLevel::Critical,
            UrgencyLevel::Critical,
            UrgencyLevel::Critical,
            UrgencyLevel::Urgent,
            UrgencyLevel::Urgent,
            UrgencyLevel::Low,
        ];
        for (i, level) in levels.into_iter().enumerate() {
            q.add_patient(triaged(&format!("F{i:03}"), i as u32, level))
                .unwrap();
        }

        assert_eq!(
            q.stats_per_level(),
            LevelStats {
                critical: 3,
                urgent: 2,
                moderate: 0,
                low: 1,
                ambulatory: 0,
            }
        );
    }

    #[test]
    fn test_add_without_urgency_is_invalid_state() {
        let q = queue();
        let mut record = triaged("F001", 0, UrgencyLevel::Low);
        record.urgency = None;

        let err = q.add_patient(record).unwrap_err();
        assert!(matches!(err, TriageError::InvalidState { .. }));
        assert!(q.is_empty());
    }

    #[test]
    fn test_add_completed_record_is_invalid_state() {
        let q = queue();
        let mut record = triaged("F001", 0, UrgencyLevel::Low);
        record.state = LifecycleState::Completed;

        assert!(matches!(
            q.add_patient(record),
            Err(TriageError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_duplicate_id_and_folio_rejected() {
        let q = queue();
        let record = triaged("F001", 0, UrgencyLevel::Moderate);
        q.add_patient(record.clone()).unwrap();

        let err = q.add_patient(record).unwrap_err();
        assert!(matches!(err, TriageError::Duplicate { key: "id", .. }));

        let same_folio = triaged("F001", 3, UrgencyLevel::Low);
        let err = q.add_patient(same_folio).unwrap_err();
        assert!(matches!(err, TriageError::Duplicate { key: "folio", .. }));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let q = queue();
        let record = triaged("F001", 0, UrgencyLevel::Low);
        let id = record.id;
        q.add_patient(record).unwrap();

        assert!(q.remove_patient(&id).is_some());
        assert!(q.remove_patient(&id).is_none());
        assert!(q.remove_patient(&TriageId::new()).is_none());
    }

    #[test]
    fn test_add_then_remove_restores_previous_shape() {
        let q = queue();
        q.add_patient(triaged("F001", 0, UrgencyLevel::Urgent))
            .unwrap();
        q.add_patient(triaged("F002", 1, UrgencyLevel::Low)).unwrap();
        let stats_before = q.stats_per_level();
        let next_before = q.next_patient().map(|r| r.id);

        let extra = triaged("F003", 2, UrgencyLevel::Critical);
        let extra_id = extra.id;
        q.add_patient(extra).unwrap();
        q.remove_patient(&extra_id);

        assert_eq!(q.stats_per_level(), stats_before);
        assert_eq!(q.next_patient().map(|r| r.id), next_before);
    }

    #[test]
    fn test_next_is_min_level_then_min_sequence() {
        let q = queue();
        let order = [
            UrgencyLevel::Low,
            UrgencyLevel::Moderate,
            UrgencyLevel::Urgent,
            UrgencyLevel::Moderate,
            UrgencyLevel::Urgent,
            UrgencyLevel::Ambulatory,
        ];
        for (i, level) in order.into_iter().enumerate() {
            q.add_patient(triaged(&format!("F{i:03}"), i as u32, level))
                .unwrap();
        }

        let mut served = Vec::new();
        while let Some(next) = q.next_patient() {
            q.remove_patient(&next.id).unwrap();
            served.push((next.urgency.unwrap(), next.sequence.unwrap()));
        }

        assert_eq!(
            served,
            vec![
                (UrgencyLevel::Urgent, 2),
                (UrgencyLevel::Urgent, 4),
                (UrgencyLevel::Moderate, 1),
                (UrgencyLevel::Moderate, 3),
                (UrgencyLevel::Low, 0),
            ]
        );
        assert_eq!(q.stats_per_level().ambulatory, 1);
    }

    #[test]
    fn test_has_critical_tracks_critical_partition() {
        let q = queue();
        assert!(!q.has_critical_patients());

        let record = triaged("F001", 0, UrgencyLevel::Critical);
        let id = record.id;
        q.add_patient(record).unwrap();
        q.add_patient(triaged("F002", 1, UrgencyLevel::Urgent))
            .unwrap();
        assert!(q.has_critical_patients());

        q.remove_patient(&id);
        assert!(!q.has_critical_patients());
    }

    #[test]
    fn test_longest_waiting_differs_from_next() {
        let q = queue();
        let early_low = triaged("F001", 0, UrgencyLevel::Low);
        let early_id = early_low.id;
        q.add_patient(early_low).unwrap();
        q.add_patient(triaged("F002", 40, UrgencyLevel::Critical))
            .unwrap();
        q.add_patient(triaged("F003", 1, UrgencyLevel::Ambulatory))
            .unwrap();

        assert_eq!(q.longest_waiting_patient().unwrap().id, early_id);
        assert_eq!(
            q.next_patient().unwrap().urgency,
            Some(UrgencyLevel::Critical)
        );
    }

    #[test]
    fn test_longest_waiting_uses_arrival_not_insertion() {
        let q = queue();
        q.add_patient(triaged("F001", 30, UrgencyLevel::Moderate))
            .unwrap();
        let earlier = triaged("F002", 10, UrgencyLevel::Moderate);
        let earlier_id = earlier.id;
        q.add_patient(earlier).unwrap();

        assert_eq!(q.longest_waiting_patient().unwrap().id, earlier_id);
    }

    #[test]
    fn test_wait_estimate_scales_with_depth() {
        let q = queue();
        assert_eq!(q.wait_time_estimate(UrgencyLevel::Urgent), Duration::ZERO);

        for i in 0..3 {
            q.add_patient(triaged(&format!("F{i:03}"), i, UrgencyLevel::Urgent))
                .unwrap();
        }

        assert_eq!(
            q.wait_time_estimate(UrgencyLevel::Urgent),
            UrgencyLevel::Urgent.default_target() * 3
        );
        assert_eq!(q.wait_time_estimate(UrgencyLevel::Low), Duration::ZERO);
    }

    #[test]
    fn test_find_by_id_and_folio() {
        let q = queue();
        let record = triaged("ED-20261018-0001", 0, UrgencyLevel::Moderate);
        let id = record.id;
        q.add_patient(record).unwrap();

        assert_eq!(q.find_by_folio(" ED-20261018-0001 ").unwrap().id, id);
        assert_eq!(
            q.find_by_id(&id).unwrap().state,
            LifecycleState::Queued(UrgencyLevel::Moderate)
        );
        assert!(q.find_by_folio("missing").is_none());
        assert!(q.find_by_id(&TriageId::new()).is_none());
    }

    #[test]
    fn test_overdue_patients_compare_against_targets() {
        let q = queue();
        let urgent = triaged("F001", 0, UrgencyLevel::Urgent);
        let arrived = urgent.arrived_at;
        q.add_patient(urgent).unwrap();
        q.add_patient(triaged("F002", 0, UrgencyLevel::Low)).unwrap();

        let now = arrived + chrono::Duration::minutes(20);
        let overdue = q.overdue_patients(now);

        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].urgency, Some(UrgencyLevel::Urgent));
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let q = queue();
        q.add_patient(triaged("F001", 0, UrgencyLevel::Critical))
            .unwrap();
        q.add_patient(triaged("F002", 1, UrgencyLevel::Ambulatory))
            .unwrap();

        let snap = q.snapshot(Utc::now());
        assert!(snap.has_critical);
        assert_eq!(snap.stats.total(), 2);
        assert_eq!(snap.estimates.len(), 5);
        assert_eq!(snap.next.unwrap().folio.as_str(), "F001");
    }

    #[test]
    fn test_concurrent_adds_and_removes_keep_counts() {
        let q = queue();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let q = q.clone();
                thread::spawn(move || {
                    let level = UrgencyLevel::ALL[t % 5];
                    let mut ids = Vec::new();
                    for i in 0..50 {
                        let record = triaged(&format!("T{t}-{i}"), 0, level);
                        ids.push(record.id);
                        q.add_patient(record).unwrap();
                    }
                    for id in ids.iter().take(20) {
                        q.remove_patient(id);
                    }
                    level
                })
            })
            .collect();

        let mut expected = [0usize; 5];
        for handle in handles {
            let level = handle.join().unwrap();
            expected[level.index()] += 30;
        }

        let stats = q.stats_per_level();
        for level in UrgencyLevel::ALL {
            assert_eq!(stats.count(level), expected[level.index()]);
        }
    }

    #[test]
    fn test_concurrent_callers_never_claim_same_record() {
        let q = queue();
        for i in 0..200 {
            let level = UrgencyLevel::ACUTE[i % 4];
            q.add_patient(triaged(&format!("F{i:04}"), 0, level))
                .unwrap();
        }

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let q = q.clone();
                thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(next) = q.next_patient() {
                        if let Some(record) = q.remove_patient(&next.id) {
                            claimed.push(record.id);
                        }
                    }
                    claimed
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "record claimed twice");
                total += 1;
            }
        }
        assert_eq!(total, 200);
        assert!(q.is_empty());
    }
}

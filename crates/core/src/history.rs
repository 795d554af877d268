//! Append-only audit trail per triage record.
//!
//! Events reference records by id value only. Insertion order is the reading order; since events
//! are stamped when appended it also matches timestamp order.

use chrono::{DateTime, Utc};
use ed_uuid::{TriageId, UserId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventKind {
    Arrival,
    IntakeStarted,
    TriageCompleted,
    CalledForAttention,
    AttentionCompleted,
}

/// The staff member who caused an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActorRef {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: HistoryEventKind,
    pub description: String,
    pub actor: ActorRef,
}

impl HistoryEvent {
    pub fn now(kind: HistoryEventKind, description: impl Into<String>, actor: ActorRef) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            description: description.into(),
            actor,
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryLog {
    events: RwLock<HashMap<TriageId, Vec<HistoryEvent>>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record_id: TriageId, event: HistoryEvent) {
        self.events.write().entry(record_id).or_default().push(event);
    }

    /// Stamps and appends an event in one step. The timestamp is taken under the write lock so
    /// a record's events stay in timestamp order even with concurrent writers.
    pub fn record(
        &self,
        record_id: TriageId,
        kind: HistoryEventKind,
        description: impl Into<String>,
        actor: ActorRef,
    ) {
        let description = description.into();
        let mut events = self.events.write();
        events
            .entry(record_id)
            .or_default()
            .push(HistoryEvent::now(kind, description, actor));
    }

    /// Events for one record in insertion order; empty for unknown records.
    pub fn events_for(&self, record_id: &TriageId) -> Vec<HistoryEvent> {
        self.events
            .read()
            .get(record_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> ActorRef {
        ActorRef {
            user_id: UserId::new(),
            display_name: "Nurse Ramírez".into(),
        }
    }

    #[test]
    fn test_events_come_back_in_insertion_order() {
        let log = HistoryLog::new();
        let id = TriageId::new();
        let kinds = [
            HistoryEventKind::Arrival,
            HistoryEventKind::TriageCompleted,
            HistoryEventKind::CalledForAttention,
            HistoryEventKind::AttentionCompleted,
        ];
        for kind in kinds {
            log.append(id, HistoryEvent::now(kind, format!("{kind:?}"), actor()));
        }

        let events = log.events_for(&id);
        assert_eq!(
            events.iter().map(|e| e.kind).collect::<Vec<_>>(),
            kinds.to_vec()
        );
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_records_are_isolated() {
        let log = HistoryLog::new();
        let a = TriageId::new();
        let b = TriageId::new();
        log.append(a, HistoryEvent::now(HistoryEventKind::Arrival, "a", actor()));

        assert_eq!(log.events_for(&a).len(), 1);
        assert!(log.events_for(&b).is_empty());
    }

    #[test]
    fn test_returned_events_are_copies() {
        let log = HistoryLog::new();
        let id = TriageId::new();
        log.record(id, HistoryEventKind::Arrival, "arrived", actor());

        let mut copy = log.events_for(&id);
        copy.clear();

        assert_eq!(log.events_for(&id).len(), 1);
    }
}

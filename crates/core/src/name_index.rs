//! Ordered patient name index for search-as-you-type lookups.
//!
//! Entries are keyed by `(normalised name, patient id)`, so two patients sharing a name are both
//! kept. Normalisation lowercases the name and collapses runs of whitespace; results always carry
//! the display name exactly as it was registered.

use ed_types::NonEmptyText;
use ed_uuid::{PatientId, Uuid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

/// How a search query is matched against names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Exact,
    #[default]
    Prefix,
    Contains,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatientIndexEntry {
    pub name: NonEmptyText,
    pub patient_id: PatientId,
}

#[derive(Debug, Default)]
pub struct PatientNameIndex {
    entries: BTreeMap<(String, PatientId), NonEmptyText>,
}

fn normalise(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl PatientNameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a patient. Returns `false` if this exact (name, id) pair was already present.
    pub fn insert(&mut self, name: NonEmptyText, patient_id: PatientId) -> bool {
        let key = (normalise(name.as_str()), patient_id);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, name);
        true
    }

    pub fn search(&self, mode: SearchMode, query: &str) -> Vec<PatientIndexEntry> {
        match mode {
            SearchMode::Exact => self.search_exact(query),
            SearchMode::Prefix => self.search_prefix(query),
            SearchMode::Contains => self.search_contains(query),
        }
    }

    pub fn search_exact(&self, name: &str) -> Vec<PatientIndexEntry> {
        let wanted = normalise(name);
        self.scan_from(&wanted, |key| key == wanted)
    }

    pub fn search_prefix(&self, partial: &str) -> Vec<PatientIndexEntry> {
        let wanted = normalise(partial);
        self.scan_from(&wanted, |key| key.starts_with(&wanted))
    }

    /// Substring match. Needs a full ordered traversal, unlike the exact and prefix searches.
    pub fn search_contains(&self, partial: &str) -> Vec<PatientIndexEntry> {
        let wanted = normalise(partial);
        if wanted.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|((key, _), _)| key.contains(&wanted))
            .map(to_entry)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks forward from the first key >= `start` while `matches` holds.
    fn scan_from(&self, start: &str, matches: impl Fn(&str) -> bool) -> Vec<PatientIndexEntry> {
        if start.is_empty() {
            return Vec::new();
        }
        let lower = (start.to_owned(), PatientId::from_uuid(Uuid::nil()));
        self.entries
            .range((Bound::Included(lower), Bound::Unbounded))
            .take_while(|((key, _), _)| matches(key.as_str()))
            .map(to_entry)
            .collect()
    }
}

fn to_entry(((_, patient_id), name): (&(String, PatientId), &NonEmptyText)) -> PatientIndexEntry {
    PatientIndexEntry {
        name: name.clone(),
        patient_id: *patient_id,
    }
}

//! Identifier types for the ED triage system.
//!
//! Every entity (triage episode, patient, doctor, staff user) is identified by a UUID held in a
//! *canonical* textual form: **32 lowercase hexadecimal characters** (no hyphens). Using one
//! representation everywhere keeps lookups by id stable regardless of whether an identifier came
//! from the database, a roster file or an HTTP path.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Each entity gets its own newtype ([`TriageId`], [`PatientId`], [`DoctorId`], [`UserId`]) so a
//! patient id can never be passed where a triage record id is expected.

mod service;

pub use service::{CanonicalUuid, DoctorId, PatientId, TriageId, UserId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;

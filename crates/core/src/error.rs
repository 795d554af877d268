use ed_uuid::TriageId;

/// Misuse of the in-memory triage structures.
///
/// Every variant is a programmer or caller error surfaced immediately; nothing in the core
/// retries or recovers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TriageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The record's lifecycle state does not permit the operation (including enqueuing a
    /// record whose triage has not assigned an urgency level).
    #[error("record {id}: {reason}")]
    InvalidState { id: TriageId, reason: String },
    #[error("a record with {key} '{value}' is already queued")]
    Duplicate { key: &'static str, value: String },
    #[error("triage record not found: {0}")]
    NotFound(TriageId),
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;

/// Failure reported by a persistence collaborator.
///
/// The core never inspects or masks these; they are carried back to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to parse roster YAML at {path}: {source}")]
    RosterParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("store backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by [`crate::TriageService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Triage(#[from] TriageError),
    #[error("user {user} is not permitted to {permission}")]
    Unauthorized {
        user: String,
        permission: crate::auth::Permission,
    },
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
    #[error("patient not found: {0}")]
    PatientNotFound(ed_uuid::PatientId),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ed_types::TextError),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

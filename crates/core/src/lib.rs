//! # ED Core
//!
//! Core business logic for the emergency-department triage system.
//!
//! This crate contains the in-memory structures and their orchestration:
//! - The triage priority queue (strict severity order, FIFO within a level, separate ambulatory
//!   lane) and its dashboard snapshot accessors
//! - The ordered patient name index
//! - The per-record history log
//! - Specialty to doctor assignment
//! - [`TriageService`], which authorises, persists and audits every mutation
//! - The periodic [`DashboardPoller`]
//!
//! **No API concerns**: Authentication, HTTP servers, or CLI handling belong in `api-shared`,
//! `api-rest`, or `cli`. Persistence is reached only through the [`TriageStore`] trait.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod name_index;
pub mod poller;
pub mod queue;
pub mod record;
pub mod roster;
pub mod service;
pub mod store;
pub mod urgency;

pub use auth::{Actor, Authorizer, Permission, Role};
pub use config::CoreConfig;
pub use error::{ServiceError, ServiceResult, StoreError, TriageError, TriageResult};
pub use history::{ActorRef, HistoryEvent, HistoryEventKind, HistoryLog};
pub use name_index::{PatientIndexEntry, PatientNameIndex, SearchMode};
pub use poller::DashboardPoller;
pub use queue::{DashboardSnapshot, LevelStats, TriageQueue};
pub use record::{LifecycleState, PatientRef, TriageRecord};
pub use roster::{Doctor, DoctorAvailability, SpecialtyRoster};
pub use service::{LoadSummary, TriageService};
pub use store::{MemoryStore, SeedFile, StoreResult, TriageStore};
pub use urgency::{UrgencyLevel, WaitTargets};

pub use ed_types::{Folio, NonEmptyText, Specialty, TextError};
pub use ed_uuid::{DoctorId, PatientId, TriageId, UserId};

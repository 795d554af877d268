//! Authorisation boundary.
//!
//! The core does not authenticate anyone. Callers construct an [`Actor`] from whatever session
//! they hold, and the service asks an [`Authorizer`] before every mutating operation.

use ed_uuid::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    SocialWorker,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "nurse" => Ok(Role::Nurse),
            "receptionist" => Ok(Role::Receptionist),
            "social_worker" | "social-worker" => Ok(Role::SocialWorker),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    RegisterPatient,
    RegisterArrival,
    PerformTriage,
    CallPatient,
    CompleteAttention,
    ManageRoster,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Permission::RegisterPatient => "register patients",
            Permission::RegisterArrival => "register arrivals",
            Permission::PerformTriage => "perform triage",
            Permission::CallPatient => "call patients for attention",
            Permission::CompleteAttention => "complete attention",
            Permission::ManageRoster => "manage the specialty roster",
        };
        f.write_str(text)
    }
}

/// The authenticated staff member making a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
}

impl Actor {
    pub(crate) fn history_ref(&self) -> crate::history::ActorRef {
        crate::history::ActorRef {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
        }
    }
}

pub trait Authorizer: Send + Sync {
    fn is_permitted(&self, actor: &Actor, permission: Permission) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Actor, Permission) -> bool + Send + Sync,
{
    fn is_permitted(&self, actor: &Actor, permission: Permission) -> bool {
        self(actor, permission)
    }
}

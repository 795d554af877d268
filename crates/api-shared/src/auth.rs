//! Request authentication and role-based authorisation.
//!
//! Clients send the shared API key in `x-api-key` and identify the acting staff member with
//! `x-user-id`, `x-user-name` and `x-user-role`. The expected key is resolved once at startup
//! (from `API_KEY`) and handed to the server; nothing here reads the environment.

use ed_core::{Actor, Authorizer, Permission, Role, UserId};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid API key")]
    InvalidApiKey,
    #[error("invalid {header} header: {reason}")]
    InvalidHeader {
        header: &'static str,
        reason: String,
    },
}

/// Validates the provided API key against the key configured at startup.
pub fn validate_api_key(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let provided = provided.ok_or(AuthError::MissingHeader(API_KEY_HEADER))?;
    if provided == expected {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

/// Builds the acting user from the identity header values.
pub fn actor_from_headers(
    user_id: Option<&str>,
    user_name: Option<&str>,
    role: Option<&str>,
) -> Result<Actor, AuthError> {
    let user_id = user_id.ok_or(AuthError::MissingHeader(USER_ID_HEADER))?;
    let user_id = UserId::parse(user_id.trim()).map_err(|err| AuthError::InvalidHeader {
        header: USER_ID_HEADER,
        reason: err.to_string(),
    })?;

    let display_name = user_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(AuthError::MissingHeader(USER_NAME_HEADER))?
        .to_string();

    let role = role
        .ok_or(AuthError::MissingHeader(USER_ROLE_HEADER))?
        .parse::<Role>()
        .map_err(|reason| AuthError::InvalidHeader {
            header: USER_ROLE_HEADER,
            reason,
        })?;

    Ok(Actor {
        user_id,
        display_name,
        role,
    })
}

/// Fixed role to permission matrix.
///
/// | Role          | Permissions                                                    |
/// |---------------|----------------------------------------------------------------|
/// | Admin         | everything                                                     |
/// | Doctor        | perform triage, call patients, complete attention              |
/// | Nurse         | register patients and arrivals, perform triage, call patients  |
/// | Receptionist  | register patients and arrivals                                 |
/// | SocialWorker  | register patients                                              |
#[derive(Clone, Copy, Debug, Default)]
pub struct RolePolicy;

impl RolePolicy {
    pub const fn permits(role: Role, permission: Permission) -> bool {
        use Permission::*;
        match role {
            Role::Admin => true,
            Role::Doctor => matches!(permission, PerformTriage | CallPatient | CompleteAttention),
            Role::Nurse => matches!(
                permission,
                RegisterPatient | RegisterArrival | PerformTriage | CallPatient
            ),
            Role::Receptionist => matches!(permission, RegisterPatient | RegisterArrival),
            Role::SocialWorker => matches!(permission, RegisterPatient),
        }
    }
}

impl Authorizer for RolePolicy {
    fn is_permitted(&self, actor: &Actor, permission: Permission) -> bool {
        Self::permits(actor.role, permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "550e8400e29b41d4a716446655440000";

    #[test]
    fn test_api_key_must_match() {
        assert_eq!(validate_api_key(Some("secret"), "secret"), Ok(()));
        assert_eq!(
            validate_api_key(Some("guess"), "secret"),
            Err(AuthError::InvalidApiKey)
        );
        assert_eq!(
            validate_api_key(None, "secret"),
            Err(AuthError::MissingHeader(API_KEY_HEADER))
        );
    }

    #[test]
    fn test_actor_from_headers() {
        let actor = actor_from_headers(Some(USER), Some(" Nurse Vega "), Some("Nurse")).unwrap();

        assert_eq!(actor.user_id.to_string(), USER);
        assert_eq!(actor.display_name, "Nurse Vega");
        assert_eq!(actor.role, Role::Nurse);
    }

    #[test]
    fn test_actor_from_headers_rejects_bad_values() {
        assert_eq!(
            actor_from_headers(None, Some("A"), Some("nurse")),
            Err(AuthError::MissingHeader(USER_ID_HEADER))
        );
        assert!(matches!(
            actor_from_headers(Some("not-a-uuid"), Some("A"), Some("nurse")),
            Err(AuthError::InvalidHeader {
                header: USER_ID_HEADER,
                ..
            })
        ));
        assert_eq!(
            actor_from_headers(Some(USER), Some("  "), Some("nurse")),
            Err(AuthError::MissingHeader(USER_NAME_HEADER))
        );
        assert!(matches!(
            actor_from_headers(Some(USER), Some("A"), Some("janitor")),
            Err(AuthError::InvalidHeader {
                header: USER_ROLE_HEADER,
                ..
            })
        ));
    }

    #[test]
    fn test_role_policy_matrix() {
        assert!(RolePolicy::permits(Role::Admin, Permission::ManageRoster));
        assert!(RolePolicy::permits(Role::Nurse, Permission::PerformTriage));
        assert!(RolePolicy::permits(Role::Doctor, Permission::CompleteAttention));
        assert!(!RolePolicy::permits(Role::Nurse, Permission::CompleteAttention));
        assert!(!RolePolicy::permits(Role::Receptionist, Permission::PerformTriage));
        assert!(!RolePolicy::permits(Role::Doctor, Permission::ManageRoster));
        assert!(!RolePolicy::permits(Role::SocialWorker, Permission::CallPatient));
    }
}

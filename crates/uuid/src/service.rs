//! Canonical UUID wrapper and the typed identifiers built on it.

use crate::{IdError, IdResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// A UUID that is guaranteed to render in canonical form (32 lowercase hex characters).
///
/// # Construction
/// - [`CanonicalUuid::new`] generates a fresh v4 UUID.
/// - [`CanonicalUuid::parse`] validates an externally supplied identifier.
///
/// Parsing does **not** normalise other common forms (hyphenated, uppercase); callers at the
/// boundary must send the canonical representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalUuid(Uuid);

impl Default for CanonicalUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalUuid {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID. Any `Uuid` value has a canonical rendering.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not 32 lowercase hex characters.
    pub fn parse(input: &str) -> IdResult<Self> {
        if !Self::is_canonical(input) {
            return Err(IdError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| IdError::InvalidInput(format!("invalid UUID '{}': {}", input, e)))
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical UUID form.
    ///
    /// Purely syntactic: exactly 32 bytes, all in `0-9a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for CanonicalUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for CanonicalUuid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CanonicalUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CanonicalUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CanonicalUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(CanonicalUuid);

        impl $name {
            /// Allocates a fresh identifier.
            pub fn new() -> Self {
                Self(CanonicalUuid::new())
            }

            /// Parses a canonical (32 lowercase hex) identifier.
            pub fn parse(input: &str) -> IdResult<Self> {
                CanonicalUuid::parse(input).map(Self)
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(CanonicalUuid::from_uuid(uuid))
            }

            pub fn uuid(&self) -> Uuid {
                self.0.uuid()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

typed_id!(
    /// Identifier of a single triage episode (one ED visit).
    TriageId
);
typed_id!(
    /// Identifier of a registered patient.
    PatientId
);
typed_id!(
    /// Identifier of a doctor on the specialty roster.
    DoctorId
);
typed_id!(
    /// Identifier of a staff user acting on the system.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_uuid() {
        let id = CanonicalUuid::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(CanonicalUuid::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let parsed = CanonicalUuid::parse(canonical).unwrap();

        assert_eq!(parsed.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let result = CanonicalUuid::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(IdError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase_and_bad_length() {
        assert!(CanonicalUuid::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(CanonicalUuid::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(CanonicalUuid::parse("550e8400e29b41d4a7164466554400000").is_err());
        assert!(CanonicalUuid::parse("").is_err());
    }

    #[test]
    fn test_typed_ids_round_trip_through_strings() {
        let id = TriageId::new();
        let parsed: TriageId = id.to_string().parse().unwrap();

        assert_eq!(id, parsed);
    }

    #[test]
    fn test_typed_id_serializes_as_plain_string() {
        let id = PatientId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: PatientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_typed_id_deserialize_rejects_hyphenated() {
        let result = serde_json::from_str::<DoctorId>("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(result.is_err());
    }
}

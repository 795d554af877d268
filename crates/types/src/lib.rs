//! Validated text types shared across the ED triage crates.
//!
//! Values here are checked once at the boundary (form input, API request, roster file) so the
//! rest of the system can rely on them without re-validating.

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    /// The input contained line breaks or other control characters
    #[error("text must not contain control characters")]
    ControlCharacters,
    /// The input exceeded the maximum permitted length
    #[error("text exceeds {max} characters")]
    TooLong { max: usize },
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, returning [`TextError::Empty`] when the trimmed input is
    /// empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Human-facing ticket reference for a triage episode (e.g. `ED-20261018-0007`).
///
/// The folio is opaque to the core: the only guarantees are that it is non-empty, single-line
/// and at most [`Folio::MAX_LEN`] characters. Uniqueness among active records is enforced by the
/// triage queue, not here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Folio(NonEmptyText);

impl Folio {
    pub const MAX_LEN: usize = 64;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        if text.as_str().chars().any(char::is_control) {
            return Err(TextError::ControlCharacters);
        }
        if text.as_str().chars().count() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Folio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Folio {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for Folio {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Folio {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Folio::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A medical specialty a triaged patient is routed to (e.g. "Traumatology", "Paediatrics").
///
/// Specialties compare case-insensitively so that roster lookups do not depend on how a form
/// capitalised the value; the original spelling is kept for display.
#[derive(Debug, Clone)]
pub struct Specialty {
    display: NonEmptyText,
    key: String,
}

impl Specialty {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let display = NonEmptyText::new(input)?;
        if display.as_str().chars().any(char::is_control) {
            return Err(TextError::ControlCharacters);
        }
        let key = display.as_str().to_lowercase();
        Ok(Self { display, key })
    }

    pub fn as_str(&self) -> &str {
        self.display.as_str()
    }

    /// Lowercased form used for equality, ordering and hashing.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl PartialEq for Specialty {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Specialty {}

impl PartialOrd for Specialty {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Specialty {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl std::hash::Hash for Specialty {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Specialty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Specialty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Specialty::new(&s).map_err(serde::de::Error::custom)
    }
}

//! Shared types used across the annuaire workspace.
//!
//! This module defines common newtypes that provide type safety
//! and clear domain modeling.

use crate::error::AnnuaireError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Newtype for city names used as cache keys.
///
/// Names are trimmed; the cache lookup is an exact match on the trimmed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityName(String);

impl CityName {
    /// Maximum accepted length, in characters.
    pub const MAX_LEN: usize = 120;

    /// Create a new `CityName` from a string.
    ///
    /// # Errors
    /// Returns error if the trimmed name is empty, too long, or contains control characters.
    pub fn new(name: impl AsRef<str>) -> Result<Self, AnnuaireError> {
        let name = name.as_ref().trim();

        if name.is_empty() {
            return Err(AnnuaireError::Validation(
                "invalid city name: must not be empty".to_string(),
            ));
        }

        let len = name.chars().count();
        if len > Self::MAX_LEN {
            return Err(AnnuaireError::Validation(format!(
                "invalid city name: must be at most {} characters, got {len}",
                Self::MAX_LEN
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(AnnuaireError::Validation(format!(
                "invalid city name: contains control characters, got '{}'",
                name.escape_debug()
            )));
        }

        Ok(Self(name.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CityName {
    type Err = AnnuaireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Profession code in the portal's taxonomy (e.g. 37 for general practitioners).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfessionId(u32);

impl ProfessionId {
    /// General practitioner ("Médecin généraliste").
    pub const GENERAL_PRACTITIONER: Self = Self(37);

    /// Create a new `ProfessionId`.
    ///
    /// # Errors
    /// Returns error if the code is zero.
    pub fn new(id: u32) -> Result<Self, AnnuaireError> {
        if id == 0 {
            return Err(AnnuaireError::Validation(
                "invalid profession ID: must be positive".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the numeric code.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProfessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfessionId {
    type Err = AnnuaireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().parse::<u32>().map_err(|e| {
            AnnuaireError::Validation(format!("invalid profession ID '{s}': {e}"))
        })?;
        Self::new(id)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, AnnuaireError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| AnnuaireError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

//! IANA timezone value object.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A validated IANA timezone identifier (e.g. `Europe/Madrid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timezone(Tz);

impl Timezone {
    /// Parses and validates a timezone identifier. Surrounding whitespace is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTimezone` if the identifier is not a known
    /// IANA zone.
    pub fn try_new(tz: &str) -> Result<Self, CoreError> {
        let trimmed = tz.trim();
        trimmed
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| CoreError::InvalidTimezone(trimmed.to_owned()))
    }

    /// Returns the identifier, e.g. `"America/Mexico_City"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0.name()
    }

    /// Returns the underlying `chrono_tz` zone for date arithmetic.
    #[must_use]
    pub fn to_tz(self) -> Tz {
        self.0
    }

    /// Formats an instant in this zone with a `strftime` pattern.
    #[must_use]
    pub fn format(self, instant: DateTime<Utc>, pattern: &str) -> String {
        instant.with_timezone(&self.0).format(pattern).to_string()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(Tz::UTC)
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timezone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

impl Serialize for Timezone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::try_new(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_valid_timezone_round_trips_its_name() {
        let tz = Timezone::try_new(" Europe/Madrid ").unwrap();
        assert_eq!(tz.as_str(), "Europe/Madrid");
        assert_eq!(tz.to_string(), "Europe/Madrid");
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let err = Timezone::try_new("Mars/Olympus_Mons").unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTimezone("Mars/Olympus_Mons".to_owned())
        );
    }

    #[test]
    fn test_default_is_utc() {
        assert_eq!(Timezone::default().as_str(), "UTC");
    }

    #[test]
    fn test_format_applies_zone_offset() {
        let tz = Timezone::try_new("America/Mexico_City").unwrap();
        let instant = Utc.with_ymd_and_hms(2025, 4, 7, 0, 16, 0).unwrap();
        assert_eq!(tz.format(instant, "%d/%m/%Y %H:%M:%S"), "06/04/2025 18:16:00");
    }

    #[test]
    fn test_deserialize_rejects_unknown_zone() {
        let result: Result<Timezone, _> = serde_json::from_str("\"Nowhere/City\"");
        assert!(result.is_err());
    }
}

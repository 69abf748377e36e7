//! Stored timestamp format
//!
//! Timestamps are written as UTC RFC 3339 with exactly six fractional digits
//! (`2024-01-01T00:00:00.000000Z`), so their string order is their
//! chronological order in every backend.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Current time at the stored precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

/// Accepts any RFC 3339 timestamp, whatever its offset or precision
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_fixed_precision_utc() {
        let parsed: Stamped =
            serde_json::from_str(r#"{"at":"2024-01-01T05:00:00.5+05:00"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"at":"2024-01-01T00:00:00.500000Z"}"#
        );
    }

    #[test]
    fn test_string_order_is_chronological() {
        let instants = [
            "2023-12-31T20:00:00Z",
            "2024-01-01T00:00:00+05:00",
            "2023-12-31T19:00:00.25Z",
            "2024-01-01T00:00:00.000001Z",
        ];
        let mut parsed: Vec<DateTime<Utc>> = instants
            .iter()
            .map(|s| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc))
            .collect();
        let mut formatted: Vec<String> = parsed.iter().map(format).collect();

        parsed.sort();
        formatted.sort();
        assert_eq!(formatted, parsed.iter().map(format).collect::<Vec<_>>());
    }

    #[test]
    fn test_now_round_trips() {
        let stamp = Stamped { at: now() };
        let json = serde_json::to_string(&stamp).unwrap();
        assert_eq!(serde_json::from_str::<Stamped>(&json).unwrap(), stamp);
    }
}

//! Timestamp helpers shared by the local and remote representations.
//!
//! Log records tolerate bad timestamps: a value that is missing or cannot be
//! parsed deserializes to `None` so the record survives and date-bucketed
//! statistics can skip it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Format a timestamp the way every stored and uploaded record carries it
/// (RFC 3339, millisecond precision, `Z` suffix).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp string, accepting RFC 3339, zone-less ISO datetimes
/// (interpreted as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Interpret a JSON value as a timestamp: strings are parsed, integers are
/// epoch milliseconds, anything else is rejected.
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => parse_timestamp(raw),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` fields that must never fail.
///
/// Use together with `#[serde(default)]` so a missing field is also `None`.
pub mod lenient {
    use super::{format_timestamp, timestamp_from_value};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(timestamp_from_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(default, with = "lenient")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_format_matches_iso_millis() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-03-09T07:05:00.000Z");
    }

    #[test]
    fn test_parse_accepts_common_shapes() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-09T07:05:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-09T09:05:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-09T07:05:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-03-09"),
            Some(Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("Invalid Date"), None);
        assert_eq!(parse_timestamp("2025-13-45"), None);
    }

    #[test]
    fn test_lenient_field_never_fails() {
        let bad: Stamped = serde_json::from_str(r#"{"at": "not a date"}"#).unwrap();
        assert!(bad.at.is_none());

        let missing: Stamped = serde_json::from_str("{}").unwrap();
        assert!(missing.at.is_none());

        let wrong_type: Stamped = serde_json::from_str(r#"{"at": true}"#).unwrap();
        assert!(wrong_type.at.is_none());

        let millis: Stamped = serde_json::from_str(r#"{"at": 1741503900000}"#).unwrap();
        assert_eq!(millis.at, Some(Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 0).unwrap()));
    }

    #[test]
    fn test_lenient_serializes_iso() {
        let value = Stamped {
            at: Some(Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 0).unwrap()),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"at":"2025-03-09T07:05:00.000Z"}"#);
    }
}

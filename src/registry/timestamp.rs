//! Timestamp decoding for registry documents
//!
//! Documents written by this crate carry RFC 3339 timestamps. Older
//! documents carry naive ISO 8601 timestamps without an offset
//! (`2024-05-01T10:00:00.123456`); those are read as UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

struct Timestamp(DateTime<Utc>);

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map(Timestamp).map_err(serde::de::Error::custom)
    }
}

fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Timestamp::deserialize(deserializer).map(|ts| ts.0)
}

pub(crate) fn deserialize_option<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Timestamp>::deserialize(deserializer)?.map(|ts| ts.0))
}

pub(crate) fn deserialize_map<'de, D, K>(
    deserializer: D,
) -> Result<BTreeMap<K, DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord,
{
    let map = BTreeMap::<K, Timestamp>::deserialize(deserializer)?;
    Ok(map.into_iter().map(|(k, ts)| (k, ts.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc3339() {
        let ts = parse("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(parse("2024-05-01T10:00:00Z").unwrap(), ts);
    }

    #[test]
    fn test_naive_is_utc() {
        let ts = parse("2024-05-01T10:00:00.123456").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 5, 1));
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.nanosecond(), 123_456_000);

        assert_eq!(parse("2024-05-01T10:00:00").unwrap().nanosecond(), 0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse("yesterday").is_err());
        assert!(parse("2024-05-01").is_err());
    }
}

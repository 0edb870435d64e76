//! Day-granularity timestamps
//!
//! `DayTime` is the activation instant of a schema period. It is written in
//! configuration as a calendar date (`2020-07-31`) and always means midnight
//! UTC of that date when parsed that way. Instants that are not on a midnight
//! are written as RFC 3339 with milliseconds so they read back unchanged.

use crate::schema::error::{SchemaError, SchemaResult};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one hour
pub const MILLIS_IN_HOUR: i64 = 60 * 60 * 1000;

/// Milliseconds in one UTC day
pub const MILLIS_IN_DAY: i64 = 24 * MILLIS_IN_HOUR;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A Unix millisecond timestamp with calendar-day text encoding
///
/// Values built from raw milliseconds are kept as given; only
/// [`DayTime::parse`] guarantees midnight alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayTime(i64);

impl DayTime {
    /// Wrap a Unix timestamp in milliseconds
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Parse a `YYYY-MM-DD` date into midnight UTC of that day
    pub fn parse(s: &str) -> SchemaResult<Self> {
        let date = NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)
            .map_err(|_| SchemaError::InvalidDayTime(s.to_string()))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| SchemaError::InvalidDayTime(s.to_string()))?;
        Ok(Self(Utc.from_utc_datetime(&midnight).timestamp_millis()))
    }

    /// Unix timestamp in milliseconds
    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// Index of the UTC day containing this instant
    pub const fn day_index(&self) -> i64 {
        self.0.div_euclid(MILLIS_IN_DAY)
    }

    /// Truncate to 00:00:00 UTC of the same day
    ///
    /// Saturates at `i64::MIN` for the partial day before it.
    pub const fn day_start(&self) -> Self {
        match self.day_index().checked_mul(MILLIS_IN_DAY) {
            Some(ms) => Self(ms),
            None => Self(i64::MIN),
        }
    }
}

impl From<i64> for DayTime {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl FromStr for DayTime {
    type Err = SchemaError;

    /// Accepts every form `Display` writes: a date, RFC 3339, or `<n>ms`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(day) = Self::parse(s) {
            return Ok(day);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.timestamp_millis()));
        }
        s.strip_suffix("ms")
            .and_then(|ms| ms.parse().ok())
            .map(Self)
            .ok_or_else(|| SchemaError::InvalidDayTime(s.to_string()))
    }
}

impl fmt::Display for DayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp_millis(self.0) {
            Some(dt) if self.0.rem_euclid(MILLIS_IN_DAY) == 0 => write!(f, "{}", dt.format(DAY_FORMAT)),
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl Serialize for DayTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<DayTime>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_midnight_utc() {
        let day = DayTime::parse("2020-07-31").unwrap();
        assert_eq!(day.millis(), 1_596_153_600_000);
        assert_eq!(day, day.day_start());
        assert_eq!(day.to_string(), "2020-07-31");
    }

    #[test]
    fn test_epoch() {
        let day: DayTime = "1970-01-01".parse().unwrap();
        assert_eq!(day.millis(), 0);
        assert_eq!(day.day_index(), 0);
    }

    #[test]
    fn test_raw_millis_not_normalized() {
        let t = DayTime::from_millis(MILLIS_IN_DAY + 5 * MILLIS_IN_HOUR);
        assert_eq!(t.millis(), MILLIS_IN_DAY + 5 * MILLIS_IN_HOUR);
        assert_eq!(t.day_start().millis(), MILLIS_IN_DAY);
        assert_eq!(t.to_string(), "1970-01-02T05:00:00.000Z");
    }

    #[test]
    fn test_negative_day_index_floors() {
        let t = DayTime::from_millis(-1);
        assert_eq!(t.day_index(), -1);
        assert_eq!(t.day_start().to_string(), "1969-12-31");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            DayTime::parse("2020-13-01"),
            Err(SchemaError::InvalidDayTime(_))
        ));
        assert!(DayTime::parse("yesterday").is_err());
    }

    #[test]
    fn test_serde_as_date_string() {
        let day = DayTime::parse("2019-03-06").unwrap();
        let json = serde_json::to_string(&day).unwrap();
        assert_eq!(json, "\"2019-03-06\"");

        let restored: DayTime = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, day);
    }

    #[test]
    fn test_non_midnight_serde_round_trip() {
        let t = DayTime::from_millis(1_596_153_600_000 + 5 * MILLIS_IN_HOUR + 250);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"2020-07-31T05:00:00.250Z\"");

        let restored: DayTime = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, t);
    }

    #[test]
    fn test_out_of_range_round_trip() {
        let t = DayTime::from_millis(i64::MIN);
        assert_eq!(t.to_string(), format!("{}ms", i64::MIN));
        assert_eq!(t.to_string().parse::<DayTime>().unwrap(), t);
        assert!("12xms".parse::<DayTime>().is_err());
    }

    #[test]
    fn test_day_start_saturates() {
        assert_eq!(DayTime::from_millis(i64::MIN).day_start().millis(), i64::MIN);
        let max = DayTime::from_millis(i64::MAX);
        assert_eq!(max.day_start().millis(), i64::MAX - i64::MAX.rem_euclid(MILLIS_IN_DAY));
    }
}

//! Compact duration codec
//!
//! Table periods are written as short unit strings: `1w`, `3d`, `6h`,
//! `1h30m`, `500ms`. Units may be concatenated largest first. Formatting
//! emits weeks only when the value is a whole number of weeks, otherwise the
//! greedy `d h m s ms` decomposition, so `parse(format(d)) == d` for every
//! millisecond-precision duration.

use crate::schema::error::{SchemaError, SchemaResult};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: u64 = 7 * MILLIS_PER_DAY;

/// Unit multipliers in capture-group order of the duration pattern
const UNITS: [u64; 6] = [
    MILLIS_PER_WEEK,
    MILLIS_PER_DAY,
    MILLIS_PER_HOUR,
    MILLIS_PER_MINUTE,
    MILLIS_PER_SECOND,
    1,
];

const DURATION_PATTERN: &str =
    r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?(?:(\d+)ms)?$";

static DURATION_RE: OnceLock<Regex> = OnceLock::new();

fn duration_re() -> SchemaResult<&'static Regex> {
    if let Some(re) = DURATION_RE.get() {
        return Ok(re);
    }

    let re = Regex::new(DURATION_PATTERN).map_err(|e| SchemaError::InvalidDuration(e.to_string()))?;
    // A racing thread may have stored an identical pattern first.
    Ok(DURATION_RE.get_or_init(|| re))
}

/// Parse a compact duration such as `1w`, `24h` or `1d6h`
pub fn parse_duration(s: &str) -> SchemaResult<Duration> {
    let s = s.trim();

    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(SchemaError::InvalidDuration("empty duration".to_string()));
    }

    let caps = duration_re()?
        .captures(s)
        .ok_or_else(|| SchemaError::InvalidDuration(format!("not a valid duration: {:?}", s)))?;

    let mut total: u64 = 0;
    for (idx, unit) in UNITS.iter().enumerate() {
        let Some(m) = caps.get(idx + 1) else {
            continue;
        };
        let amount: u64 = m
            .as_str()
            .parse()
            .map_err(|_| SchemaError::InvalidDuration(format!("number too large in {:?}", s)))?;
        total = amount
            .checked_mul(*unit)
            .and_then(|ms| total.checked_add(ms))
            .ok_or_else(|| SchemaError::InvalidDuration(format!("duration overflows: {:?}", s)))?;
    }

    Ok(Duration::from_millis(total))
}

/// Format a duration in its canonical compact form
///
/// Precision below one millisecond is dropped.
pub fn format_duration(d: Duration) -> String {
    let mut ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);

    if ms == 0 {
        return "0s".to_string();
    }
    if ms % MILLIS_PER_WEEK == 0 {
        return format!("{}w", ms / MILLIS_PER_WEEK);
    }

    let mut out = String::new();
    for (unit, suffix) in [
        (MILLIS_PER_DAY, "d"),
        (MILLIS_PER_HOUR, "h"),
        (MILLIS_PER_MINUTE, "m"),
        (MILLIS_PER_SECOND, "s"),
        (1, "ms"),
    ] {
        let n = ms / unit;
        if n > 0 {
            out.push_str(&format!("{}{}", n, suffix));
            ms -= n * unit;
        }
    }
    out
}

/// Serde adapter for `#[serde(with = "...")]` on `Duration` fields
pub mod compact {
    use super::{format_duration, parse_duration};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if d.subsec_nanos() % 1_000_000 != 0 {
            return Err(serde::ser::Error::custom(format!(
                "duration {:?} has sub-millisecond precision",
                d
            )));
        }
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(CompactVisitor)
    }

    struct CompactVisitor;

    impl<'de> Visitor<'de> for CompactVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration string such as \"1w\", \"24h\" or \"0\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_duration(v).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            if v == 0 {
                Ok(Duration::ZERO)
            } else {
                Err(E::custom(format!("duration {} is missing a unit", v)))
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::custom("duration must not be negative")),
            }
        }
    }
}

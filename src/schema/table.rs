//! Periodic table naming
//!
//! A table family rotates on a fixed period counted from the Unix epoch:
//! the table for period index `i` is `prefix + i`. A zero period means a
//! single static table named exactly `prefix`.
//!
//! ```text
//! period = 1w, prefix = "chunks_"
//!
//!   1970-01-01 ─► chunks_0
//!   2019-01-01 ─► chunks_2556
//!   2020-03-06 ─► chunks_2618
//! ```

use crate::schema::duration::compact;
use crate::schema::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// Tags attached to tables created for a family
///
/// Kept sorted so the text form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Tags {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Parses `key=value,key=value`; the empty string is an empty tag set
impl FromStr for Tags {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tags = BTreeMap::new();
        for kv in s.split(',').map(str::trim).filter(|kv| !kv.is_empty()) {
            let (key, value) = kv
                .split_once('=')
                .ok_or_else(|| SchemaError::InvalidTags(format!("tag must be key=value, got {:?}", kv)))?;
            if key.is_empty() {
                return Err(SchemaError::InvalidTags(format!("empty tag key in {:?}", kv)));
            }
            tags.insert(key.to_string(), value.to_string());
        }
        Ok(Self(tags))
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

/// Configuration of one table family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicTableConfig {
    /// Table name prefix (the whole name when `period` is zero)
    #[serde(default)]
    pub prefix: String,
    /// Rollover period; zero disables rotation
    #[serde(default, with = "compact")]
    pub period: Duration,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl PeriodicTableConfig {
    /// A single non-rotating table
    pub fn fixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// A rotating table family
    pub fn periodic(prefix: impl Into<String>, period: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            period,
            tags: Tags::default(),
        }
    }

    /// Builder method: set tags
    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub(crate) fn is_unset(&self) -> bool {
        *self == Self::default()
    }

    /// Period length in whole milliseconds, 0 when the table does not rotate
    pub fn period_millis(&self) -> i64 {
        i64::try_from(self.period.as_millis()).unwrap_or(i64::MAX)
    }

    /// Whether this family rotates at all
    pub fn is_periodic(&self) -> bool {
        self.period_millis() > 0
    }

    /// Period index containing `timestamp`
    ///
    /// Floors toward negative infinity, so an instant exactly on a boundary
    /// belongs to the period starting there. `None` for static tables.
    pub fn period_index(&self, timestamp: i64) -> Option<i64> {
        let period = self.period_millis();
        (period > 0).then(|| timestamp.div_euclid(period))
    }

    /// Name of the table active at `timestamp` (Unix ms)
    pub fn table_for(&self, timestamp: i64) -> String {
        match self.period_index(timestamp) {
            Some(index) => self.table_name(index),
            None => self.prefix.clone(),
        }
    }

    fn table_name(&self, index: i64) -> String {
        format!("{}{}", self.prefix, index)
    }

    /// Period indices touched by the closed interval `[from, through]`
    ///
    /// `None` for static tables.
    pub fn table_range(&self, from: i64, through: i64) -> Option<RangeInclusive<i64>> {
        let first = self.period_index(from)?;
        let last = self.period_index(through)?;
        Some(first..=last)
    }

    /// Names of every table touched by `[from, through]`, oldest first
    pub fn table_names(&self, from: i64, through: i64) -> Vec<String> {
        if from > through {
            return Vec::new();
        }
        match self.table_range(from, through) {
            Some(range) => range.map(|i| self.table_name(i)).collect(),
            None => vec![self.prefix.clone()],
        }
    }

    /// Check the period is zero or a whole number of days
    pub(crate) fn validate_day_aligned(&self, table: &'static str) -> SchemaResult<()> {
        let day = Duration::from_secs(24 * 60 * 60);
        if self.period.is_zero() || self.period.as_nanos() % day.as_nanos() == 0 {
            return Ok(());
        }
        Err(SchemaError::InvalidTablePeriod {
            table,
            period: crate::schema::duration::format_duration(self.period),
        })
    }
}

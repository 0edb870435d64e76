//! Index addressing buckets
//!
//! A time range is cut at calendar boundaries (days, or hours for the two
//! oldest schemas). Each piece becomes a [`Bucket`] carrying the part of the
//! boundary-aligned window the range covers, as offsets from the window start.
//!
//! ```text
//! from=06:00 day0                    through=12:00 day2
//!   |-------- day0 --------|-------- day1 --------|--- day2 ---|
//!   [6h ............... 24h][0 ............... 24h][0 ..... 12h]
//!        "user:d0"              "user:d1"             "user:d2"
//! ```

use crate::schema::day_time::{MILLIS_IN_DAY, MILLIS_IN_HOUR};
use crate::schema::table::PeriodicTableConfig;
use serde::Serialize;

/// One boundary-aligned slice of an index table for one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Covered start, in ms from the window start
    pub from: i64,
    /// Covered end, in ms from the window start
    pub through: i64,
    /// Index table holding this window
    pub table_name: String,
    /// Per-window, per-tenant index key
    pub hash_key: String,
    /// Window length in ms
    pub bucket_size: u32,
}

impl Bucket {
    /// Covered length in milliseconds
    pub fn covered_millis(&self) -> i64 {
        self.through - self.from
    }

    /// Whether the bucket covers its whole window
    pub fn is_full(&self) -> bool {
        self.from == 0 && self.through == i64::from(self.bucket_size)
    }
}

/// Split `[from, through]` into per-day buckets
///
/// Every day from the one containing `from` up to and including the one
/// containing `through` gets a bucket, so a `through` exactly on midnight
/// yields an empty trailing bucket for that day.
pub fn daily_buckets(
    index_tables: &PeriodicTableConfig,
    from: i64,
    through: i64,
    user_id: &str,
) -> Vec<Bucket> {
    buckets(index_tables, from, through, MILLIS_IN_DAY, |i| {
        format!("{}:d{}", user_id, i)
    })
}

/// Split `[from, through]` into per-hour buckets
///
/// Used by the `v1` and `v2` schemas; hash keys carry the bare hour index.
pub fn hourly_buckets(
    index_tables: &PeriodicTableConfig,
    from: i64,
    through: i64,
    user_id: &str,
) -> Vec<Bucket> {
    buckets(index_tables, from, through, MILLIS_IN_HOUR, |i| {
        format!("{}:{}", user_id, i)
    })
}

fn buckets(
    index_tables: &PeriodicTableConfig,
    from: i64,
    through: i64,
    window: i64,
    hash_key: impl Fn(i64) -> String,
) -> Vec<Bucket> {
    let first = from.div_euclid(window);
    let last = through.div_euclid(window);

    (first..=last)
        .map(|i| {
            // The first window may start before i64::MIN; name its table by `from`.
            let start = i.checked_mul(window).unwrap_or(from);
            Bucket {
                from: if i == first { from.rem_euclid(window) } else { 0 },
                through: if i == last { through.rem_euclid(window) } else { window },
                table_name: index_tables.table_for(start),
                hash_key: hash_key(i),
                bucket_size: window as u32,
            }
        })
        .collect()
}

//! Multi-period schema configuration
//!
//! [`SchemaConfig`] is the ordered list of schema generations. After
//! [`SchemaConfig::validate`] it is read-only and shared by reference; every
//! lookup picks the last period whose `from` is at or before the timestamp.
//!
//! ```text
//! configs:   [ v9 @1970-01-01 ][ v10 @2019-01-02 ][ v11 @2019-03-06 ] ...
//! t = 2019-02-01 ───────────────────────┘
//! ```

use crate::schema::bucket::Bucket;
use crate::schema::error::{SchemaError, SchemaResult};
use crate::schema::period::PeriodConfig;
use serde::{Deserialize, Serialize};

/// Ordered schema generations, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub configs: Vec<PeriodConfig>,
}

/// The part of a range served by one period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange<'a> {
    pub period: &'a PeriodConfig,
    /// Sub-range start (Unix ms, inclusive)
    pub from: i64,
    /// Sub-range end (Unix ms, inclusive)
    pub through: i64,
}

impl SchemaConfig {
    pub fn new(configs: Vec<PeriodConfig>) -> Self {
        Self { configs }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Fill defaults and check every period and their ordering
    ///
    /// Must run once after loading and before any lookup.
    pub fn validate(&mut self) -> SchemaResult<()> {
        if let Err(err) = self.validate_periods() {
            tracing::warn!(error = %err, "schema config rejected");
            return Err(err);
        }

        tracing::info!(
            periods = self.configs.len(),
            latest_schema = self.configs.last().map(|c| c.schema.as_str()).unwrap_or("none"),
            "schema config validated"
        );
        Ok(())
    }

    fn validate_periods(&mut self) -> SchemaResult<()> {
        for i in 0..self.configs.len() {
            let period = &mut self.configs[i];
            period.apply_defaults();
            period.validate()?;

            if let Some(next) = self.configs.get(i + 1) {
                let current = &self.configs[i];
                if current.from >= next.from {
                    return Err(SchemaError::IncreasingFromTime {
                        previous: current.from.to_string(),
                        next: next.from.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Period active at `timestamp` (Unix ms)
    pub fn schema_for_time(&self, timestamp: i64) -> SchemaResult<&PeriodConfig> {
        let period = self
            .configs
            .iter()
            .rev()
            .find(|c| c.from.millis() <= timestamp)
            .ok_or(SchemaError::PeriodNotFound(timestamp))?;

        tracing::debug!(timestamp, schema = %period.schema, from = %period.from, "resolved period");
        Ok(period)
    }

    /// Chunk table holding data written at `timestamp`
    pub fn chunk_table_for(&self, timestamp: i64) -> SchemaResult<String> {
        Ok(self.schema_for_time(timestamp)?.chunk_table_for(timestamp))
    }

    /// Index table holding entries for `timestamp`
    pub fn index_table_for(&self, timestamp: i64) -> SchemaResult<String> {
        Ok(self.schema_for_time(timestamp)?.index_table_for(timestamp))
    }

    /// Index of the period active at `now`, or 0 when none has started yet
    pub fn active_period_index(&self, now: i64) -> usize {
        self.configs
            .iter()
            .rposition(|c| c.from.millis() <= now)
            .unwrap_or(0)
    }

    /// Split `[from, through]` at period activations
    ///
    /// Each piece is clamped to the period's own window, which ends one
    /// millisecond before the next period starts. Time before the first
    /// period is not served by any period and is dropped.
    pub fn periods_for_range(&self, from: i64, through: i64) -> Vec<PeriodRange<'_>> {
        let mut ranges = Vec::new();
        if self.configs.is_empty() || from > through {
            return ranges;
        }

        let first = self.configs.partition_point(|c| c.from.millis() <= from);
        let (mut i, mut start) = match first.checked_sub(1) {
            Some(i) => (i, from),
            None => (0, self.configs[0].from.millis()),
        };
        let end_idx = self.configs.partition_point(|c| c.from.millis() <= through);

        while i < end_idx {
            let next_start = self.configs.get(i + 1).map(|c| c.from.millis());
            let end = match next_start {
                Some(next) => through.min(next - 1),
                None => through,
            };
            ranges.push(PeriodRange {
                period: &self.configs[i],
                from: start,
                through: end,
            });
            if let Some(next) = next_start {
                start = next;
            }
            i += 1;
        }

        ranges
    }

    /// Index buckets for `[from, through]`, each piece bucketed by the
    /// period serving it
    pub fn buckets(&self, from: i64, through: i64, user_id: &str) -> Vec<Bucket> {
        self.periods_for_range(from, through)
            .into_iter()
            .flat_map(|r| r.period.buckets(r.from, r.through, user_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::day_time::{DayTime, MILLIS_IN_DAY};
    use crate::schema::period::{DEFAULT_ROW_SHARDS, STORES_REQUIRING_CHUNK_PREFIX};
    use crate::schema::table::PeriodicTableConfig;
    use std::time::Duration;

    const DAY: Duration = Duration::from_secs(24 * 3600);
    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    fn day(s: &str) -> DayTime {
        DayTime::parse(s).unwrap()
    }

    fn rfc3339(s: &str) -> i64 {
        chrono::DateTime::parse_from_rfc3339(s).unwrap().timestamp_millis()
    }

    fn weekly(from: &str, n: u32) -> PeriodConfig {
        PeriodConfig::new(day(from), "")
            .index_tables(PeriodicTableConfig::periodic(format!("index_{}_", n), WEEK))
            .chunk_tables(PeriodicTableConfig::periodic(format!("chunks_{}_", n), WEEK))
    }

    fn validated(mut cfg: SchemaConfig) -> SchemaResult<SchemaConfig> {
        cfg.validate().map(|_| cfg)
    }

    #[test]
    fn test_chunk_table_for() {
        let cfg = SchemaConfig::new(vec![
            weekly("1970-01-01", 1),
            weekly("2019-01-02", 2),
            weekly("2019-03-06", 3),
        ]);

        let cases = [
            ("1970-01-01T00:00:00Z", "chunks_1_0"),
            ("1970-01-01T00:00:01Z", "chunks_1_0"),
            ("2019-01-01T00:00:00Z", "chunks_1_2556"),
            ("2019-01-01T23:59:59Z", "chunks_1_2556"),
            ("2019-01-02T00:00:00Z", "chunks_2_2556"),
            ("2019-03-06T00:00:00Z", "chunks_3_2565"),
            ("2020-03-06T00:00:00Z", "chunks_3_2618"),
        ];

        for (at, expected) in cases {
            assert_eq!(cfg.chunk_table_for(rfc3339(at)).unwrap(), expected, "at {}", at);
        }
        assert_eq!(
            cfg.index_table_for(rfc3339("2019-01-02T00:00:00Z")).unwrap(),
            "index_2_2556"
        );
    }

    #[test]
    fn test_chunk_table_before_first_period() {
        let cfg = SchemaConfig::new(vec![weekly("2019-01-02", 1)]);
        assert_eq!(
            cfg.chunk_table_for(0),
            Err(SchemaError::PeriodNotFound(0))
        );
        assert!(SchemaConfig::default().schema_for_time(0).is_err());
    }

    #[test]
    fn test_schema_for_time() {
        let t1 = 1_564_358_400_000;
        let t2 = 1_564_444_800_000;
        let cfg = SchemaConfig::new(vec![
            PeriodConfig::new(DayTime::from_millis(t1), "v10")
                .store("grpc-store", "grpc-store")
                .index_tables(PeriodicTableConfig::periodic("index_", WEEK))
                .row_shards(16),
            PeriodConfig::new(DayTime::from_millis(t2), "v10")
                .store("grpc-store", "grpc-store")
                .index_tables(PeriodicTableConfig::periodic("index_", WEEK))
                .row_shards(32),
        ]);

        assert_eq!(cfg.schema_for_time(t2 + 100_000).unwrap(), &cfg.configs[1]);
        assert_eq!(cfg.schema_for_time(t1 + 100_000).unwrap(), &cfg.configs[0]);
        assert_eq!(cfg.schema_for_time(t2).unwrap(), &cfg.configs[1]);
        assert_eq!(cfg.schema_for_time(t2 - 1).unwrap(), &cfg.configs[0]);
        assert_eq!(cfg.schema_for_time(t1 - 1), Err(SchemaError::PeriodNotFound(t1 - 1)));
    }

    #[test]
    fn test_validate_empty_config() {
        assert!(validated(SchemaConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_table_periods() {
        let six_hours = Duration::from_secs(6 * 3600);

        let cfg = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v10")
            .index_tables(PeriodicTableConfig::periodic("", six_hours))]);
        assert!(matches!(
            validated(cfg),
            Err(SchemaError::InvalidTablePeriod { .. })
        ));

        let cfg = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v10")
            .index_tables(PeriodicTableConfig::periodic("", DAY))
            .chunk_tables(PeriodicTableConfig::periodic("", six_hours))]);
        assert!(matches!(
            validated(cfg),
            Err(SchemaError::InvalidTablePeriod { .. })
        ));

        for period in [Duration::ZERO, DAY] {
            let cfg = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v10")
                .index_tables(PeriodicTableConfig::periodic("", period))
                .chunk_tables(PeriodicTableConfig::periodic("", period))]);
            let expected = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v10")
                .row_shards(DEFAULT_ROW_SHARDS)
                .index_tables(PeriodicTableConfig::periodic("", period))
                .chunk_tables(PeriodicTableConfig::periodic("", period))]);
            assert_eq!(validated(cfg), Ok(expected));
        }
    }

    #[test]
    fn test_validate_row_shard_defaults() {
        let cfg = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v10")]);
        let out = validated(cfg).unwrap();
        assert_eq!(out.configs[0].row_shards, 16);

        let cfg = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v11").row_shards(6)]);
        let out = validated(cfg).unwrap();
        assert_eq!(out.configs[0].row_shards, 6);
    }

    #[test]
    fn test_validate_chunk_prefix_required() {
        for store in STORES_REQUIRING_CHUNK_PREFIX {
            let cfg = SchemaConfig::new(vec![PeriodConfig::new(DayTime::default(), "v10")
                .store(*store, *store)
                .index_tables(PeriodicTableConfig::periodic("", DAY))]);
            assert!(
                matches!(validated(cfg), Err(SchemaError::ChunkPrefixNotSet { .. })),
                "{}",
                store
            );
        }
    }

    #[test]
    fn test_validate_from_ordering() {
        let same = SchemaConfig::new(vec![
            PeriodConfig::new(day("1970-01-01"), "v9"),
            PeriodConfig::new(day("1970-01-01"), "v10"),
        ]);
        assert!(matches!(
            validated(same),
            Err(SchemaError::IncreasingFromTime { .. })
        ));

        let reversed = SchemaConfig::new(vec![
            PeriodConfig::new(day("1970-01-02"), "v9"),
            PeriodConfig::new(day("1970-01-01"), "v10"),
        ]);
        assert!(matches!(
            validated(reversed),
            Err(SchemaError::IncreasingFromTime { .. })
        ));

        let ok = SchemaConfig::new(vec![
            PeriodConfig::new(day("1970-01-01"), "v9"),
            PeriodConfig::new(day("1970-01-02"), "v10"),
        ]);
        assert!(validated(ok).is_ok());
    }

    #[test]
    fn test_active_period_index() {
        let cfg = SchemaConfig::new(vec![weekly("2019-01-02", 1), weekly("2019-03-06", 2)]);
        assert_eq!(cfg.active_period_index(0), 0);
        assert_eq!(cfg.active_period_index(day("2019-02-01").millis()), 0);
        assert_eq!(cfg.active_period_index(day("2019-03-06").millis()), 1);
        assert_eq!(cfg.active_period_index(i64::MAX), 1);
    }

    #[test]
    fn test_periods_for_range() {
        let cfg = SchemaConfig::new(vec![
            weekly("1970-01-02", 1),
            weekly("1970-01-04", 2),
            weekly("1970-01-06", 3),
        ]);

        let ranges = cfg.periods_for_range(2 * MILLIS_IN_DAY, 4 * MILLIS_IN_DAY + 10);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].period, &cfg.configs[0]);
        assert_eq!((ranges[0].from, ranges[0].through), (2 * MILLIS_IN_DAY, 3 * MILLIS_IN_DAY - 1));
        assert_eq!(ranges[1].period, &cfg.configs[1]);
        assert_eq!((ranges[1].from, ranges[1].through), (3 * MILLIS_IN_DAY, 4 * MILLIS_IN_DAY + 10));

        // clamped to the first activation
        let ranges = cfg.periods_for_range(0, MILLIS_IN_DAY + 5);
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].from, ranges[0].through), (MILLIS_IN_DAY, MILLIS_IN_DAY + 5));

        // entirely before the first period
        assert!(cfg.periods_for_range(0, 10).is_empty());
        assert!(cfg.periods_for_range(10, 0).is_empty());

        let ranges = cfg.periods_for_range(6 * MILLIS_IN_DAY, 9 * MILLIS_IN_DAY);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].period, &cfg.configs[2]);
    }

    #[test]
    fn test_buckets_across_periods() {
        let cfg = SchemaConfig::new(vec![
            PeriodConfig::new(day("1970-01-01"), "v9")
                .index_tables(PeriodicTableConfig::fixed("old_index")),
            PeriodConfig::new(day("1970-01-02"), "v11")
                .index_tables(PeriodicTableConfig::periodic("index_", DAY)),
        ]);

        let buckets = cfg.buckets(12 * 3_600_000, MILLIS_IN_DAY + 3_600_000, "tenant");
        let keys: Vec<_> = buckets
            .iter()
            .map(|b| (b.table_name.as_str(), b.hash_key.as_str(), b.from, b.through))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("old_index", "tenant:d0", 12 * 3_600_000, MILLIS_IN_DAY - 1),
                ("index_1", "tenant:d1", 0, 3_600_000),
            ]
        );
    }

    #[test]
    fn test_yaml_schema_config() {
        let yaml = r#"
configs:
  - from: "2019-01-02"
    store: cassandra
    object_store: cassandra
    schema: v10
    index:
      prefix: index_
      period: 1w
    chunks:
      prefix: chunks_
      period: 1w
  - from: "2020-07-31"
    store: boltdb-shipper
    object_store: gcs
    schema: v11
    index:
      prefix: loki_index_
      period: 24h
    row_shards: 32
"#;
        let mut cfg: SchemaConfig = serde_yaml::from_str(yaml).unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.configs.len(), 2);
        assert_eq!(cfg.configs[0].row_shards, 16);
        assert_eq!(cfg.configs[1].row_shards, 32);
        assert_eq!(
            cfg.chunk_table_for(day("2019-03-06").millis()).unwrap(),
            "chunks_2565"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_config_is_shareable() {
        assert_send_sync::<SchemaConfig>();
    }

    #[test]
    fn test_buckets_from_earliest_timestamp() {
        let cfg = validated(SchemaConfig::new(vec![PeriodConfig::new(
            DayTime::from_millis(i64::MIN),
            "v9",
        )
        .index_tables(PeriodicTableConfig::periodic("index_", WEEK))]))
        .unwrap();

        let buckets = cfg.buckets(i64::MIN, i64::MIN + 10, "u");
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].covered_millis(), 10);
        assert_eq!(buckets[0].hash_key, format!("u:d{}", i64::MIN.div_euclid(MILLIS_IN_DAY)));
        assert_eq!(cfg.index_table_for(i64::MIN).unwrap(), buckets[0].table_name);
    }
}

//! Schema addressing layer
//!
//! Decides which physical index and chunk tables a timestamp belongs to, and
//! how a time range is cut into per-day index buckets, across any number of
//! schema generations that coexist over time.
//!
//! - **day_time**: `DayTime` activation instants and day constants
//! - **duration**: compact `1w` / `24h` period codec
//! - **table**: periodic table naming (`PeriodicTableConfig`, `Tags`)
//! - **bucket**: day and hour bucketing (`Bucket`)
//! - **period**: one schema generation (`PeriodConfig`)
//! - **config**: the ordered generations (`SchemaConfig`)
//! - **error**: error types
//!
//! # Architecture
//!
//! ```text
//! Chunk path:
//!   timestamp → SchemaConfig::schema_for_time → PeriodConfig → chunk table name
//!
//! Index path:
//!   [from, through] + tenant → periods_for_range → PeriodConfig::buckets → Buckets
//! ```
//!
//! Nothing here performs I/O or holds locks. A validated `SchemaConfig` is
//! shared by reference between any number of callers.
//!
//! # Example
//!
//! ```rust
//! use periodic_schema::schema::{DayTime, PeriodConfig, PeriodicTableConfig, SchemaConfig};
//! use std::time::Duration;
//!
//! let week = Duration::from_secs(7 * 24 * 3600);
//! let mut config = SchemaConfig::new(vec![
//!     PeriodConfig::new(DayTime::parse("2019-01-02").unwrap(), "v11")
//!         .store("cassandra", "cassandra")
//!         .index_tables(PeriodicTableConfig::periodic("index_", week))
//!         .chunk_tables(PeriodicTableConfig::periodic("chunks_", week)),
//! ]);
//! config.validate().unwrap();
//!
//! let at = DayTime::parse("2019-03-06").unwrap().millis();
//! assert_eq!(config.chunk_table_for(at).unwrap(), "chunks_2565");
//! ```

pub mod bucket;
pub mod config;
pub mod day_time;
pub mod duration;
pub mod error;
pub mod period;
pub mod table;

// Re-export commonly used types
pub use bucket::{daily_buckets, hourly_buckets, Bucket};
pub use config::{PeriodRange, SchemaConfig};
pub use day_time::{DayTime, MILLIS_IN_DAY, MILLIS_IN_HOUR};
pub use duration::{format_duration, parse_duration};
pub use error::{SchemaError, SchemaResult};
pub use period::{default_row_shards, PeriodConfig, DEFAULT_ROW_SHARDS, STORES_REQUIRING_CHUNK_PREFIX};
pub use table::{PeriodicTableConfig, Tags};

//! # periodic-schema
//!
//! Schema and addressing layer for a chunk-based time-series store. Maps a
//! timestamp and tenant to the physical index and chunk tables of the schema
//! generation active at that time, and cuts time ranges into per-day index
//! buckets.
//!
//! ## Features
//!
//! - **Periodic tables**: table names rotate on a fixed period since the epoch
//! - **Schema generations**: any number of periods coexist, each with its own
//!   backends, version and table layout, selected by activation day
//! - **Day bucketing**: ranges split at UTC midnights with per-tenant hash keys
//! - **Validation**: one startup pass rejects inconsistent configurations
//!
//! ## Modules
//!
//! - [`schema`]: the addressing layer (no I/O)
//! - [`config`]: configuration file loading
//!
//! ## Quick Start
//!
//! ```rust
//! use periodic_schema::{DayTime, PeriodConfig, PeriodicTableConfig, SchemaConfig};
//! use std::time::Duration;
//!
//! let day = Duration::from_secs(24 * 3600);
//! let mut schema = SchemaConfig::new(vec![
//!     PeriodConfig::new(DayTime::parse("2020-07-31").unwrap(), "v11")
//!         .store("boltdb-shipper", "gcs")
//!         .index_tables(PeriodicTableConfig::periodic("index_", day)),
//! ]);
//! schema.validate().unwrap();
//!
//! let from = DayTime::parse("2020-08-01").unwrap().millis();
//! let buckets = schema.buckets(from, from + 36 * 3_600_000, "tenant-a");
//! assert_eq!(buckets.len(), 2);
//! assert_eq!(buckets[0].table_name, "index_18475");
//! assert_eq!(buckets[0].hash_key, "tenant-a:d18475");
//! ```

pub mod config;
pub mod schema;

// Re-export top-level types for convenience
pub use schema::{
    Bucket, DayTime, PeriodConfig, PeriodRange, PeriodicTableConfig, SchemaConfig, SchemaError,
    SchemaResult, Tags,
};

pub use config::{Config, ConfigError, LoggingConfig};

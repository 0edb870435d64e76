//! Schema layer error types
//!
//! Every failure the addressing layer can report, grouped the way callers
//! handle them: configuration-shape and ordering errors are fatal at
//! startup, lookup and parse errors are returned per request.

use thiserror::Error;

/// Errors that can occur while validating or querying a schema configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Schema string is not one of the supported `vN` generations
    #[error("invalid schema version: {0:?}")]
    InvalidSchemaVersion(String),

    /// Table period must be zero or a whole number of days
    #[error("invalid {table} table period {period}: must be a multiple of 24h")]
    InvalidTablePeriod { table: &'static str, period: String },

    /// Sharded schemas need a non-zero row shard factor
    #[error("must have row_shards > 0 (current: {row_shards}) for schema ({schema})")]
    RowShardsRequired { row_shards: u32, schema: String },

    /// Store kind needs a chunk table prefix to disambiguate storage
    #[error("schema config for chunks is missing the 'prefix' setting (store: {store})")]
    ChunkPrefixNotSet { store: String },

    /// Periods are not sorted by strictly increasing `from`
    #[error("schema config periods must be in increasing from-time order ({previous} is not before {next})")]
    IncreasingFromTime { previous: String, next: String },

    /// No period is active at the requested timestamp
    #[error("no period config found for timestamp {0}")]
    PeriodNotFound(i64),

    /// Schema version suffix is missing or not numeric
    #[error("failed to parse schema version {0:?}")]
    VersionParse(String),

    /// Compact duration string could not be parsed or encoded
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Calendar date string could not be parsed
    #[error("invalid day time {0:?}: expected YYYY-MM-DD")]
    InvalidDayTime(String),

    /// Tag list is not in `key=value,key=value` form
    #[error("invalid tags: {0}")]
    InvalidTags(String),
}

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

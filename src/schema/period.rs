//! Schema periods
//!
//! A [`PeriodConfig`] is one schema generation: the backends, schema version
//! and table layout in force from its `from` day until the next period
//! starts. It names index and chunk tables and expands ranges into buckets.

use crate::schema::bucket::{self, Bucket};
use crate::schema::day_time::DayTime;
use crate::schema::error::{SchemaError, SchemaResult};
use crate::schema::table::PeriodicTableConfig;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Row shard factor applied to sharded schemas left unset
pub const DEFAULT_ROW_SHARDS: u32 = 16;

/// First schema version that shards index rows and needs day-aligned tables
pub const FIRST_SHARDED_VERSION: u32 = 10;

/// Store kinds that share one namespace for chunks and need a chunk prefix
pub const STORES_REQUIRING_CHUNK_PREFIX: &[&str] = &[
    "aws-dynamo",
    "cassandra",
    "bigtable",
    "bigtable-hashed",
    "gcp",
    "gcp-columnkey",
    "grpc-store",
];

/// One schema generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodConfig {
    /// First day this period is active (inclusive)
    pub from: DayTime,
    /// Index store kind
    #[serde(rename = "store", alias = "index_type", default)]
    pub index_type: String,
    /// Chunk store kind; falls back to `index_type` when empty
    #[serde(rename = "object_store", default, skip_serializing_if = "String::is_empty")]
    pub object_type: String,
    /// Schema version tag, `vN`
    #[serde(default)]
    pub schema: String,
    #[serde(rename = "index", default)]
    pub index_tables: PeriodicTableConfig,
    #[serde(rename = "chunks", default, skip_serializing_if = "PeriodicTableConfig::is_unset")]
    pub chunk_tables: PeriodicTableConfig,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub row_shards: u32,

    #[serde(skip)]
    version: OnceLock<u32>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Equality ignores whether the version cache has been filled
impl PartialEq for PeriodConfig {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from
            && self.index_type == other.index_type
            && self.object_type == other.object_type
            && self.schema == other.schema
            && self.index_tables == other.index_tables
            && self.chunk_tables == other.chunk_tables
            && self.row_shards == other.row_shards
    }
}

impl Eq for PeriodConfig {}

impl PeriodConfig {
    /// Create a period starting at `from` with the given schema version
    pub fn new(from: DayTime, schema: impl Into<String>) -> Self {
        Self {
            from,
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// Builder method: set the index and chunk store kinds
    pub fn store(mut self, index_type: impl Into<String>, object_type: impl Into<String>) -> Self {
        self.index_type = index_type.into();
        self.object_type = object_type.into();
        self
    }

    /// Builder method: set the index table family
    pub fn index_tables(mut self, tables: PeriodicTableConfig) -> Self {
        self.index_tables = tables;
        self
    }

    /// Builder method: set the chunk table family
    pub fn chunk_tables(mut self, tables: PeriodicTableConfig) -> Self {
        self.chunk_tables = tables;
        self
    }

    /// Builder method: set the row shard factor
    pub fn row_shards(mut self, row_shards: u32) -> Self {
        self.row_shards = row_shards;
        self
    }

    /// Integer part of the schema tag (`"v11"` → 11)
    ///
    /// The first successful parse is cached; concurrent first reads all
    /// compute the same value.
    pub fn version_as_int(&self) -> SchemaResult<u32> {
        if let Some(v) = self.version.get() {
            return Ok(*v);
        }

        let parsed = self
            .schema
            .strip_prefix('v')
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| SchemaError::VersionParse(self.schema.clone()))?;

        Ok(*self.version.get_or_init(|| parsed))
    }

    /// Store kind used for chunks
    pub fn object_store(&self) -> &str {
        if self.object_type.is_empty() {
            &self.index_type
        } else {
            &self.object_type
        }
    }

    /// Index table active at `timestamp`
    pub fn index_table_for(&self, timestamp: i64) -> String {
        self.index_tables.table_for(timestamp)
    }

    /// Chunk table active at `timestamp`
    pub fn chunk_table_for(&self, timestamp: i64) -> String {
        self.chunk_tables.table_for(timestamp)
    }

    /// Per-day index buckets for `[from, through]`
    pub fn daily_buckets(&self, from: i64, through: i64, user_id: &str) -> Vec<Bucket> {
        bucket::daily_buckets(&self.index_tables, from, through, user_id)
    }

    /// Per-hour index buckets for `[from, through]`
    pub fn hourly_buckets(&self, from: i64, through: i64, user_id: &str) -> Vec<Bucket> {
        bucket::hourly_buckets(&self.index_tables, from, through, user_id)
    }

    /// Whether this schema addresses index rows per hour instead of per day
    pub fn uses_hourly_buckets(&self) -> bool {
        matches!(self.schema.as_str(), "v1" | "v2")
    }

    /// Index buckets using this schema's granularity
    pub fn buckets(&self, from: i64, through: i64, user_id: &str) -> Vec<Bucket> {
        let buckets = if self.uses_hourly_buckets() {
            self.hourly_buckets(from, through, user_id)
        } else {
            self.daily_buckets(from, through, user_id)
        };

        tracing::debug!(
            schema = %self.schema,
            from,
            through,
            buckets = buckets.len(),
            "expanded range into index buckets"
        );

        buckets
    }

    /// Fill the row shard factor when left unset
    pub(crate) fn apply_defaults(&mut self) {
        if self.row_shards == 0 {
            self.row_shards = default_row_shards(&self.schema);
            if self.row_shards > 0 {
                tracing::debug!(
                    schema = %self.schema,
                    from = %self.from,
                    row_shards = self.row_shards,
                    "defaulted row shards"
                );
            }
        }
    }

    /// Check this period on its own
    pub fn validate(&self) -> SchemaResult<()> {
        self.validate_chunk_prefix()?;

        let version = self
            .version_as_int()
            .map_err(|_| SchemaError::InvalidSchemaVersion(self.schema.clone()))?;

        match self.schema.as_str() {
            "v1" | "v2" | "v3" | "v4" | "v5" | "v6" | "v9" => {}
            "v10" | "v11" | "v12" => {
                if self.row_shards == 0 {
                    return Err(SchemaError::RowShardsRequired {
                        row_shards: self.row_shards,
                        schema: self.schema.clone(),
                    });
                }
            }
            _ => return Err(SchemaError::InvalidSchemaVersion(self.schema.clone())),
        }

        if version >= FIRST_SHARDED_VERSION {
            self.index_tables.validate_day_aligned("index")?;
            self.chunk_tables.validate_day_aligned("chunk")?;
        }

        Ok(())
    }

    fn validate_chunk_prefix(&self) -> SchemaResult<()> {
        let store = self.object_store();
        if STORES_REQUIRING_CHUNK_PREFIX.contains(&store) && self.chunk_tables.prefix.is_empty() {
            return Err(SchemaError::ChunkPrefixNotSet {
                store: store.to_string(),
            });
        }
        Ok(())
    }
}

/// Row shards a schema gets when none is configured
pub fn default_row_shards(schema: &str) -> u32 {
    match schema {
        "v1" | "v2" | "v3" | "v4" | "v5" | "v6" | "v9" => 0,
        _ => DEFAULT_ROW_SHARDS,
    }
}

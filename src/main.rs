//! schemactl
//!
//! Command-line interface for inspecting a schema configuration:
//! - Validate a config file
//! - Resolve the period, chunk table or index buckets for a time

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use periodic_schema::config::{generate_default_config, Config, LoggingConfig};
use periodic_schema::schema::{DayTime, PeriodicTableConfig, SchemaConfig, MILLIS_IN_DAY};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Widest `--from`/`--through` span the range commands accept
const MAX_SPAN_MILLIS: i64 = 366 * MILLIS_IN_DAY;

/// Most tables `tables` will list for one period and table family
const MAX_TABLES: i64 = 10_000;

#[derive(Parser)]
#[command(name = "schemactl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect periodic schema configurations")]
#[command(long_about = "schemactl validates schema period configurations and shows which tables and index buckets a time or time range maps to.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML, or YAML by extension). Default locations are searched when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the config file
    Validate,

    /// Show the period active at a time
    SchemaFor {
        /// Time: RFC 3339, YYYY-MM-DD, or Unix milliseconds
        #[arg(long)]
        at: String,
    },

    /// Show the chunk table for a time
    ChunkTable {
        /// Time: RFC 3339, YYYY-MM-DD, or Unix milliseconds
        #[arg(long)]
        at: String,
    },

    /// Show index buckets for a time range
    Buckets {
        #[arg(long)]
        from: String,
        #[arg(long)]
        through: String,
        /// Tenant ID
        #[arg(short, long)]
        user: String,
    },

    /// List index and chunk tables touched by a time range
    Tables {
        #[arg(long)]
        from: String,
        #[arg(long)]
        through: String,
    },

    /// Print a sample config file
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::DefaultConfig = cli.command {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let path = Config::locate(cli.config.clone())?;
    let mut config = Config::read_with_env(&path)?;
    init_logging(&config.logging);

    tracing::debug!("Loaded config from {:?}", path);
    config.schema.validate().context("schema config is invalid")?;

    run(&cli, &config.schema)
}

fn run(cli: &Cli, schema: &SchemaConfig) -> anyhow::Result<()> {
    let json = cli.format == "json";

    match &cli.command {
        Commands::Validate => {
            if json {
                println!("{}", serde_json::json!({ "valid": true, "periods": schema.configs.len() }));
            } else {
                println!("OK: {} period(s)", schema.configs.len());
                for period in &schema.configs {
                    println!(
                        "  {}  {:<4} store={} object_store={} row_shards={}",
                        period.from,
                        period.schema,
                        period.index_type,
                        period.object_store(),
                        period.row_shards
                    );
                }
            }
        }

        Commands::SchemaFor { at } => {
            let t = parse_time(at)?;
            let period = schema.schema_for_time(t)?;
            if json {
                println!("{}", serde_json::to_string_pretty(period)?);
            } else {
                println!(
                    "{} (from {}, store={}, index={}, chunks={})",
                    period.schema,
                    period.from,
                    period.index_type,
                    period.index_tables.prefix,
                    period.chunk_tables.prefix
                );
            }
        }

        Commands::ChunkTable { at } => {
            let t = parse_time(at)?;
            let table = schema.chunk_table_for(t)?;
            if json {
                println!("{}", serde_json::json!({ "timestamp": t, "table": table }));
            } else {
                println!("{}", table);
            }
        }

        Commands::Buckets {
            from,
            through,
            user,
        } => {
            let (from, through) = parse_range(from, through)?;
            let buckets = schema.buckets(from, through, user);
            if json {
                println!("{}", serde_json::to_string_pretty(&buckets)?);
            } else {
                println!("{:<24} | {:<16} | {:>10} | {:>10}", "Table", "Hash key", "From", "Through");
                println!("{}", "-".repeat(70));
                for b in &buckets {
                    println!(
                        "{:<24} | {:<16} | {:>10} | {:>10}",
                        b.table_name, b.hash_key, b.from, b.through
                    );
                }
            }
        }

        Commands::Tables { from, through } => {
            let (from, through) = parse_range(from, through)?;
            let mut rows = Vec::new();
            for r in schema.periods_for_range(from, through) {
                check_table_count(&r.period.index_tables, r.from, r.through)?;
                check_table_count(&r.period.chunk_tables, r.from, r.through)?;
                rows.push((
                    r.period.schema.clone(),
                    r.period.index_tables.table_names(r.from, r.through),
                    r.period.chunk_tables.table_names(r.from, r.through),
                ));
            }

            if json {
                let value: Vec<_> = rows
                    .iter()
                    .map(|(s, i, c)| serde_json::json!({ "schema": s, "index": i, "chunks": c }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                for (schema, index, chunks) in rows {
                    println!("{}: index [{}] chunks [{}]", schema, index.join(", "), chunks.join(", "));
                }
            }
        }

        Commands::DefaultConfig => {}
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(&logging.level));

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));

    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Filter directive covering the library and this binary
fn default_filter(level: &str) -> String {
    format!("periodic_schema={0},schemactl={0}", level)
}

fn parse_time(s: &str) -> anyhow::Result<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(day) = DayTime::parse(s) {
        return Ok(day.millis());
    }
    s.parse::<i64>()
        .with_context(|| format!("Invalid time {:?}: use RFC 3339, YYYY-MM-DD or Unix ms", s))
}

fn parse_range(from: &str, through: &str) -> anyhow::Result<(i64, i64)> {
    let (from, through) = (parse_time(from)?, parse_time(through)?);
    if through > from && through.checked_sub(from).map_or(true, |span| span > MAX_SPAN_MILLIS) {
        bail!(
            "Range {}..{} is wider than {} days; query a narrower range",
            from,
            through,
            MAX_SPAN_MILLIS / MILLIS_IN_DAY
        );
    }
    Ok((from, through))
}

fn check_table_count(tables: &PeriodicTableConfig, from: i64, through: i64) -> anyhow::Result<()> {
    let count = tables
        .table_range(from, through)
        .map_or(1, |range| range.end() - range.start() + 1);
    if count > MAX_TABLES {
        bail!(
            "Range touches {} tables with prefix {:?}; query a narrower range",
            count,
            tables.prefix
        );
    }
    Ok(())
}

//! Metastore CLI
//!
//! Command-line tools for a file-backed metastore.
//!
//! # Commands
//!
//! - `register` - Register a data object in every window its range spans
//! - `windows` - Show the windows a time range maps to
//! - `inspect` - Display the records and layout of one metastore object
//! - `query` - List data objects overlapping a time range
//! - `version` - Show version information

mod commands;
mod error;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use commands::Settings;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Metastore command-line tools.
#[derive(Parser)]
#[command(name = "metastore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory of the object store
    #[arg(global = true, short, long)]
    root: Option<PathBuf>,

    /// Window size in seconds
    #[arg(global = true, long, default_value_t = 12 * 60 * 60)]
    window_secs: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a data object in the metastore
    Register {
        /// Tenant owning the data object
        #[arg(short, long)]
        tenant: String,

        /// Storage path of the data object
        #[arg(short, long)]
        path: String,

        /// Earliest timestamp in the data object (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        min: DateTime<Utc>,

        /// Latest timestamp in the data object (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        max: DateTime<Utc>,

        /// Retries per window after the first attempt
        #[arg(long, default_value_t = 10)]
        max_retries: u32,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show the windows a time range maps to
    Windows {
        /// Tenant to plan for
        #[arg(short, long)]
        tenant: String,

        /// Range start (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        min: DateTime<Utc>,

        /// Range end (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        max: DateTime<Utc>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Display the records and layout of one metastore object
    Inspect {
        /// Path of the metastore object
        window: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List data objects overlapping a time range
    Query {
        /// Tenant to query
        #[arg(short, long)]
        tenant: String,

        /// Range start (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        start: DateTime<Utc>,

        /// Range end (RFC 3339)
        #[arg(long, value_parser = parse_timestamp)]
        end: DateTime<Utc>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show version information
    Version,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp {value:?}: {e}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings {
        root: cli.root,
        window_size: Duration::from_secs(cli.window_secs),
    };

    match cli.command {
        Commands::Register {
            tenant,
            path,
            min,
            max,
            max_retries,
            timeout_secs,
            format,
        } => {
            let args = commands::register::RegisterArgs {
                tenant,
                path,
                min,
                max,
                max_retries,
                timeout: timeout_secs.map(Duration::from_secs),
            };
            commands::register::run(&settings, &args, format)?;
        }
        Commands::Windows {
            tenant,
            min,
            max,
            format,
        } => {
            commands::windows::run(&settings, &tenant, min, max, format)?;
        }
        Commands::Inspect { window, format } => {
            commands::inspect::run(&settings, &window, format)?;
        }
        Commands::Query {
            tenant,
            start,
            end,
            format,
        } => {
            commands::query::run(&settings, &tenant, start, end, format)?;
        }
        Commands::Version => {
            println!("Metastore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Data object format v{}", metastore_codec::FORMAT_VERSION);
        }
    }

    Ok(())
}

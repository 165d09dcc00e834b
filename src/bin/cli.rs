//! flatdb CLI
//!
//! Inspection and maintenance tool for a flatdb data file.
//! Every command prints JSON on stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flatdb::{Config, Connection};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

/// flatdb CLI
#[derive(Parser, Debug)]
#[command(name = "flatdb-cli")]
#[command(about = "Inspect and maintain a flatdb data file")]
#[command(version)]
struct Args {
    /// Data file
    #[arg(short, long, default_value = "./flatdb.txt")]
    file: PathBuf,

    /// Sentinel/I/O timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    /// Debug logging for flatdb
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create (or verify) the data file and print its header
    Init,

    /// List databases
    Dbs,

    /// List the tables of a database
    Tables {
        db: String,
    },

    /// List the records of a table
    Records {
        db: String,
        table: String,
    },

    /// Print one record
    Get {
        db: String,
        table: String,
        key: String,
    },

    /// List lock rows of every connection
    Locks,

    /// Remove every lock row (after a crashed process)
    Unlock,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing/logging (stderr, stdout carries the JSON)
    let default_filter = if args.debug { "info,flatdb=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::builder()
        .path(&args.file)
        .io_timeout_ms(args.timeout_ms)
        .requester("flatdb-cli")
        .build();

    let conn = Connection::open(config)?;

    match args.command {
        Commands::Init => print(&conn.read_store_location()?)?,
        Commands::Dbs => print(&conn.read_all_databases()?)?,
        Commands::Tables { db } => print(&conn.read_all_tables(&db)?)?,
        Commands::Records { db, table } => print(&conn.read_all_records(&db, &table)?)?,
        Commands::Get { db, table, key } => print(&conn.read_record(&db, &table, key)?)?,
        Commands::Locks => print(&conn.read_locks()?)?,
        Commands::Unlock => {
            let purged = conn.purge_locks()?;
            print(&serde_json::json!({ "purged": purged }))?;
        }
    }

    conn.close()?;
    Ok(())
}

fn print<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Duration, Local};
use clap::{ArgGroup, Parser, Subcommand};

use crate::check;
use crate::ingest::{self, Destination, RunContext};
use crate::rebuild;
use crate::rules::import_rules;
use crate::storage::SqliteStore;

#[derive(Parser)]
#[command(name = "logsift")]
#[command(version = "0.1.0")]
#[command(about = "Classify web-server access logs against ignore/delete rules", long_about = None)]
pub struct Cli {
    /// SQLite database holding records and rule lists
    /// (default: $LOGSIFT_DB, then access_logs.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Display verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse access-log files and write classified records to one destination
    #[command(group(
        ArgGroup::new("destination").required(true).args(["out", "err", "outfile", "db", "null"])
    ))]
    Process {
        /// Write the output in CSV format to stdout
        #[arg(short, long)]
        out: bool,
        /// Write the output in CSV format to stderr
        #[arg(short, long)]
        err: bool,
        /// Write the output in CSV format to the specified file
        #[arg(short = 'f', long, value_name = "FILE")]
        outfile: Option<PathBuf>,
        /// Write the output to the database
        #[arg(short, long)]
        db: bool,
        /// Write the output to null, i.e. nowhere
        #[arg(short, long)]
        null: bool,
        /// Input log files, or directories of log files
        #[arg(required = true, value_name = "FILE")]
        inputs: Vec<PathBuf>,
    },
    /// Re-apply the current rules to every stored record
    Rebuild,
    /// Cross-check stored flags against the rule tables
    Check,
    /// Delete stored records older than the retention age
    DeleteOld {
        /// Maximum record age in days
        #[arg(long, default_value_t = 180)]
        max_age_days: u32,
    },
    /// Append rules from a JSON document to the rule tables
    ImportRules {
        /// JSON rules document
        file: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let database = database_path(&cli);
    let store = SqliteStore::open(&database)?;
    log::info!("using database {}", database.display());

    match cli.command {
        Commands::Process { out, err, outfile, db, null, inputs } => {
            let destination = pick_destination(out, err, outfile, db, null);
            let rules = store
                .load_rules()
                .context("unable to load rule lists from the database")?;
            log::info!("rules loaded: {}", rules.summary());
            if cli.verbose {
                eprintln!("Rules: {}", rules.summary());
            }

            let ctx = RunContext { rules: &rules, destination, verbose: cli.verbose };
            let summary = ingest::run(&ctx, &store, &inputs)?;
            if summary.files_aborted > 0 {
                log::warn!(
                    "{} of {} input files abandoned after read errors",
                    summary.files_aborted,
                    summary.files_processed,
                );
            }
        }
        Commands::Rebuild => {
            eprintln!("Rebuilding the database ...");
            let rules = store
                .load_rules()
                .context("unable to load rule lists from the database")?;
            log::info!("rules loaded: {}", rules.summary());

            let start = Instant::now();
            let outcome = rebuild::run(&store, &rules);
            let seconds = start.elapsed().as_secs();
            // Elapsed time is reported even when the pass aborts
            eprintln!("That took {} minutes and {} seconds", seconds / 60, seconds % 60);

            let stats = outcome.context("rebuild pass aborted")?;
            eprintln!(
                "Scanned {} rows: {} updated, {} deleted, {} row errors",
                stats.scanned, stats.updated, stats.deleted, stats.errors,
            );
        }
        Commands::Check => {
            let report = check::run(&store)?;
            if !report.is_clean() {
                log::warn!("{} check(s) reported findings", report.findings);
            }
        }
        Commands::DeleteOld { max_age_days } => {
            let cutoff = (Local::now() - Duration::days(i64::from(max_age_days)))
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            eprintln!("Deleting rows older than {cutoff} ...");
            let deleted = store
                .delete_older_than(&cutoff)
                .context("unable to run the retention delete")?;
            store.commit()?;
            eprintln!("Deleted {deleted} rows.");
        }
        Commands::ImportRules { file } => {
            import_rules(&store, &file)?;
        }
    }

    store.close()?;
    Ok(())
}

fn database_path(cli: &Cli) -> PathBuf {
    cli.database
        .clone()
        .or_else(|| env::var_os("LOGSIFT_DB").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("access_logs.db"))
}

fn pick_destination(
    out: bool,
    err: bool,
    outfile: Option<PathBuf>,
    db: bool,
    null: bool,
) -> Destination {
    if out {
        Destination::Stdout
    } else if err {
        Destination::Stderr
    } else if let Some(path) = outfile {
        Destination::File(path)
    } else if db {
        Destination::Database
    } else {
        debug_assert!(null);
        Destination::Null
    }
}

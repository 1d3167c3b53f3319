//! File ingestion: parse, classify, and write each line of the input files.
//!
//! # Error Handling Strategy
//!
//! - **Value-level parse problems** (bad timestamp, non-numeric size) were
//!   already absorbed by the parser; the record flows through.
//! - **Read-side faults** (unreadable file, structural parse fault) abort
//!   the current file only; remaining inputs are still attempted.
//! - **Write-side faults** (store or output destination) are fatal for the
//!   whole run and propagate as errors.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::parsers::parse_record;
use crate::rules::{RuleSet, classify};
use crate::storage::SqliteStore;

/// Progress marker cadence, in input lines.
const PROGRESS_EVERY: u64 = 1000;

/// Where `process` sends its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// CSV to stdout.
    Stdout,
    /// CSV to stderr.
    Stderr,
    /// CSV to a file.
    File(PathBuf),
    /// Insert into the store.
    Database,
    /// Parse and classify, write nowhere.
    Null,
}

/// Everything a `process` run needs, built once up front and handed to
/// every stage.
pub struct RunContext<'a> {
    pub rules: &'a RuleSet,
    pub destination: Destination,
    pub verbose: bool,
}

/// Per-file outcome.
#[derive(Debug, Default)]
struct FileStats {
    lines_read: u64,
    records_written: u64,
    aborted: bool,
    low_date: Option<String>,
    high_date: Option<String>,
}

/// Whole-run outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub files_processed: u64,
    pub files_aborted: u64,
    pub lines_read: u64,
    pub records_written: u64,
}

/// Process every input in order, writing classified records to the run's
/// destination. Directories among the inputs are expanded to the files
/// they contain, in path order.
pub fn run(ctx: &RunContext, store: &SqliteStore, inputs: &[PathBuf]) -> Result<IngestSummary> {
    let mut writer = open_destination(&ctx.destination)?;
    let mut summary = IngestSummary::default();

    for input in expand_inputs(inputs) {
        let stats = process_file(&input, ctx, store, writer.as_deref_mut())?;
        summary.files_processed += 1;
        if stats.aborted {
            summary.files_aborted += 1;
        }
        summary.lines_read += stats.lines_read;
        summary.records_written += stats.records_written;
    }

    if let Some(writer) = writer.as_mut() {
        writer.flush().context("failed to flush output")?;
    }
    Ok(summary)
}

/// Process one file. Read-side problems mark the file aborted and return
/// `Ok`; only write-side faults return an error.
fn process_file(
    path: &Path,
    ctx: &RunContext,
    store: &SqliteStore,
    mut writer: Option<&mut (dyn Write + '_)>,
) -> Result<FileStats> {
    let mut stats = FileStats::default();
    eprint!("Processing file: {} ", path.display());

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!();
            log::error!("unable to read {}: {err}", path.display());
            stats.aborted = true;
            return Ok(stats);
        }
    };

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!();
                log::error!("error reading {}: {err}", path.display());
                stats.aborted = true;
                break;
            }
        };
        stats.lines_read += 1;

        let record = match parse_record(&line) {
            Ok(record) => record,
            Err(err) => {
                eprintln!();
                log::error!(
                    "{} line {}: {err}; abandoning the rest of this file",
                    path.display(),
                    stats.lines_read,
                );
                stats.aborted = true;
                break;
            }
        };

        if let Some(date) = &record.timestamp {
            if stats.low_date.as_deref().map_or(true, |low| date.as_str() < low) {
                stats.low_date = Some(date.clone());
            }
            if stats.high_date.as_deref().map_or(true, |high| date.as_str() > high) {
                stats.high_date = Some(date.clone());
            }
        }

        let classification = classify(&record, ctx.rules);

        // A record matching a delete rule is written nowhere
        if !classification.delete {
            match writer.as_deref_mut() {
                Some(writer) => {
                    writeln!(writer, "{}", record.to_csv(classification.ignore_reason()))
                        .context("failed to write CSV output")?;
                    stats.records_written += 1;
                }
                None => {
                    if ctx.destination == Destination::Database
                        && store.insert(&record, &classification.ignore)?
                    {
                        stats.records_written += 1;
                    }
                }
            }
        }

        if stats.lines_read % PROGRESS_EVERY == 0 {
            eprint!("*");
            io::stderr().flush().ok();
        }
    }

    // One commit per input file
    if ctx.destination == Destination::Database {
        store.commit()?;
    }

    eprintln!();
    eprintln!("There were {} records read from file.", stats.lines_read);
    eprintln!("There were {} records written to output.", stats.records_written);
    if ctx.verbose {
        if let (Some(low), Some(high)) = (&stats.low_date, &stats.high_date) {
            eprintln!("Date range from {low} to {high}.");
        }
    }
    eprintln!();

    Ok(stats)
}

fn open_destination(destination: &Destination) -> Result<Option<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match destination {
        Destination::Stdout => Box::new(io::stdout()),
        Destination::Stderr => Box::new(io::stderr()),
        Destination::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("unable to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        Destination::Database | Destination::Null => return Ok(None),
    };
    Ok(Some(writer))
}

fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

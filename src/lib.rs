//! logsift - ingest, classify, and persist web-server access logs
//!
//! This library parses combined-format access-log lines into canonical
//! records, classifies each record against mutable ignore/delete rule
//! sets, and persists the outcome idempotently in SQLite. It supports:
//!
//! - Tokenizing and normalizing raw log lines into [`LogRecord`]s
//! - Deriving an ignore-reason bitmask and delete decision per record
//! - Content-addressed record ids for duplicate-safe ingestion
//! - A batch rebuild pass that re-applies the current rules to every
//!   stored record, and a read-only integrity check
//!
//! # Example
//!
//! ```no_run
//! use logsift::parsers::parse_record;
//! use logsift::rules::{RuleSet, classify};
//!
//! let line = r#"10.0.0.1 - - [15/Mar/2024:08:00:00 +0000] "POST /submit HTTP/1.1" 201 512 "-" "curl/7.68.0""#;
//! let record = parse_record(line)?;
//! let outcome = classify(&record, &RuleSet::empty());
//! assert_eq!(outcome.ignore_reason(), 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod check;
pub mod cli;
pub mod ingest;
pub mod models;
pub mod parsers;
pub mod rebuild;
pub mod rules;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use models::LogRecord;
pub use parsers::parse_record;
pub use rules::{Classification, RuleSet, classify};
pub use storage::SqliteStore;

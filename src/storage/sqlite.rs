//! SQLite-backed store for records and rule lists.
//!
//! One database file holds the `access_logs` table and the eight rule
//! tables. The schema is applied idempotently on open, so pointing the
//! tool at a fresh path just works. Writes implicitly open a transaction
//! when none is active; [`SqliteStore::commit`] commits whatever is
//! pending, which is how the ingest and rebuild paths batch their writes.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use crate::models::LogRecord;
use crate::rules::{IgnoreFlags, RuleCategory, RulePurpose, RuleSet};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS access_logs (
    id            TEXT PRIMARY KEY,
    ip            TEXT,
    date          TEXT,
    method        TEXT,
    url           TEXT,
    query_string  TEXT,
    response      INTEGER,
    size          INTEGER,
    server        TEXT,
    server2       TEXT,
    browser       TEXT,
    ignore_reason INTEGER NOT NULL DEFAULT 0,
    ignore_ip     INTEGER NOT NULL DEFAULT 0,
    ignore_url    INTEGER NOT NULL DEFAULT 0,
    ignore_server INTEGER NOT NULL DEFAULT 0,
    ignore_method INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_logs_date ON access_logs(date);
CREATE INDEX IF NOT EXISTS idx_logs_ip ON access_logs(ip);
CREATE INDEX IF NOT EXISTS idx_logs_method ON access_logs(method);
CREATE INDEX IF NOT EXISTS idx_logs_url ON access_logs(url);

CREATE TABLE IF NOT EXISTS ignore_ips     (ip     TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS ignore_urls    (url    TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS ignore_servers (server TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS ignore_methods (method TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS delete_ips     (ip     TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS delete_urls    (url    TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS delete_servers (server TEXT PRIMARY KEY);
CREATE TABLE IF NOT EXISTS delete_methods (method TEXT PRIMARY KEY);
";

/// One row as read back from the store: the record plus the flags it was
/// persisted with, so the rebuild pass can skip rows that are already
/// correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRow {
    pub record: LogRecord,
    pub ignore_reason: u32,
    pub flags: IgnoreFlags,
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if necessary) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    /// A throwaway in-memory store, for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("failed to apply database schema")?;
        Ok(Self { conn })
    }

    /// Insert a record keyed on its content id; a no-op returning `false`
    /// when a row with that id already exists.
    pub fn insert(&self, record: &LogRecord, flags: &IgnoreFlags) -> Result<bool> {
        self.ensure_txn()?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO access_logs (
                 id, ip, date, method, url, query_string, response, size,
                 server, server2, browser,
                 ignore_reason, ignore_ip, ignore_url, ignore_server, ignore_method
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                record.id(),
                blank_to_null(&record.ip),
                record.timestamp.as_deref(),
                blank_to_null(&record.method),
                blank_to_null(&record.url),
                blank_to_null(&record.query_string),
                record.response,
                record.size,
                blank_to_null(&record.referrer),
                blank_to_null(&record.user_agent),
                blank_to_null(&record.browser),
                flags.reason(),
                flags.ip,
                flags.url,
                flags.server,
                flags.method,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Look up one row by id.
    pub fn find_by_id(&self, id: &str) -> Result<Option<ScannedRow>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_ROW} WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], row_to_scanned)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Rewrite only the ignore flags of one row, returning the affected
    /// row count (zero when the id no longer exists).
    pub fn update_flags(&self, id: &str, flags: &IgnoreFlags) -> Result<usize> {
        self.ensure_txn()?;
        let affected = self.conn.execute(
            "UPDATE access_logs
             SET ignore_reason = ?1, ignore_ip = ?2, ignore_url = ?3,
                 ignore_server = ?4, ignore_method = ?5
             WHERE id = ?6",
            params![flags.reason(), flags.ip, flags.url, flags.server, flags.method, id],
        )?;
        Ok(affected)
    }

    /// Delete one row by id, returning the affected row count.
    pub fn delete(&self, id: &str) -> Result<usize> {
        self.ensure_txn()?;
        let affected =
            self.conn.execute("DELETE FROM access_logs WHERE id = ?1", params![id])?;
        Ok(affected)
    }

    /// Delete every row with a date strictly before `cutoff`
    /// (`YYYY-MM-DD HH:MM:SS`); rows without a date are kept.
    pub fn delete_older_than(&self, cutoff: &str) -> Result<usize> {
        self.ensure_txn()?;
        let affected = self
            .conn
            .execute("DELETE FROM access_logs WHERE date < ?1", params![cutoff])?;
        Ok(affected)
    }

    /// Read the next page of rows in ascending id order, strictly after
    /// `after_id` (from the start when `None`).
    ///
    /// Keyset pagination keeps the scan stable while the rebuild pass
    /// deletes rows behind the cursor: every surviving row is visited
    /// exactly once.
    pub fn scan_page(&self, after_id: Option<&str>, limit: usize) -> Result<Vec<ScannedRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_ROW} WHERE (?1 IS NULL OR id > ?1) ORDER BY id LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![after_id, limit as i64], row_to_scanned)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Commit the pending transaction, if any.
    pub fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Commit anything pending and close the connection.
    pub fn close(self) -> Result<()> {
        self.commit()?;
        self.conn.close().map_err(|(_, err)| err.into())
    }

    /// Load the eight rule lists into a case-normalized [`RuleSet`].
    pub fn load_rules(&self) -> Result<RuleSet> {
        Ok(RuleSet::new(
            self.rule_values(RulePurpose::Ignore, RuleCategory::Ip)?,
            self.rule_values(RulePurpose::Ignore, RuleCategory::Url)?,
            self.rule_values(RulePurpose::Ignore, RuleCategory::Server)?,
            self.rule_values(RulePurpose::Ignore, RuleCategory::Method)?,
            self.rule_values(RulePurpose::Delete, RuleCategory::Ip)?,
            self.rule_values(RulePurpose::Delete, RuleCategory::Url)?,
            self.rule_values(RulePurpose::Delete, RuleCategory::Server)?,
            self.rule_values(RulePurpose::Delete, RuleCategory::Method)?,
        ))
    }

    /// Append rule values to one rule table, skipping values already
    /// present. Returns how many were actually added.
    pub fn append_rules(
        &self,
        purpose: RulePurpose,
        category: RuleCategory,
        values: &[String],
    ) -> Result<usize> {
        self.ensure_txn()?;
        let mut stmt = self.conn.prepare(&format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES (?1)",
            rule_table(purpose, category),
            rule_column(category),
        ))?;
        let mut added = 0;
        for value in values {
            added += stmt.execute(params![value])?;
        }
        Ok(added)
    }

    /// Count records whose fields match the category's ignore rules, by
    /// direct comparison with the rule table (case-folded like the
    /// classification engine; prefix semantics for URL and server).
    pub fn count_ignore_matches(&self, category: RuleCategory) -> Result<i64> {
        self.count_rule_matches(RulePurpose::Ignore, category)
    }

    /// Count records carrying the category's ignore flag.
    pub fn count_ignore_flagged(&self, category: RuleCategory) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM access_logs WHERE {} = 1",
            flag_column(category)
        );
        self.conn.query_row(&sql, [], |row| row.get(0)).map_err(Into::into)
    }

    /// Count records that currently match the category's delete rules;
    /// the rebuild pass should have purged these.
    pub fn count_delete_matches(&self, category: RuleCategory) -> Result<i64> {
        self.count_rule_matches(RulePurpose::Delete, category)
    }

    /// Count records whose stored bitmask disagrees with the bitmask
    /// recomputed from their four stored boolean flags.
    pub fn count_reason_mismatches(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM access_logs WHERE
                   (CASE WHEN ignore_ip = 1 THEN 2 ELSE 0 END)
                 + (CASE WHEN ignore_url = 1 THEN 4 ELSE 0 END)
                 + (CASE WHEN ignore_server = 1 THEN 8 ELSE 0 END)
                 + (CASE WHEN ignore_method = 1 THEN 16 ELSE 0 END)
                 <> ignore_reason",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    fn count_rule_matches(&self, purpose: RulePurpose, category: RuleCategory) -> Result<i64> {
        let table = rule_table(purpose, category);
        let predicate = match category {
            RuleCategory::Ip => "lower(a.ip) = lower(r.ip)",
            RuleCategory::Url => "substr(lower(a.url), 1, length(r.url)) = lower(r.url)",
            RuleCategory::Server => {
                "substr(lower(a.server), 1, length(r.server)) = lower(r.server)"
            }
            RuleCategory::Method => "upper(a.method) = upper(r.method)",
        };
        let sql = format!(
            "SELECT COUNT(*) FROM access_logs a
             WHERE EXISTS (SELECT 1 FROM {table} r WHERE {predicate})"
        );
        self.conn.query_row(&sql, [], |row| row.get(0)).map_err(Into::into)
    }

    fn rule_values(&self, purpose: RulePurpose, category: RuleCategory) -> Result<Vec<String>> {
        let column = rule_column(category);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM {} ORDER BY {column}",
            rule_table(purpose, category),
        ))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<String>>>().map_err(Into::into)
    }

    // Writes group into one transaction until the next commit.
    fn ensure_txn(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

const SELECT_ROW: &str = "SELECT id, ip, date, method, url, query_string, response, size,
                                 server, server2, browser,
                                 ignore_reason, ignore_ip, ignore_url, ignore_server, ignore_method
                          FROM access_logs";

fn row_to_scanned(row: &Row<'_>) -> rusqlite::Result<ScannedRow> {
    let record = LogRecord {
        stored_id: Some(row.get(0)?),
        ip: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        ident: String::new(),
        auth_user: String::new(),
        timestamp: row.get(2)?,
        method: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        url: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        query_string: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        http_version: String::new(),
        response: row.get(6)?,
        size: row.get(7)?,
        referrer: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        user_agent: LogRecord::truncate_user_agent(
            row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        ),
        browser: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
    };
    let flags = IgnoreFlags {
        ip: row.get(12)?,
        url: row.get(13)?,
        server: row.get(14)?,
        method: row.get(15)?,
    };
    Ok(ScannedRow { record, ignore_reason: row.get(11)?, flags })
}

fn blank_to_null(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

fn rule_table(purpose: RulePurpose, category: RuleCategory) -> &'static str {
    match (purpose, category) {
        (RulePurpose::Ignore, RuleCategory::Ip) => "ignore_ips",
        (RulePurpose::Ignore, RuleCategory::Url) => "ignore_urls",
        (RulePurpose::Ignore, RuleCategory::Server) => "ignore_servers",
        (RulePurpose::Ignore, RuleCategory::Method) => "ignore_methods",
        (RulePurpose::Delete, RuleCategory::Ip) => "delete_ips",
        (RulePurpose::Delete, RuleCategory::Url) => "delete_urls",
        (RulePurpose::Delete, RuleCategory::Server) => "delete_servers",
        (RulePurpose::Delete, RuleCategory::Method) => "delete_methods",
    }
}

fn rule_column(category: RuleCategory) -> &'static str {
    match category {
        RuleCategory::Ip => "ip",
        RuleCategory::Url => "url",
        RuleCategory::Server => "server",
        RuleCategory::Method => "method",
    }
}

fn flag_column(category: RuleCategory) -> &'static str {
    match category {
        RuleCategory::Ip => "ignore_ip",
        RuleCategory::Url => "ignore_url",
        RuleCategory::Server => "ignore_server",
        RuleCategory::Method => "ignore_method",
    }
}

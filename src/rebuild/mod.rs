//! The rebuild pass: re-apply the current rules to every stored record.
//!
//! Rows that now match a delete rule are removed; rows whose recomputed
//! ignore flags differ from the stored ones are rewritten in place. There
//! is no checkpoint: a restarted pass re-scans from the beginning, which is
//! safe because classification is a deterministic, idempotent function of
//! the current rules and the current stored data.

use std::io::{self, Write};

use anyhow::Result;

use crate::rules::{RuleSet, classify};
use crate::storage::{ScannedRow, SqliteStore};

/// Records fetched per storage round-trip. Tunable, not correctness-
/// relevant.
const PAGE_SIZE: usize = 1000;
/// Commit and emit a progress marker every this many records.
const COMMIT_FREQUENCY: u64 = 1000;
/// Break the progress line every this many records.
const PROGRESS_LINE_FREQUENCY: u64 = 50_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildStats {
    pub scanned: u64,
    pub updated: u64,
    pub deleted: u64,
    /// Rows whose delete or update affected nothing; reported and skipped.
    pub errors: u64,
}

/// Walk every stored record in id order and apply the current rules.
///
/// A single row whose write affects zero rows is reported and the pass
/// continues; a storage fault aborts the whole pass. Writes are batched:
/// one commit per [`COMMIT_FREQUENCY`] records plus a final commit, so a
/// crash loses at most one batch, which the next pass simply redoes.
pub fn run(store: &SqliteStore, rules: &RuleSet) -> Result<RebuildStats> {
    let mut stats = RebuildStats::default();
    let mut after_id: Option<String> = None;

    loop {
        let page = store.scan_page(after_id.as_deref(), PAGE_SIZE)?;
        let Some(last) = page.last() else {
            break;
        };
        after_id = Some(last.record.id());

        for row in &page {
            apply_row_change(store, rules, row, &mut stats)?;
            stats.scanned += 1;

            if stats.scanned % COMMIT_FREQUENCY == 0 {
                store.commit()?;
                eprint!("*");
                io::stderr().flush().ok();
                if stats.scanned % PROGRESS_LINE_FREQUENCY == 0 {
                    eprintln!();
                }
            }
        }
    }

    store.commit()?;
    eprintln!();
    Ok(stats)
}

fn apply_row_change(
    store: &SqliteStore,
    rules: &RuleSet,
    row: &ScannedRow,
    stats: &mut RebuildStats,
) -> Result<()> {
    let id = row.record.id();
    let classification = classify(&row.record, rules);

    if classification.delete {
        if store.delete(&id)? == 1 {
            stats.deleted += 1;
        } else {
            log::error!("delete removed no row for id {id}");
            stats.errors += 1;
        }
        return Ok(());
    }

    // Skip rows whose stored flags are already correct, so a pass under an
    // unchanged rule set writes nothing
    if row.flags == classification.ignore
        && row.ignore_reason == classification.ignore_reason()
    {
        return Ok(());
    }

    if store.update_flags(&id, &classification.ignore)? == 1 {
        stats.updated += 1;
    } else {
        log::error!("flag update affected no row for id {id}");
        stats.errors += 1;
    }
    Ok(())
}

//! Read-only sanity checks of stored flags against the rule tables.
//!
//! Each check compares two independent views of the same fact: what the
//! rule tables say should be flagged or deleted, and what the stored rows
//! actually carry. Findings are reported to the operator; nothing is
//! repaired here — that is the rebuild pass's job.

use anyhow::Result;

use crate::rules::RuleCategory;
use crate::storage::SqliteStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    /// Number of checks that failed.
    pub findings: u64,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.findings == 0
    }
}

/// Run every check, printing results as it goes.
pub fn run(store: &SqliteStore) -> Result<CheckReport> {
    let mut report = CheckReport::default();

    println!("Checking database sanity");
    println!();
    println!("Checking: Do we have any records that should have been deleted?");
    for category in RuleCategory::ALL {
        let count = store.count_delete_matches(category)?;
        print!("- Checking {} ... ", category.label());
        if count == 0 {
            println!("Ok");
        } else {
            report.findings += 1;
            println!();
            eprintln!(
                "**There are {count} rows matching {} delete rules that should have been deleted",
                category.label()
            );
        }
    }

    println!();
    println!("Checking: Do we have any ignore flags set wrong?");
    for category in RuleCategory::ALL {
        let matches = store.count_ignore_matches(category)?;
        let flagged = store.count_ignore_flagged(category)?;
        print!("- Checking {} ... ", category.label());
        if matches == flagged {
            println!("Ok - matched on {matches} rows");
        } else {
            report.findings += 1;
            println!();
            eprintln!(
                "**There were {matches} rows matching {} rules but {flagged} flagged. \
                 They should be the same",
                category.label()
            );
        }
    }

    println!();
    print!("Checking ignore reasons add up ... ");
    let mismatched = store.count_reason_mismatches()?;
    if mismatched == 0 {
        println!("Ok");
    } else {
        report.findings += 1;
        println!();
        eprintln!("**There are {mismatched} ignore reasons that don't add up");
    }

    Ok(report)
}

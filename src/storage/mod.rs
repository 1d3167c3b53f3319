//! SQLite-backed persistence for records and rule lists.
//!
//! The rest of the crate only consumes the store's narrow operation set:
//! insert-by-id (no-op on duplicates), update-flags-by-id, delete-by-id,
//! an ordered paginated scan, commit, the rule-list loader, and the
//! read-only integrity counts.

pub mod sqlite;

pub use sqlite::{ScannedRow, SqliteStore};

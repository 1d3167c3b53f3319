//! Access-log parsing: a character-scanning tokenizer plus field-level
//! normalization into the canonical record type.
//!
//! # Error Handling Strategy
//!
//! Two kinds of fault are kept deliberately distinct:
//!
//! - **Value-level faults** (a timestamp that does not fit the expected
//!   shape, a non-numeric size) are absorbed where they occur: the field
//!   becomes absent and the record is still produced.
//! - **Structural faults** (too few fields for the layout, a request field
//!   with no method separator) return an error, which aborts processing of
//!   the current input file only.

pub mod fields;
pub mod line;

pub use fields::{RequestParts, normalize_timestamp, parse_record, split_request};
pub use line::split_line;

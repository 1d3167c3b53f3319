//! Ignore/delete rule sets and the classification engine.
//!
//! A [`RuleSet`] is loaded once per run from the store and never mutated;
//! [`classify`] is a pure function over one record and that snapshot. The
//! ignore outcome is a bitmask of the four category weights (IP=2, URL=4,
//! SERVER=8, METHOD=16); the delete outcome is a separate boolean.

pub mod classify;
pub mod import;
pub mod ruleset;

pub use classify::{
    Classification, IgnoreFlags, REASON_IP, REASON_METHOD, REASON_SERVER, REASON_URL, classify,
};
pub use import::import_rules;
pub use ruleset::{RuleCategory, RulePurpose, RuleSet};

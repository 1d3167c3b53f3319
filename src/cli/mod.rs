//! Command-line interface definitions and dispatch.

pub mod commands;

pub use commands::{Cli, run};

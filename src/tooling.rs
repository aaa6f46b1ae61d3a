//! Tooling & Integration Layer
//!
//! Command-line surface over the filesystem facade.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};

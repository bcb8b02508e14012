//! Command-line interface for tryon
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point and command dispatch
//! - `commands`: command implementations and helpers

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands};
pub use run::run;

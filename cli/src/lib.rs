//! `brent`: command-line front end for the Brent price analyses.
//!
//! Every subcommand loads its inputs from the paths in [`shared::Config`]
//! (overridable per invocation), prints a text report, and writes SVG charts
//! and JSON model artifacts next to the configured output directories.

pub mod commands;

pub use commands::{run, Cli, Commands, Workspace};

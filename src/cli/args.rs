//! Defines the command-line arguments and subcommands for the tidl CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "tidl",
    version,
    about = "A Thrift IDL parsing and code generation toolkit."
)]
pub struct TidlArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse one file or a directory tree and report diagnostics.
    Check {
        /// A `.thrift` file, or a directory to scan recursively.
        #[arg(required = true)]
        path: PathBuf,
        /// Print each file's concrete syntax tree as JSON.
        #[arg(long)]
        print_cst: bool,
        /// Context lines shown around each diagnostic.
        #[arg(long, value_name = "N", default_value_t = crate::diagnostics::DEFAULT_CONTEXT_LINES)]
        window: usize,
    },
    /// Parse a file and run an output generator over it.
    Gen {
        /// The `.thrift` file to generate from.
        #[arg(required = true)]
        file: PathBuf,
        /// The generator to run: `json` or `ts-enum`.
        #[arg(long = "type", value_name = "GENERATOR", default_value = "json")]
        generator: String,
    },
    /// Show the lowered document AST for a file as JSON.
    Ast {
        /// The `.thrift` file to lower.
        #[arg(required = true)]
        file: PathBuf,
    },
}

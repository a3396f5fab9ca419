//! The tidl command-line interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use walkdir::WalkDir;

use crate::cli::args::{Command, TidlArgs};
use crate::diagnostics::{format_lex_error, format_syntax_error, TidlError, DEFAULT_CONTEXT_LINES};
use crate::generators::{generator_for, lower, GeneratorOutput};
use crate::grammar::{GrammarParseResult, ThriftGrammar};
use crate::timing::time;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = TidlArgs::parse();

    let result = match args.command {
        Command::Check {
            path,
            print_cst,
            window,
        } => handle_check(&path, print_cst, window),
        Command::Gen { file, generator } => handle_gen(&file, &generator),
        Command::Ast { file } => handle_ast(&file),
    };

    if let Err(e) = result {
        // Parse failures were already reported per-file with full windows;
        // everything else surfaces here.
        if !matches!(e, TidlError::Invalid { .. }) {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

/// Recursively collects `.thrift` files under `root`, or returns `root`
/// itself when it names a file. The list is sorted for deterministic output.
fn discover_files(root: &Path) -> Result<Vec<PathBuf>, TidlError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(TidlError::Read {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => TidlError::Io(io),
            None => TidlError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "failed to walk directory",
            )),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map(|e| e == "thrift").unwrap_or(false) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn read_source(path: &Path) -> Result<String, TidlError> {
    fs::read_to_string(path).map_err(|e| TidlError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parses one file, printing its status line and every diagnostic with
/// `window` lines of surrounding context.
fn check_file(path: &Path, print_cst: bool, window: usize) -> Result<GrammarParseResult, TidlError> {
    let source = read_source(path)?;

    let timer = time(Some("parse"));
    let parsed = ThriftGrammar::new().parse(&source);
    let timing = timer.stop();

    output::print_file_status(path, parsed.errors.count(), &timing);
    for error in &parsed.errors.lex {
        output::print_diagnostic(&format_lex_error(&source, error, window));
    }
    for error in &parsed.errors.parse {
        output::print_diagnostic(&format_syntax_error(&source, error, window));
    }

    if print_cst {
        println!("{}", serde_json::to_string_pretty(&parsed.cst)?);
    }

    Ok(parsed)
}

/// Handles the `check` subcommand.
fn handle_check(path: &Path, print_cst: bool, window: usize) -> Result<(), TidlError> {
    let files = discover_files(path)?;
    let mut failed = 0usize;
    let mut error_count = 0usize;

    for file in &files {
        let parsed = check_file(file, print_cst, window)?;
        if !parsed.errors.is_empty() {
            failed += 1;
            error_count += parsed.errors.count();
        }
    }

    if files.len() > 1 {
        output::print_summary(files.len(), failed);
    }

    if failed > 0 {
        return Err(TidlError::Invalid {
            path: path.to_path_buf(),
            count: error_count,
        });
    }
    Ok(())
}

/// Handles the `gen` subcommand.
fn handle_gen(file: &Path, generator_name: &str) -> Result<(), TidlError> {
    let generator = generator_for(generator_name)?;
    let parsed = check_file(file, false, DEFAULT_CONTEXT_LINES)?;
    if !parsed.errors.is_empty() {
        return Err(TidlError::Invalid {
            path: file.to_path_buf(),
            count: parsed.errors.count(),
        });
    }

    let result = generator.process(&parsed.cst)?;
    for output in &result.outputs {
        if let GeneratorOutput::Text {
            contents,
            extension,
        } = output
        {
            output::print_artifact(extension, contents);
        }
    }
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    if !result.errors.is_empty() {
        for error in &result.errors {
            eprintln!("error: {}", error);
        }
        return Err(TidlError::Invalid {
            path: file.to_path_buf(),
            count: result.errors.len(),
        });
    }
    Ok(())
}

/// Handles the `ast` subcommand.
fn handle_ast(file: &Path) -> Result<(), TidlError> {
    let parsed = check_file(file, false, DEFAULT_CONTEXT_LINES)?;
    if !parsed.errors.is_empty() {
        return Err(TidlError::Invalid {
            path: file.to_path_buf(),
            count: parsed.errors.count(),
        });
    }

    let lowering = lower(&parsed.cst);
    println!("{}", serde_json::to_string_pretty(&lowering.document)?);
    Ok(())
}

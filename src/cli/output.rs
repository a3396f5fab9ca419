//! Handles all user-facing output for the CLI.
//!
//! This module is responsible for colorized status lines and diagnostic
//! rendering. By centralizing output logic here, every command reports
//! results the same way.

use std::path::Path;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::diagnostics::FormattedDiagnostic;
use crate::timing::TimingInfo;

/// Prints one per-file status line: the path, pass/fail, error count, and
/// parse time.
pub fn print_file_status(path: &Path, error_count: usize, timing: &TimingInfo) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    if error_count == 0 {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        print!("ok");
    } else {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        print!("failed");
    }
    let _ = stdout.reset();

    print!(" {}", path.display());
    if error_count > 0 {
        print!(" ({} error(s))", error_count);
    }
    println!(" [{}]", timing.display());
}

/// Prints a formatted diagnostic with a colored severity marker.
pub fn print_diagnostic(diagnostic: &FormattedDiagnostic) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    print!("error");
    let _ = stdout.reset();

    // The rendered string starts with its own "error at line ..." header;
    // strip the duplicate word and keep the rest.
    let rendered = diagnostic.to_display_string();
    let rest = rendered.strip_prefix("error").unwrap_or(&rendered);
    println!("{}", rest);
}

/// Prints the closing summary for a multi-file run.
pub fn print_summary(total: usize, failed: usize) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    if failed == 0 {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        println!("{} file(s) checked, all passed", total);
    } else {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        println!("{} file(s) checked, {} failed", total, failed);
    }
    let _ = stdout.reset();
}

/// Prints a generated artifact with a dimmed header naming its extension.
pub fn print_artifact(extension: &str, contents: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    println!("--- {} artifact ---", extension);
    let _ = stdout.reset();
    println!("{}", contents);
}

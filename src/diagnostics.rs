//! Error values produced by the pipeline and the context-window formatter
//! that renders them for humans.
//!
//! Lexical and syntactic problems are ordinary data carried alongside the
//! partial results, never panics: a run over malformed input still yields
//! whatever tokens and tree structure could be recovered, plus these records.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::grammar::strings::{next_indices, previous_count, previous_index, previous_indices};
use crate::grammar::token::Token;

/// A span of input no token pattern matched. Offsets are byte positions,
/// `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexError {
    pub message: String,
    pub start: usize,
    pub end: usize,
}

impl LexError {
    pub fn unexpected(start: usize, end: usize) -> Self {
        LexError {
            message: "Unexpected character sequence".to_string(),
            start,
            end,
        }
    }
}

/// A parse-time expectation failure, recorded with the rule stack that was
/// active when it occurred.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset of the offending token, or of end-of-input.
    pub start: usize,
    pub end: usize,
    /// Grammar rules active at the failure, outermost first.
    pub rule_stack: Vec<String>,
    /// The last token consumed before the failure, when one exists.
    pub previous: Option<Token>,
}

/// A diagnostic rendered against its source window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDiagnostic {
    pub message: String,
    /// Source lines around the failure, the offending line included.
    pub window: String,
    /// Caret line aligned under the offending span within `window`.
    pub carets: String,
    /// Source lines after the offending line, carriage returns stripped.
    pub following: Vec<String>,
    /// 1-based line number of the offending line.
    pub line: usize,
    /// 1-based column of the failure within that line.
    pub column: usize,
    pub rule_stack: Vec<String>,
}

impl FormattedDiagnostic {
    /// Renders the diagnostic for terminal output.
    pub fn to_display_string(&self) -> String {
        let mut out = format!(
            "error at line {}, column {}: {}\n",
            self.line, self.column, self.message
        );
        for line in self.window.lines() {
            out.push_str("  | ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("  | ");
        out.push_str(&self.carets);
        out.push('\n');
        for line in &self.following {
            out.push_str("  | ");
            out.push_str(line);
            out.push('\n');
        }
        if !self.rule_stack.is_empty() {
            out.push_str(&format!("  in rule: {}\n", self.rule_stack.join(" > ")));
        }
        out
    }
}

/// Default number of context lines shown before the offending line.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Builds a source window and caret line for a span of `source`.
///
/// `start`/`end` are byte offsets with `end` exclusive. The window covers up
/// to `context_lines` lines before the offending line plus the line itself,
/// with up to `context_lines` following lines collected separately; the
/// caret run covers the span, clamped to the line and never shorter than
/// one caret.
pub fn format_span(
    source: &str,
    start: usize,
    end: usize,
    message: &str,
    rule_stack: Vec<String>,
    context_lines: usize,
) -> FormattedDiagnostic {
    let start = start.min(source.len());
    let end = end.max(start).min(source.len());

    let line_start = previous_index(source, b'\n', start.saturating_sub(1))
        .filter(|_| start > 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    let window_start = if line_start == 0 {
        0
    } else {
        let breaks = previous_indices(source, b'\n', line_start - 1, context_lines + 1);
        match breaks.last() {
            Some(&i) if breaks.len() > context_lines => i + 1,
            _ => 0,
        }
    };

    let line_end = source[start..]
        .find('\n')
        .map(|i| start + i)
        .unwrap_or(source.len());

    // Carriage returns never render usefully in a terminal window.
    let window = source[window_start..line_end].replace('\r', "");

    let column = start - line_start + 1;
    let line = previous_count(source, b'\n', start) + 1;

    // A trailing `\r` on the offending line is trivia, not part of the span.
    let caret_limit = if line_end > start && source.as_bytes()[line_end - 1] == b'\r' {
        line_end - 1
    } else {
        line_end
    };
    let caret_span = (end - start)
        .max(1)
        .min(caret_limit.saturating_sub(start).max(1));
    let mut carets = " ".repeat(column - 1);
    carets.push_str(&"^".repeat(caret_span));

    FormattedDiagnostic {
        message: message.to_string(),
        window,
        carets,
        following: following_lines(source, line_end, context_lines),
        line,
        column,
        rule_stack,
    }
}

/// Formats a lexical error against its source, with `context_lines` of
/// context on either side of the offending line.
pub fn format_lex_error(source: &str, err: &LexError, context_lines: usize) -> FormattedDiagnostic {
    format_span(source, err.start, err.end, &err.message, Vec::new(), context_lines)
}

/// Formats a syntax error against its source.
pub fn format_syntax_error(
    source: &str,
    err: &SyntaxError,
    context_lines: usize,
) -> FormattedDiagnostic {
    format_span(
        source,
        err.start,
        err.end,
        &err.message,
        err.rule_stack.clone(),
        context_lines,
    )
}

/// Up to `count` lines after the line break at or past `end`, carriage
/// returns stripped.
pub fn following_lines(source: &str, end: usize, count: usize) -> Vec<String> {
    let end = end.min(source.len());
    let breaks = next_indices(source, b'\n', end, count + 1);
    let mut lines = Vec::new();
    let mut cursor = match breaks.first() {
        Some(&i) => i + 1,
        None => return lines,
    };
    for &b in breaks.iter().skip(1) {
        lines.push(source[cursor..b].replace('\r', ""));
        cursor = b + 1;
    }
    if lines.len() < count && cursor < source.len() {
        lines.push(source[cursor..].replace('\r', ""));
    }
    lines
}

/// Top-level failures of the command-line surface.
#[derive(Debug, Error)]
pub enum TidlError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{count} error(s) in {path}")]
    Invalid { path: PathBuf, count: usize },

    #[error("unknown generator `{0}`")]
    UnknownGenerator(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "line one\nline two\nline three\nline four\nline five";

    #[test]
    fn window_includes_context_and_offending_line() {
        let start = SOURCE.find("three").unwrap();
        let d = format_span(SOURCE, start, start + 5, "boom", Vec::new(), 3);
        assert_eq!(d.window, "line one\nline two\nline three");
        assert_eq!(d.line, 3);
        assert_eq!(d.column, 6);
        assert_eq!(d.carets, "     ^^^^^");
    }

    #[test]
    fn window_clamps_at_start_of_source() {
        let d = format_span(SOURCE, 0, 4, "boom", Vec::new(), 3);
        assert_eq!(d.window, "line one");
        assert_eq!(d.line, 1);
        assert_eq!(d.column, 1);
        assert_eq!(d.carets, "^^^^");
    }

    #[test]
    fn context_is_limited_to_requested_lines() {
        let start = SOURCE.find("five").unwrap();
        let d = format_span(SOURCE, start, start + 4, "boom", Vec::new(), 1);
        assert_eq!(d.window, "line four\nline five");
        assert_eq!(d.line, 5);
    }

    #[test]
    fn zero_width_span_still_gets_one_caret() {
        let start = SOURCE.find("two").unwrap();
        let d = format_span(SOURCE, start, start, "boom", Vec::new(), 1);
        assert_eq!(d.carets.matches('^').count(), 1);
        assert_eq!(d.window, "line one\nline two");
    }

    #[test]
    fn span_at_end_of_input() {
        let d = format_span(SOURCE, SOURCE.len(), SOURCE.len(), "eof", Vec::new(), 2);
        assert_eq!(d.line, 5);
        assert_eq!(d.column, "line five".len() + 1);
    }

    #[test]
    fn following_lines_stop_at_the_requested_count() {
        let start = SOURCE.find("one").unwrap();
        let d = format_span(SOURCE, start, start + 3, "boom", Vec::new(), 1);
        assert_eq!(d.following, vec!["line two".to_string()]);
    }

    #[test]
    fn final_line_has_no_following_context() {
        let start = SOURCE.find("five").unwrap();
        let d = format_span(SOURCE, start, start + 4, "boom", Vec::new(), 2);
        assert!(d.following.is_empty());
    }

    #[test]
    fn caret_span_excludes_a_trailing_carriage_return() {
        let source = "bad\r\nnext line\r\n";
        let d = format_span(source, 0, 4, "boom", Vec::new(), 1);
        assert_eq!(d.window, "bad");
        assert_eq!(d.carets, "^^^");
        assert_eq!(d.following, vec!["next line".to_string()]);
    }

    #[test]
    fn display_string_carries_rule_stack() {
        let d = format_span(
            SOURCE,
            0,
            4,
            "boom",
            vec!["root".to_string(), "definition".to_string()],
            0,
        );
        let text = d.to_display_string();
        assert!(text.contains("in rule: root > definition"));
        assert!(text.contains("line 1, column 1"));
    }
}

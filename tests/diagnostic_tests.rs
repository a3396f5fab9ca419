// Diagnostic rendering tests: errors carry usable positions, windows, and
// rule context when formatted against the original source.

use tidl::diagnostics::{format_lex_error, format_syntax_error, DEFAULT_CONTEXT_LINES};
use tidl::ThriftGrammar;

#[test]
fn syntax_error_reports_line_and_column() {
    let source = "namespace rs demo\nstruct S {\n  1: i32\n}\n";
    let parsed = ThriftGrammar::new().parse(source);
    assert_eq!(parsed.errors.parse.len(), 1);

    let rendered = format_syntax_error(source, &parsed.errors.parse[0], DEFAULT_CONTEXT_LINES);
    assert_eq!(rendered.line, 4);
    assert!(rendered.message.contains("Identifier"));
    assert!(rendered.window.contains("1: i32"));
    assert!(rendered.carets.contains('^'));
}

#[test]
fn syntax_error_carries_the_rule_stack() {
    let source = "struct S { 1: i32 }";
    let parsed = ThriftGrammar::new().parse(source);
    let error = &parsed.errors.parse[0];
    assert!(error.rule_stack.iter().any(|r| r == "Field"));
    assert!(error.rule_stack.iter().any(|r| r == "Struct"));

    let display = format_syntax_error(source, error, DEFAULT_CONTEXT_LINES).to_display_string();
    assert!(display.contains("in rule:"));
    assert!(display.contains("Struct"));
}

#[test]
fn lex_error_merges_a_run_of_unmatched_characters() {
    let source = "struct S { 1: i32 x } \u{1F600}\u{1F600}";
    let parsed = ThriftGrammar::new().parse(source);
    assert_eq!(parsed.errors.lex.len(), 1);

    let error = &parsed.errors.lex[0];
    assert_eq!(error.end - error.start, 8); // two 4-byte scalars, one span

    let rendered = format_lex_error(source, error, DEFAULT_CONTEXT_LINES);
    assert_eq!(rendered.line, 1);
    assert!(rendered.message.contains("Unexpected"));
}

#[test]
fn end_of_input_errors_point_past_the_last_token() {
    let source = "struct S {";
    let parsed = ThriftGrammar::new().parse(source);
    assert!(!parsed.errors.parse.is_empty());

    let error = parsed.errors.parse.last().unwrap();
    assert!(error.message.contains("end of input"));
    let rendered = format_syntax_error(source, error, DEFAULT_CONTEXT_LINES);
    assert_eq!(rendered.line, 1);
}

#[test]
fn multiple_definitions_report_independent_errors() {
    let source = "struct A { 1: i32 }\nstruct B { 2: string }\nenum C { X }";
    let parsed = ThriftGrammar::new().parse(source);
    assert_eq!(parsed.errors.parse.len(), 2);
    // The recovered tail still parses.
    assert!(parsed.errors.lex.is_empty());

    let first = format_syntax_error(source, &parsed.errors.parse[0], DEFAULT_CONTEXT_LINES);
    let second = format_syntax_error(source, &parsed.errors.parse[1], DEFAULT_CONTEXT_LINES);
    assert_eq!(first.line, 1);
    assert_eq!(second.line, 2);
}

#[test]
fn windows_include_following_context_lines() {
    let source = "struct S {\n  1: i32\n}\nenum After { A }\nconst i32 N = 1\n";
    let parsed = ThriftGrammar::new().parse(source);
    assert!(!parsed.errors.parse.is_empty());

    let rendered = format_syntax_error(source, &parsed.errors.parse[0], 2);
    assert_eq!(
        rendered.following,
        vec!["enum After { A }".to_string(), "const i32 N = 1".to_string()]
    );

    let display = rendered.to_display_string();
    let caret_pos = display.find('^').unwrap();
    assert!(display[caret_pos..].contains("enum After"));
}

#[test]
fn crlf_sources_render_without_carriage_returns() {
    let source = "struct A {\r\n  1: i32\r\n}\r\nenum B { X }\r\n";
    let parsed = ThriftGrammar::new().parse(source);
    assert!(!parsed.errors.parse.is_empty());

    let rendered = format_syntax_error(source, &parsed.errors.parse[0], DEFAULT_CONTEXT_LINES);
    assert!(rendered.window.contains("1: i32"));
    assert!(!rendered.window.contains('\r'));
    assert!(rendered.following.iter().all(|l| !l.contains('\r')));
    assert!(!rendered.to_display_string().contains('\r'));
}

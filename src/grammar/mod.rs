//! Thrift IDL grammar: token catalog, lexer, and CST parser.
//!
//! [`ThriftGrammar`] is the single entry point: one call takes source text
//! through tokenization and parsing and returns the recovered tree together
//! with every lexical and syntactic error. Errors are data, not exits; a
//! document is valid exactly when both error lists are empty.

pub mod comments;
pub mod cst;
pub mod lexer;
pub mod parser;
pub mod strings;
pub mod token;
pub mod types;

use crate::diagnostics::{LexError, SyntaxError};

use self::cst::CstNode;

/// Errors from both pipeline stages, kept separate so callers can tell a
/// malformed token from a malformed construct.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseErrors {
    pub lex: Vec<LexError>,
    pub parse: Vec<SyntaxError>,
}

impl ParseErrors {
    pub fn is_empty(&self) -> bool {
        self.lex.is_empty() && self.parse.is_empty()
    }

    pub fn count(&self) -> usize {
        self.lex.len() + self.parse.len()
    }
}

/// Outcome of a full lex-and-parse pass. A root is always present, covering
/// whatever structure survived recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarParseResult {
    pub cst: CstNode,
    pub errors: ParseErrors,
}

/// Facade over the lexer and parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThriftGrammar;

impl ThriftGrammar {
    pub fn new() -> Self {
        ThriftGrammar
    }

    /// Runs the full pipeline over `text`. Never fails; inspect
    /// [`GrammarParseResult::errors`] for problems.
    pub fn parse(&self, text: &str) -> GrammarParseResult {
        let lexed = lexer::tokenize(text);
        let parsed = parser::parse(lexed.tokens);
        GrammarParseResult {
            cst: parsed.root,
            errors: ParseErrors {
                lex: lexed.errors,
                parse: parsed.errors,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_document_has_no_errors() {
        let result = ThriftGrammar::new().parse("struct A { 1: i32 x }");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn both_error_channels_are_reported() {
        let result = ThriftGrammar::new().parse("struct A { 1: @ i32 x }\nconst i32 B = \"s\"");
        assert_eq!(result.errors.lex.len(), 1);
        assert!(!result.errors.parse.is_empty());
        assert!(result.errors.count() >= 2);
    }

    #[test]
    fn empty_input_yields_a_root() {
        let result = ThriftGrammar::new().parse("");
        assert!(result.errors.is_empty());
        assert!(result.cst.as_rule().is_some());
    }
}

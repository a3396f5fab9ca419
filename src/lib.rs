pub use crate::diagnostics::{FormattedDiagnostic, LexError, SyntaxError, TidlError};
pub use crate::grammar::{GrammarParseResult, ParseErrors, ThriftGrammar};

pub mod ast;
pub mod cli;
pub mod diagnostics;
pub mod generators;
pub mod grammar;
pub mod timing;

//! Lexical token catalog for the Thrift IDL.
//!
//! Every token the lexer can produce is declared here, in the precedence
//! order the scanner attempts them. Reference: https://thrift.apache.org/docs/idl
//!
//! Two quirks of the language shape the catalog:
//!
//! - keywords are also valid identifier prefixes (`optionalFoo`), so every
//!   keyword declares the identifier token as its longer alternative and the
//!   scanner resolves with longest-match-wins rather than plain ordering;
//! - `1.5` must not lex as the integer `1` followed by garbage, so double
//!   patterns are attempted before integer patterns, and hex constants are
//!   the longer alternative of plain integers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Every lexical token kind the scanner can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Trivia
    Whitespace,
    LineTerminator,
    // Comments
    SingleLineComment,
    DocComment,
    BlockComment,
    // Literals
    Identifier,
    StringLiteral,
    HexConst,
    IntegerConst,
    DoubleConst,
    BooleanConst,
    // Structure
    Assignment,
    Colon,
    Semi,
    Comma,
    LParen,
    RParen,
    LCurly,
    RCurly,
    LBracket,
    RBracket,
    LTemplate,
    RTemplate,
    Wildcard,
    Ampersand,
    // Headers
    Include,
    CppInclude,
    Namespace,
    // Definitions
    Typedef,
    Const,
    Struct,
    Union,
    Enum,
    SEnum,
    Service,
    Exception,
    // Keywords
    Extends,
    Throws,
    OneWay,
    Optional,
    Required,
    CppType,
    // Types
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Binary,
    String,
    SList,
    List,
    Set,
    Map,
    // Special
    Void,
}

/// Logical token families accepted interchangeably by list-like rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// `;` and `,`. Thrift accepts either as an element separator.
    ListSeparator,
}

impl TokenKind {
    /// Category tags for this kind. Grammar rules match the family instead
    /// of enumerating each member.
    pub fn categories(self) -> &'static [Category] {
        match self {
            TokenKind::Semi | TokenKind::Comma => &[Category::ListSeparator],
            _ => &[],
        }
    }

    pub fn in_category(self, category: Category) -> bool {
        self.categories().contains(&category)
    }

    /// Human-readable label used by diagnostics ("=" rather than "Assignment").
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::Assignment => "=",
            TokenKind::Colon => ":",
            TokenKind::Semi => ";",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LCurly => "{",
            TokenKind::RCurly => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LTemplate => "<",
            TokenKind::RTemplate => ">",
            TokenKind::Wildcard => "*",
            TokenKind::Ampersand => "&",
            TokenKind::Whitespace => "Whitespace",
            TokenKind::LineTerminator => "LineTerminator",
            TokenKind::SingleLineComment => "SingleLineComment",
            TokenKind::DocComment => "DocComment",
            TokenKind::BlockComment => "BlockComment",
            TokenKind::Identifier => "Identifier",
            TokenKind::StringLiteral => "StringLiteral",
            TokenKind::HexConst => "HexConst",
            TokenKind::IntegerConst => "IntegerConst",
            TokenKind::DoubleConst => "DoubleConst",
            TokenKind::BooleanConst => "BooleanConst",
            TokenKind::Include => "include",
            TokenKind::CppInclude => "cpp_include",
            TokenKind::Namespace => "namespace",
            TokenKind::Typedef => "typedef",
            TokenKind::Const => "const",
            TokenKind::Struct => "struct",
            TokenKind::Union => "union",
            TokenKind::Enum => "enum",
            TokenKind::SEnum => "senum",
            TokenKind::Service => "service",
            TokenKind::Exception => "exception",
            TokenKind::Extends => "extends",
            TokenKind::Throws => "throws",
            TokenKind::OneWay => "oneway",
            TokenKind::Optional => "optional",
            TokenKind::Required => "required",
            TokenKind::CppType => "cpp_type",
            TokenKind::Bool => "bool",
            TokenKind::Byte => "byte",
            TokenKind::I16 => "i16",
            TokenKind::I32 => "i32",
            TokenKind::I64 => "i64",
            TokenKind::Double => "double",
            TokenKind::Binary => "binary",
            TokenKind::String => "string",
            TokenKind::SList => "slist",
            TokenKind::List => "list",
            TokenKind::Set => "set",
            TokenKind::Map => "map",
            TokenKind::Void => "void",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed value computed from a token image at lex time, so later stages never
/// re-parse the matched text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Payload {
    Int(i64),
    Double(f64),
    Bool(bool),
    Text(std::string::String),
}

/// A single lexical unit: kind, matched image, byte span, optional payload.
///
/// `end` is exclusive. Tokens are immutable once the lexer emits them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub image: std::string::String,
    pub start: usize,
    pub end: usize,
    pub payload: Option<Payload>,
}

impl Token {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn text_payload(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int_payload(&self) -> Option<i64> {
        match self.payload {
            Some(Payload::Int(v)) => Some(v),
            _ => None,
        }
    }
}

type PayloadFn = fn(&str) -> Option<Payload>;

/// Declarative description of one token: pattern, alternatives, extraction.
struct TokenSpec {
    kind: TokenKind,
    /// Pattern matched at the current scan position (anchored at compile).
    pattern: &'static str,
    /// Kind to retry when it matches a strictly longer span at the same
    /// offset (keyword vs. identifier, integer vs. hex).
    longer_alt: Option<TokenKind>,
    payload: Option<PayloadFn>,
    /// Trivia kinds are matched but never emitted into the stream.
    skipped: bool,
}

pub(crate) struct CompiledSpec {
    pub kind: TokenKind,
    pub regex: Regex,
    pub longer_alt: Option<TokenKind>,
    pub payload: Option<PayloadFn>,
    pub skipped: bool,
}

/// The validated, compiled token catalog in scan precedence order.
pub(crate) struct Catalog {
    pub specs: Vec<CompiledSpec>,
    by_kind: HashMap<TokenKind, usize>,
}

impl Catalog {
    pub fn spec_for(&self, kind: TokenKind) -> &CompiledSpec {
        &self.specs[self.by_kind[&kind]]
    }
}

fn single_line_comment_payload(image: &str) -> Option<Payload> {
    let marker_len = if image.starts_with("//") { 2 } else { 1 };
    Some(Payload::Text(image[marker_len..].to_string()))
}

fn doc_comment_payload(image: &str) -> Option<Payload> {
    Some(Payload::Text(image[3..image.len() - 2].to_string()))
}

fn block_comment_payload(image: &str) -> Option<Payload> {
    Some(Payload::Text(image[2..image.len() - 2].to_string()))
}

fn string_literal_payload(image: &str) -> Option<Payload> {
    Some(Payload::Text(image[1..image.len() - 1].to_string()))
}

fn integer_payload(image: &str) -> Option<Payload> {
    // The pattern permits a trailing exponent ("1e5"); the integer value is
    // the leading decimal digits, matching the original lexer.
    let digits_end = image
        .char_indices()
        .find(|(idx, c)| *idx > 0 && !c.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(image.len());
    image[..digits_end].parse::<i64>().ok().map(Payload::Int)
}

fn hex_payload(image: &str) -> Option<Payload> {
    let (sign, rest) = match image.as_bytes()[0] {
        b'-' => (-1, &image[1..]),
        b'+' => (1, &image[1..]),
        _ => (1, image),
    };
    i64::from_str_radix(rest.trim_start_matches("0x"), 16)
        .ok()
        .map(|v| Payload::Int(sign * v))
}

fn double_payload(image: &str) -> Option<Payload> {
    image.parse::<f64>().ok().map(Payload::Double)
}

fn boolean_payload(image: &str) -> Option<Payload> {
    Some(Payload::Bool(image == "true"))
}

fn keyword(kind: TokenKind) -> TokenSpec {
    TokenSpec {
        kind,
        pattern: kind.label(),
        longer_alt: Some(TokenKind::Identifier),
        payload: None,
        skipped: false,
    }
}

fn punct(kind: TokenKind, pattern: &'static str) -> TokenSpec {
    TokenSpec {
        kind,
        pattern,
        longer_alt: None,
        payload: None,
        skipped: false,
    }
}

/// Scan precedence order. First successful match wins, subject to the
/// longer-alternative retry.
fn token_order() -> Vec<TokenSpec> {
    use TokenKind::*;

    vec![
        // Trivia
        TokenSpec {
            kind: Whitespace,
            pattern: r"[ \t]+",
            longer_alt: None,
            payload: None,
            skipped: true,
        },
        // Comments. Doc must be attempted before plain block comments, or
        // `/** ... */` would be misclassified.
        TokenSpec {
            kind: DocComment,
            pattern: r"/\*\*(?s:.)*?\*/",
            longer_alt: None,
            payload: Some(doc_comment_payload),
            skipped: false,
        },
        TokenSpec {
            kind: BlockComment,
            pattern: r"/\*(?s:.)*?\*/",
            longer_alt: None,
            payload: Some(block_comment_payload),
            skipped: false,
        },
        TokenSpec {
            kind: SingleLineComment,
            pattern: r"(//|#)[^\r\n]*",
            longer_alt: None,
            payload: Some(single_line_comment_payload),
            skipped: false,
        },
        TokenSpec {
            kind: LineTerminator,
            pattern: r"\n\r|\r|\n",
            longer_alt: None,
            payload: None,
            skipped: true,
        },
        // Structure
        punct(Assignment, "="),
        punct(Colon, ":"),
        punct(Semi, ";"),
        punct(Comma, ","),
        punct(LParen, r"\("),
        punct(RParen, r"\)"),
        punct(LTemplate, "<"),
        punct(RTemplate, ">"),
        punct(LBracket, r"\["),
        punct(RBracket, r"\]"),
        punct(LCurly, r"\{"),
        punct(RCurly, r"\}"),
        punct(Ampersand, "&"), // recursive struct references
        punct(Wildcard, r"\*"), // namespace scope wildcard
        // Constants. Boolean literals can extend into identifiers; doubles
        // are ambiguous with integers so they go first; hex is the longer
        // alternative of integer.
        TokenSpec {
            kind: BooleanConst,
            pattern: "true|false",
            longer_alt: Some(Identifier),
            payload: Some(boolean_payload),
            skipped: false,
        },
        TokenSpec {
            kind: StringLiteral,
            pattern: r#""[^\r\n"]*"|'[^\r\n']*'"#,
            longer_alt: None,
            payload: Some(string_literal_payload),
            skipped: false,
        },
        TokenSpec {
            kind: DoubleConst,
            pattern: r"[-+]?[0-9]\d*\.\d+([eE][+-]?\d+)?",
            longer_alt: None,
            payload: Some(double_payload),
            skipped: false,
        },
        TokenSpec {
            kind: HexConst,
            pattern: r"[-+]?0x[A-Fa-f0-9]+",
            longer_alt: None,
            payload: Some(hex_payload),
            skipped: false,
        },
        TokenSpec {
            kind: IntegerConst,
            pattern: r"[-+]?\d+([eE]\d+)?",
            longer_alt: Some(HexConst),
            payload: Some(integer_payload),
            skipped: false,
        },
        // Headers
        keyword(Include),
        keyword(CppInclude),
        keyword(Namespace),
        // Definitions
        keyword(Typedef),
        keyword(Const),
        keyword(Struct),
        keyword(Union),
        keyword(Enum),
        keyword(SEnum),
        keyword(Service),
        keyword(Exception),
        // Keywords
        keyword(Extends),
        keyword(Throws),
        keyword(OneWay),
        keyword(Optional),
        keyword(Required),
        keyword(CppType),
        // Types
        keyword(Bool),
        keyword(Byte),
        keyword(I16),
        keyword(I32),
        keyword(I64),
        keyword(Double),
        keyword(Binary),
        keyword(String),
        keyword(SList),
        keyword(List),
        keyword(Set),
        keyword(Map),
        // Special
        keyword(Void),
        // Identifier last: everything keyword-shaped falls through to here.
        TokenSpec {
            kind: Identifier,
            pattern: r"[A-Za-z_](\.[A-Za-z_0-9]|[A-Za-z_0-9])*",
            longer_alt: None,
            payload: None,
            skipped: false,
        },
    ]
}

/// Compiles and validates the catalog. Panics on an inconsistent catalog;
/// this runs once at first use and can never fail at parse time.
fn build_catalog() -> Catalog {
    let order = token_order();
    let mut specs = Vec::with_capacity(order.len());
    let mut by_kind = HashMap::new();

    for (position, spec) in order.iter().enumerate() {
        if by_kind.insert(spec.kind, position).is_some() {
            panic!("token catalog: duplicate entry for {:?}", spec.kind);
        }
    }

    for spec in &order {
        if let Some(alt) = spec.longer_alt {
            if !by_kind.contains_key(&alt) {
                panic!(
                    "token catalog: {:?} references undefined longer alternative {:?}",
                    spec.kind, alt
                );
            }
        }

        let anchored = format!("^({})", spec.pattern);
        let regex = Regex::new(&anchored)
            .unwrap_or_else(|e| panic!("token catalog: bad pattern for {:?}: {}", spec.kind, e));

        specs.push(CompiledSpec {
            kind: spec.kind,
            regex,
            longer_alt: spec.longer_alt,
            payload: spec.payload,
            skipped: spec.skipped,
        });
    }

    Catalog { specs, by_kind }
}

pub(crate) static CATALOG: Lazy<Catalog> = Lazy::new(build_catalog);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds_and_is_ordered() {
        let catalog = &*CATALOG;
        assert_eq!(catalog.specs.first().map(|s| s.kind), Some(TokenKind::Whitespace));
        assert_eq!(catalog.specs.last().map(|s| s.kind), Some(TokenKind::Identifier));

        // Doubles before integers, doc before block.
        let position = |kind| {
            catalog
                .specs
                .iter()
                .position(|s| s.kind == kind)
                .expect("kind present")
        };
        assert!(position(TokenKind::DoubleConst) < position(TokenKind::IntegerConst));
        assert!(position(TokenKind::DocComment) < position(TokenKind::BlockComment));
    }

    #[test]
    fn separators_share_a_category() {
        assert!(TokenKind::Semi.in_category(Category::ListSeparator));
        assert!(TokenKind::Comma.in_category(Category::ListSeparator));
        assert!(!TokenKind::Colon.in_category(Category::ListSeparator));
    }

    #[test]
    fn payload_extractors() {
        assert_eq!(
            single_line_comment_payload("// Just"),
            Some(Payload::Text(" Just".into()))
        );
        assert_eq!(
            single_line_comment_payload("# Just"),
            Some(Payload::Text(" Just".into()))
        );
        assert_eq!(
            string_literal_payload("'hello'"),
            Some(Payload::Text("hello".into()))
        );
        assert_eq!(hex_payload("0xFF"), Some(Payload::Int(255)));
        assert_eq!(hex_payload("-0x10"), Some(Payload::Int(-16)));
        assert_eq!(integer_payload("42"), Some(Payload::Int(42)));
        assert_eq!(integer_payload("1e5"), Some(Payload::Int(1)));
        assert_eq!(double_payload("1.5"), Some(Payload::Double(1.5)));
        assert_eq!(boolean_payload("false"), Some(Payload::Bool(false)));
        assert_eq!(
            doc_comment_payload("/** doc */"),
            Some(Payload::Text(" doc ".into()))
        );
        assert_eq!(
            block_comment_payload("/* note */"),
            Some(Payload::Text(" note ".into()))
        );
    }
}

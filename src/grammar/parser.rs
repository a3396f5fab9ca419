//! Recursive-descent parser producing a concrete syntax tree.
//!
//! Reference: https://thrift.apache.org/docs/idl
//!
//! The parser never aborts: expectation failures are recorded as
//! [`SyntaxError`] values with the active rule stack, the offending region is
//! skipped to the next recognizable boundary, and parsing continues. Callers
//! always get a `Root` node covering whatever structure could be recovered.
//!
//! Constant values are type-gated: when the declared type of a `const` or
//! field initializer is known, only assignable literal alternatives are
//! attempted (a string cannot initialize an `i32`). An identifier alternative
//! is always available since constants may reference other named constants.

use super::cst::{CstNode, LabelName, RuleName, RuleNode};
use super::token::{Category, Token, TokenKind};
use super::types::{find_type_name, TypeName};
use crate::diagnostics::SyntaxError;

/// Result of one parse pass: the recovered tree plus every syntax error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub root: CstNode,
    pub errors: Vec<SyntaxError>,
}

/// Parses a token stream (trivia already removed by the lexer).
pub fn parse(tokens: Vec<Token>) -> ParseResult {
    let mut parser = Parser::new(tokens);
    let root = parser.root();
    ParseResult {
        root,
        errors: parser.errors,
    }
}

fn is_comment(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::SingleLineComment | TokenKind::DocComment | TokenKind::BlockComment
    )
}

fn is_header_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Include | TokenKind::CppInclude | TokenKind::Namespace
    )
}

fn is_definition_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Const
            | TokenKind::Typedef
            | TokenKind::Enum
            | TokenKind::SEnum
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Exception
            | TokenKind::Service
    )
}

fn is_base_type(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Bool
            | TokenKind::Byte
            | TokenKind::I16
            | TokenKind::I32
            | TokenKind::I64
            | TokenKind::Double
            | TokenKind::Binary
            | TokenKind::String
    )
}

fn is_container_start(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Map | TokenKind::List | TokenKind::Set)
}

fn is_type_start(kind: TokenKind) -> bool {
    is_base_type(kind) || is_container_start(kind) || kind == TokenKind::Identifier
}

fn is_field_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::IntegerConst | TokenKind::Optional | TokenKind::Required
    ) || is_type_start(kind)
}

fn is_function_start(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::OneWay | TokenKind::Void) || is_type_start(kind)
}

fn is_const_value_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::StringLiteral
            | TokenKind::HexConst
            | TokenKind::IntegerConst
            | TokenKind::DoubleConst
            | TokenKind::BooleanConst
            | TokenKind::LCurly
            | TokenKind::LBracket
            | TokenKind::Identifier
    )
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    rule_stack: Vec<RuleName>,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            rule_stack: Vec::new(),
            errors: Vec::new(),
        }
    }

    // ---- stream primitives -------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_separator(&self) -> bool {
        self.peek_kind()
            .map(|k| k.in_category(Category::ListSeparator))
            .unwrap_or(false)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// First non-comment kind at or after the cursor. Drives the lookahead
    /// decisions for rules that begin with a leading-comment block.
    fn peek_past_comments(&self) -> Option<TokenKind> {
        self.tokens[self.pos..]
            .iter()
            .map(|t| t.kind)
            .find(|&k| !is_comment(k))
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }

    fn bump_into(&mut self, node: &mut RuleNode) {
        let token = self.bump();
        node.push_token(token);
    }

    /// Consumes the next token into `node` when it matches.
    fn eat(&mut self, kind: TokenKind, node: &mut RuleNode) -> bool {
        if self.at(kind) {
            self.bump_into(node);
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self, node: &mut RuleNode) -> bool {
        if self.at_separator() {
            self.bump_into(node);
            true
        } else {
            false
        }
    }

    /// Consumes the next token into `node` or records an expectation error.
    fn expect(&mut self, kind: TokenKind, node: &mut RuleNode) -> bool {
        if self.eat(kind, node) {
            true
        } else {
            self.error_here(&format!("Expected {}", kind.label()));
            false
        }
    }

    // ---- error recording and recovery --------------------------------------

    fn error_here(&mut self, expectation: &str) {
        let (message, start, end) = match self.peek() {
            Some(token) => (
                format!("{} but found {}", expectation, token.kind.label()),
                token.start,
                token.end,
            ),
            None => {
                let end = self.tokens.last().map(|t| t.end).unwrap_or(0);
                (format!("{} but reached end of input", expectation), end, end)
            }
        };
        self.errors.push(SyntaxError {
            message,
            start,
            end,
            rule_stack: self.rule_stack.iter().map(|r| r.to_string()).collect(),
            previous: self.tokens.get(self.pos.wrapping_sub(1)).cloned(),
        });
    }

    /// Skips tokens until a predicate matches, recording one error for the
    /// whole skipped run.
    fn resync(&mut self, expectation: &str, stop: impl Fn(TokenKind) -> bool) {
        self.error_here(expectation);
        while let Some(kind) = self.peek_kind() {
            if stop(kind) {
                break;
            }
            self.pos += 1;
        }
    }

    // ---- rules -------------------------------------------------------------

    fn begin(&mut self, name: RuleName) -> RuleNode {
        self.rule_stack.push(name);
        RuleNode::new(name)
    }

    fn finish(&mut self, node: RuleNode) -> CstNode {
        self.rule_stack.pop();
        node.into_node()
    }

    /// `Root := Comments Header* Definition* PostComments`
    fn root(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Root);

        let leading = self.comments(true);
        node.push_rule(leading);

        while self
            .peek_past_comments()
            .map(is_header_start)
            .unwrap_or(false)
        {
            let header = self.header();
            node.push_rule(header);
        }

        loop {
            match self.peek_past_comments() {
                Some(kind) if is_definition_start(kind) => {
                    let def = self.definition();
                    node.push_rule(def);
                }
                Some(kind) if is_header_start(kind) => {
                    // A header after the first definition is misplaced, but
                    // still parses; recording the error and consuming it keeps
                    // the loop moving.
                    self.error_here("Expected definition");
                    let header = self.header();
                    node.push_rule(header);
                }
                Some(_) if self.peek_kind().map(is_comment) != Some(true) => {
                    // Unrecognized top-level content. Skip to the next
                    // definition or header boundary and keep going.
                    self.resync("Expected definition", |k| {
                        is_definition_start(k) || is_header_start(k)
                    });
                    if self.at_end() {
                        break;
                    }
                }
                _ => break,
            }
        }

        let trailing = self.comments(true);
        node.push_labeled(LabelName::PostComments, trailing);

        if !self.at_end() {
            self.resync("Expected end of document", |_| false);
        }

        self.finish(node)
    }

    /// Zero or more comment tokens. Single-line comments are excluded in
    /// positions where they would swallow the rest of a declaration.
    fn comments(&mut self, allow_single_line: bool) -> CstNode {
        let mut node = self.begin(RuleName::Comments);
        while let Some(kind) = self.peek_kind() {
            let take = match kind {
                TokenKind::DocComment | TokenKind::BlockComment => true,
                TokenKind::SingleLineComment => allow_single_line,
                _ => false,
            };
            if !take {
                break;
            }
            self.bump_into(&mut node);
        }
        self.finish(node)
    }

    /// `Header := Comments (Include | CPPInclude | Namespace)`
    fn header(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Header);
        let leading = self.comments(true);
        node.push_rule(leading);

        match self.peek_kind() {
            Some(TokenKind::Include) => {
                let child = self.include();
                node.push_rule(child);
            }
            Some(TokenKind::CppInclude) => {
                let child = self.cpp_include();
                node.push_rule(child);
            }
            Some(TokenKind::Namespace) => {
                let child = self.namespace();
                node.push_rule(child);
            }
            _ => {}
        }

        self.finish(node)
    }

    fn include(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Include);
        self.expect(TokenKind::Include, &mut node);
        self.expect(TokenKind::StringLiteral, &mut node);
        self.finish(node)
    }

    /// `Namespace := "namespace" (Identifier | "*") Identifier Annotations?`
    fn namespace(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Namespace);
        self.expect(TokenKind::Namespace, &mut node);
        if !self.eat(TokenKind::Identifier, &mut node) && !self.eat(TokenKind::Wildcard, &mut node)
        {
            self.error_here("Expected namespace scope");
        }
        self.expect(TokenKind::Identifier, &mut node);
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.finish(node)
    }

    fn cpp_include(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::CppInclude);
        self.expect(TokenKind::CppInclude, &mut node);
        self.expect(TokenKind::StringLiteral, &mut node);
        self.finish(node)
    }

    /// `Definition := Comments (Const | TypeDef | Enum | SEnum | Struct |
    /// Union | Exception | Service)`
    fn definition(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Definition);
        let leading = self.comments(true);
        node.push_rule(leading);

        let child = match self.peek_kind() {
            Some(TokenKind::Const) => Some(self.const_definition()),
            Some(TokenKind::Typedef) => Some(self.typedef()),
            Some(TokenKind::Enum) => Some(self.enum_definition()),
            Some(TokenKind::SEnum) => Some(self.senum()),
            Some(TokenKind::Struct) => Some(self.field_consumer(RuleName::Struct, TokenKind::Struct)),
            Some(TokenKind::Union) => Some(self.field_consumer(RuleName::Union, TokenKind::Union)),
            Some(TokenKind::Exception) => {
                Some(self.field_consumer(RuleName::Exception, TokenKind::Exception))
            }
            Some(TokenKind::Service) => Some(self.service()),
            _ => {
                self.error_here("Expected definition");
                None
            }
        };
        if let Some(child) = child {
            node.push_rule(child);
        }

        self.finish(node)
    }

    /// `FieldId := Comments Integer ":"` (single-line comments excluded)
    fn field_id(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::FieldId);
        let leading = self.comments(false);
        node.push_rule(leading);
        self.expect(TokenKind::IntegerConst, &mut node);
        self.expect(TokenKind::Colon, &mut node);
        self.finish(node)
    }

    fn field_req(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::FieldReq);
        let leading = self.comments(false);
        node.push_rule(leading);
        if !self.eat(TokenKind::Optional, &mut node) && !self.eat(TokenKind::Required, &mut node) {
            self.error_here("Expected optional or required");
        }
        self.finish(node)
    }

    /// `Field := Comments (FieldId? FieldReq? Type "&"? Identifier
    /// ("=" ConstValue)? Annotations? ListSeparator?)?`
    ///
    /// The whole body is optional so a comment run before a closing brace
    /// still parses as a (comment-only) field.
    fn field(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Field);
        let leading = self.comments(true);
        node.push_rule(leading);

        if self.peek_kind().map(is_field_start).unwrap_or(false) {
            if self.at(TokenKind::IntegerConst) {
                let id = self.field_id();
                node.push_rule(id);
            }
            if self.at(TokenKind::Optional) || self.at(TokenKind::Required) {
                let req = self.field_req();
                node.push_rule(req);
            }

            let ty = self.type_rule();
            let type_name = find_type_name(&ty);
            node.push_rule(ty);

            self.eat(TokenKind::Ampersand, &mut node);
            self.expect(TokenKind::Identifier, &mut node);

            if self.eat(TokenKind::Assignment, &mut node) {
                let value = self.const_value(type_name);
                node.push_rule(value);
            }
            if self.at(TokenKind::LParen) {
                let annotations = self.annotations();
                node.push_rule(annotations);
            }
            self.eat_separator(&mut node);
        }

        self.finish(node)
    }

    /// Shared shape of struct, union, and exception bodies:
    /// `Keyword Identifier "{" Field* "}" Annotations?`
    fn field_consumer(&mut self, rule: RuleName, keyword: TokenKind) -> CstNode {
        let mut node = self.begin(rule);
        self.expect(keyword, &mut node);
        self.expect(TokenKind::Identifier, &mut node);
        if self.expect(TokenKind::LCurly, &mut node) {
            self.field_block(&mut node);
            self.expect(TokenKind::RCurly, &mut node);
        }
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.finish(node)
    }

    /// Field loop used by both braced bodies and parenthesized argument
    /// lists. Skips unrecognizable tokens so one bad field does not take the
    /// rest of the block with it.
    fn field_block(&mut self, node: &mut RuleNode) {
        loop {
            let entered = self
                .peek_kind()
                .map(|k| is_comment(k) || is_field_start(k))
                .unwrap_or(false);
            if !entered {
                match self.peek_kind() {
                    Some(TokenKind::RCurly) | Some(TokenKind::RParen) | None => break,
                    Some(_) => {
                        self.resync("Expected field", |k| {
                            is_field_start(k)
                                || k == TokenKind::RCurly
                                || k == TokenKind::RParen
                        });
                        continue;
                    }
                }
            }

            let before = self.pos;
            let field = self.field();
            node.push_rule(field);
            if self.pos == before {
                break;
            }
        }
    }

    /// `SEnum := "senum" Identifier "{" (String ListSeparator?)* "}"
    /// Annotations?`
    fn senum(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::SEnum);
        self.expect(TokenKind::SEnum, &mut node);
        self.expect(TokenKind::Identifier, &mut node);
        if self.expect(TokenKind::LCurly, &mut node) {
            while self.eat(TokenKind::StringLiteral, &mut node) {
                self.eat_separator(&mut node);
            }
            self.expect(TokenKind::RCurly, &mut node);
        }
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.finish(node)
    }

    /// `Enum := "enum" Identifier "{" EnumValue* ListSeparator? Comments "}"
    /// Annotations?`
    ///
    /// Enum members carry no field ids, and value assignments admit only
    /// integer, hex, or identifier constants.
    fn enum_definition(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Enum);
        self.expect(TokenKind::Enum, &mut node);
        self.expect(TokenKind::Identifier, &mut node);
        if self.expect(TokenKind::LCurly, &mut node) {
            loop {
                match self.peek_past_comments() {
                    Some(TokenKind::Identifier) => {
                        let value = self.enum_value();
                        node.push_rule(value);
                    }
                    Some(kind) if kind != TokenKind::RCurly && !kind.in_category(Category::ListSeparator) => {
                        self.resync("Expected enum member", |k| {
                            k == TokenKind::Identifier || k == TokenKind::RCurly
                        });
                        if self.at_end() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            self.eat_separator(&mut node);
            let trailing = self.comments(true);
            node.push_rule(trailing);
            self.expect(TokenKind::RCurly, &mut node);
        }
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.finish(node)
    }

    /// `EnumValue := Comments Identifier ("=" (Hex | Integer | Identifier))?
    /// Annotations? ListSeparator?`
    fn enum_value(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::EnumValue);
        let leading = self.comments(true);
        node.push_rule(leading);
        self.expect(TokenKind::Identifier, &mut node);
        if self.eat(TokenKind::Assignment, &mut node) {
            if !self.eat(TokenKind::HexConst, &mut node)
                && !self.eat(TokenKind::IntegerConst, &mut node)
                && !self.eat(TokenKind::Identifier, &mut node)
            {
                self.error_here("Expected integer, hex, or identifier constant");
            }
        }
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.eat_separator(&mut node);
        self.finish(node)
    }

    /// `TypeDef := "typedef" Type Identifier Annotations? ListSeparator?`
    fn typedef(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::TypeDef);
        self.expect(TokenKind::Typedef, &mut node);
        let ty = self.type_rule();
        node.push_rule(ty);
        self.expect(TokenKind::Identifier, &mut node);
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.eat_separator(&mut node);
        self.finish(node)
    }

    /// `Service := "service" Identifier ("extends" Identifier)? "{" Function*
    /// "}" Annotations?`
    fn service(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Service);
        self.expect(TokenKind::Service, &mut node);
        self.expect(TokenKind::Identifier, &mut node);
        if self.eat(TokenKind::Extends, &mut node) {
            self.expect(TokenKind::Identifier, &mut node);
        }
        if self.expect(TokenKind::LCurly, &mut node) {
            loop {
                match self.peek_past_comments() {
                    Some(kind) if is_function_start(kind) => {
                        let before = self.pos;
                        let function = self.function();
                        node.push_rule(function);
                        if self.pos == before {
                            break;
                        }
                    }
                    Some(kind) if kind != TokenKind::RCurly => {
                        self.resync("Expected function", |k| {
                            is_function_start(k) || k == TokenKind::RCurly
                        });
                        if self.at_end() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            self.expect(TokenKind::RCurly, &mut node);
        }
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.finish(node)
    }

    /// `Function := Comments "oneway"? (Type | "void") Identifier "(" Field*
    /// ")" FunctionThrows Annotations? ListSeparator? Comments`
    fn function(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Function);
        let leading = self.comments(true);
        node.push_rule(leading);

        self.eat(TokenKind::OneWay, &mut node);
        if self.at(TokenKind::Void) {
            self.bump_into(&mut node);
        } else {
            let ty = self.type_rule();
            node.push_rule(ty);
        }
        self.expect(TokenKind::Identifier, &mut node);
        if self.expect(TokenKind::LParen, &mut node) {
            self.field_block(&mut node);
            self.expect(TokenKind::RParen, &mut node);
        }

        let throws = self.function_throws();
        node.push_rule(throws);

        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.eat_separator(&mut node);

        let trailing = self.comments(true);
        node.push_rule(trailing);
        self.finish(node)
    }

    /// `FunctionThrows := ("throws" "(" Field* ")")?` (node always present)
    fn function_throws(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::FunctionThrows);
        if self.eat(TokenKind::Throws, &mut node) && self.expect(TokenKind::LParen, &mut node) {
            self.field_block(&mut node);
            self.expect(TokenKind::RParen, &mut node);
        }
        self.finish(node)
    }

    /// `Annotation := Identifier ("=" String)? ","?`
    fn annotation(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Annotation);
        self.expect(TokenKind::Identifier, &mut node);
        if self.eat(TokenKind::Assignment, &mut node) {
            self.expect(TokenKind::StringLiteral, &mut node);
        }
        self.eat(TokenKind::Comma, &mut node);
        self.finish(node)
    }

    /// `Annotations := "(" Annotation* ")"`
    fn annotations(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Annotations);
        self.expect(TokenKind::LParen, &mut node);
        while self.at(TokenKind::Identifier) {
            let annotation = self.annotation();
            node.push_rule(annotation);
        }
        self.expect(TokenKind::RParen, &mut node);
        self.finish(node)
    }

    /// Constant value, gated by the declared type when known. An identifier
    /// alternative is always admitted.
    fn const_value(&mut self, known: Option<TypeName>) -> CstNode {
        let mut node = self.begin(RuleName::ConstValue);
        let skip_check = matches!(known, None | Some(TypeName::Identifier));
        let admits = |check: fn(TypeName) -> bool| skip_check || known.map(check).unwrap_or(true);

        match self.peek_kind() {
            Some(TokenKind::StringLiteral) if admits(TypeName::is_string_assignable) => {
                self.bump_into(&mut node);
            }
            Some(TokenKind::HexConst) if admits(TypeName::is_integer_assignable) => {
                self.bump_into(&mut node);
            }
            Some(TokenKind::IntegerConst) if admits(TypeName::is_integer_assignable) => {
                self.bump_into(&mut node);
            }
            Some(TokenKind::DoubleConst) if admits(TypeName::is_double_assignable) => {
                self.bump_into(&mut node);
            }
            Some(TokenKind::BooleanConst) if admits(TypeName::is_boolean_assignable) => {
                self.bump_into(&mut node);
            }
            Some(TokenKind::LCurly) if admits(TypeName::is_map_assignable) => {
                let map = self.map_const();
                node.push_rule(map);
            }
            Some(TokenKind::LBracket) if admits(TypeName::is_list_assignable) => {
                let list = self.list_const();
                node.push_rule(list);
            }
            Some(TokenKind::Identifier) => {
                self.bump_into(&mut node);
            }
            _ => {
                let message = match known {
                    Some(name) => format!("Constant {} or Identifier", name.label()),
                    None => "Expected constant value".to_string(),
                };
                self.error_here(&message);
            }
        }

        self.finish(node)
    }

    /// `CPPType := "cpp_type" String`
    fn cpp_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::CppType);
        self.expect(TokenKind::CppType, &mut node);
        self.expect(TokenKind::StringLiteral, &mut node);
        self.finish(node)
    }

    /// `ListConst := "[" (ConstValue ("," ConstValue)*)? "]"`
    fn list_const(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::ListConst);
        self.expect(TokenKind::LBracket, &mut node);
        if self.peek_kind().map(is_const_value_start).unwrap_or(false) {
            let value = self.const_value(None);
            node.push_rule(value);
            while self.eat(TokenKind::Comma, &mut node) {
                let value = self.const_value(None);
                node.push_rule(value);
            }
        }
        self.expect(TokenKind::RBracket, &mut node);
        self.finish(node)
    }

    /// `MapConst := "{" MapValue* ListSeparator? "}"`
    ///
    /// Also covers struct-literal constants, which share the braced
    /// key-colon-value surface syntax.
    fn map_const(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::MapConst);
        self.expect(TokenKind::LCurly, &mut node);
        loop {
            let entered = match self.peek_past_comments() {
                Some(kind) => is_const_value_start(kind) && self.peek_kind() != Some(TokenKind::RCurly),
                None => false,
            };
            let comment_only = self.peek_kind().map(is_comment).unwrap_or(false);
            if !entered && !comment_only {
                break;
            }
            let before = self.pos;
            let value = self.map_value();
            node.push_rule(value);
            if self.pos == before {
                break;
            }
        }
        self.eat_separator(&mut node);
        self.expect(TokenKind::RCurly, &mut node);
        self.finish(node)
    }

    /// `MapValue := Comments (ConstValue ":" ConstValue ListSeparator?)?`
    fn map_value(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::MapValue);
        let leading = self.comments(true);
        node.push_rule(leading);

        if self.peek_kind().map(is_const_value_start).unwrap_or(false) {
            let key = self.const_value(None);
            node.push_labeled(LabelName::MapKey, key);
            self.expect(TokenKind::Colon, &mut node);
            let value = self.const_value(None);
            node.push_labeled(LabelName::MapValue, value);
            self.eat_separator(&mut node);
        }

        self.finish(node)
    }

    fn base_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::BaseType);
        match self.peek_kind() {
            Some(kind) if is_base_type(kind) => self.bump_into(&mut node),
            _ => self.error_here("Expected base type"),
        }
        self.finish(node)
    }

    fn container_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::ContainerType);
        let child = match self.peek_kind() {
            Some(TokenKind::Map) => Some(self.map_type()),
            Some(TokenKind::List) => Some(self.list_type()),
            Some(TokenKind::Set) => Some(self.set_type()),
            _ => {
                self.error_here("Expected container type");
                None
            }
        };
        if let Some(child) = child {
            node.push_rule(child);
        }
        self.finish(node)
    }

    /// `DefinitionType := (BaseType | ContainerType) Annotations?`
    fn definition_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::DefinitionType);
        let child = if self.peek_kind().map(is_base_type).unwrap_or(false) {
            self.base_type()
        } else {
            self.container_type()
        };
        node.push_rule(child);
        if self.at(TokenKind::LParen) {
            let annotations = self.annotations();
            node.push_rule(annotations);
        }
        self.finish(node)
    }

    /// `Type := Comments (DefinitionType | Identifier)` (single-line comments
    /// excluded from the leading block)
    fn type_rule(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Type);
        let leading = self.comments(false);
        node.push_rule(leading);

        match self.peek_kind() {
            Some(kind) if is_base_type(kind) || is_container_start(kind) => {
                let child = self.definition_type();
                node.push_rule(child);
            }
            Some(TokenKind::Identifier) => {
                self.bump_into(&mut node);
            }
            _ => self.error_here("Expected type"),
        }

        self.finish(node)
    }

    /// `MapType := "map" CPPType? "<" MapKeyType "," MapValueType ">"`
    fn map_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::MapType);
        self.expect(TokenKind::Map, &mut node);
        if self.at(TokenKind::CppType) {
            let cpp = self.cpp_type();
            node.push_rule(cpp);
        }
        self.expect(TokenKind::LTemplate, &mut node);
        let key = self.map_key_type();
        node.push_rule(key);
        self.expect(TokenKind::Comma, &mut node);
        let value = self.map_value_type();
        node.push_rule(value);
        self.expect(TokenKind::RTemplate, &mut node);
        self.finish(node)
    }

    // MapKeyType and MapValueType only exist to tell the two type positions
    // apart during lowering.

    fn map_key_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::MapKeyType);
        let ty = self.type_rule();
        node.push_rule(ty);
        self.finish(node)
    }

    fn map_value_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::MapValueType);
        let ty = self.type_rule();
        node.push_rule(ty);
        self.finish(node)
    }

    /// `ListType := "list" "<" Type ">" CPPType?`
    fn list_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::ListType);
        self.expect(TokenKind::List, &mut node);
        self.expect(TokenKind::LTemplate, &mut node);
        let ty = self.type_rule();
        node.push_rule(ty);
        self.expect(TokenKind::RTemplate, &mut node);
        if self.at(TokenKind::CppType) {
            let cpp = self.cpp_type();
            node.push_rule(cpp);
        }
        self.finish(node)
    }

    /// `SetType := "set" CPPType? "<" Type ">"`
    fn set_type(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::SetType);
        self.expect(TokenKind::Set, &mut node);
        if self.at(TokenKind::CppType) {
            let cpp = self.cpp_type();
            node.push_rule(cpp);
        }
        self.expect(TokenKind::LTemplate, &mut node);
        let ty = self.type_rule();
        node.push_rule(ty);
        self.expect(TokenKind::RTemplate, &mut node);
        self.finish(node)
    }

    /// `Const := "const" Type Identifier "=" ConstValue ";"?`
    fn const_definition(&mut self) -> CstNode {
        let mut node = self.begin(RuleName::Const);
        self.expect(TokenKind::Const, &mut node);
        let ty = self.type_rule();
        let type_name = find_type_name(&ty);
        node.push_rule(ty);
        self.expect(TokenKind::Identifier, &mut node);
        self.expect(TokenKind::Assignment, &mut node);
        let value = self.const_value(type_name);
        node.push_rule(value);
        self.eat(TokenKind::Semi, &mut node);
        self.finish(node)
    }
}

//! Concrete syntax tree produced by the parser.
//!
//! A CST node is either an internal rule node or a leaf token. Children of a
//! rule node are kept in source order, each tagged with the slot it was
//! produced under: the child rule's name, the token's kind, or an explicit
//! label for positions the lowering must tell apart (map keys vs. map values,
//! trailing document comments). Slots are enums, not strings, so a rule can
//! only reference child kinds that actually exist.

use serde::Serialize;
use std::fmt;

use super::token::{Payload, Token, TokenKind};

/// Parser rule names, one per grammar construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleName {
    Root,
    Header,
    Include,
    Namespace,
    CppInclude,
    Definition,
    FieldId,
    FieldReq,
    Field,
    Union,
    Struct,
    Exception,
    SEnum,
    Enum,
    EnumValue,
    TypeDef,
    Service,
    Function,
    FunctionThrows,
    Annotation,
    Annotations,
    ConstValue,
    CppType,
    ListConst,
    MapConst,
    MapValue,
    BaseType,
    ContainerType,
    DefinitionType,
    Type,
    MapType,
    MapKeyType,
    MapValueType,
    ListType,
    SetType,
    Const,
    Comments,
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Explicit child labels for slots where the rule name alone is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LabelName {
    /// Key position of a map-literal entry.
    MapKey,
    /// Value position of a map-literal entry.
    MapValue,
    /// Comments trailing the last definition, attached to the document.
    PostComments,
}

/// The name a handler dispatches on: rule nodes by rule, leaves by token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeName {
    Rule(RuleName),
    Token(TokenKind),
}

/// Child-slot tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotName {
    Rule(RuleName),
    Token(TokenKind),
    Label(LabelName),
}

/// A node in the concrete syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CstNode {
    Rule(RuleNode),
    Token(Token),
}

/// An internal node: a rule name plus slot-tagged children in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleNode {
    pub name: RuleName,
    pub children: Vec<(SlotName, CstNode)>,
}

impl RuleNode {
    pub fn new(name: RuleName) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    /// Appends a child rule node under its own rule-name slot.
    pub fn push_rule(&mut self, node: CstNode) {
        let slot = match &node {
            CstNode::Rule(rule) => SlotName::Rule(rule.name),
            CstNode::Token(token) => SlotName::Token(token.kind),
        };
        self.children.push((slot, node));
    }

    /// Appends a child under an explicit label.
    pub fn push_labeled(&mut self, label: LabelName, node: CstNode) {
        self.children.push((SlotName::Label(label), node));
    }

    /// Appends a leaf token under its token-kind slot.
    pub fn push_token(&mut self, token: Token) {
        self.children
            .push((SlotName::Token(token.kind), CstNode::Token(token)));
    }

    pub fn into_node(self) -> CstNode {
        CstNode::Rule(self)
    }
}

impl CstNode {
    pub fn name(&self) -> NodeName {
        match self {
            CstNode::Rule(rule) => NodeName::Rule(rule.name),
            CstNode::Token(token) => NodeName::Token(token.kind),
        }
    }

    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            CstNode::Rule(rule) => Some(rule),
            CstNode::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            CstNode::Rule(_) => None,
            CstNode::Token(token) => Some(token),
        }
    }

    /// All children in source order; empty for leaves.
    pub fn children(&self) -> &[(SlotName, CstNode)] {
        match self {
            CstNode::Rule(rule) => &rule.children,
            CstNode::Token(_) => &[],
        }
    }

    /// Children filed under a given slot, preserving source order.
    pub fn slot(&self, slot: SlotName) -> impl Iterator<Item = &CstNode> {
        self.children()
            .iter()
            .filter(move |(s, _)| *s == slot)
            .map(|(_, n)| n)
    }

    pub fn has_slot(&self, slot: SlotName) -> bool {
        self.slot(slot).next().is_some()
    }

    /// Leaf tokens of a given kind among the direct children.
    pub fn tokens_of(&self, kind: TokenKind) -> impl Iterator<Item = &Token> {
        self.slot(SlotName::Token(kind))
            .filter_map(|n| n.as_token())
    }

    /// The image of the nth `Identifier` child, if present.
    pub fn identifier_of(&self, index: usize) -> Option<&str> {
        self.tokens_of(TokenKind::Identifier)
            .nth(index)
            .map(|t| t.image.as_str())
    }

    /// First payload among children of the given kinds, tried in order.
    ///
    /// Each kind is exhausted before the next is attempted, matching the
    /// original lookup order rather than strict source order.
    pub fn first_payload(&self, kinds: &[TokenKind]) -> Option<&Payload> {
        for kind in kinds {
            if let Some(token) = self.tokens_of(*kind).next() {
                if let Some(payload) = &token.payload {
                    return Some(payload);
                }
            }
        }
        None
    }

    /// First of the given token kinds that has a child, in query order.
    pub fn first_exists(&self, kinds: &[TokenKind]) -> Option<TokenKind> {
        kinds
            .iter()
            .copied()
            .find(|kind| self.tokens_of(*kind).next().is_some())
    }
}

/// Finds the first node in `nodes` whose name matches, scanning in order.
///
/// Used with ancestor chains (nearest ancestor first) to locate e.g. the
/// enclosing `Definition` node for doc-comment extraction.
pub fn find_by_name<'a>(nodes: &[&'a CstNode], name: NodeName) -> Option<&'a CstNode> {
    nodes.iter().copied().find(|n| n.name() == name)
}

/// Depth-first search for the closest descendant with the given name.
pub fn find_closest_by_name<'a>(roots: &[&'a CstNode], name: NodeName) -> Option<&'a CstNode> {
    let mut queue: Vec<&CstNode> = roots.to_vec();

    while let Some(tail) = queue.pop() {
        if tail.name() == name {
            return Some(tail);
        }

        for (_, child) in tail.children().iter().rev() {
            queue.push(child);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, image: &str) -> Token {
        Token {
            kind,
            image: image.to_string(),
            start: 0,
            end: image.len(),
            payload: None,
        }
    }

    #[test]
    fn slot_queries_preserve_order() {
        let mut rule = RuleNode::new(RuleName::Service);
        rule.push_token(token(TokenKind::Identifier, "first"));
        rule.push_token(token(TokenKind::LCurly, "{"));
        rule.push_token(token(TokenKind::Identifier, "second"));
        let node = rule.into_node();

        assert_eq!(node.identifier_of(0), Some("first"));
        assert_eq!(node.identifier_of(1), Some("second"));
        assert_eq!(node.identifier_of(2), None);
        assert!(node.has_slot(SlotName::Token(TokenKind::LCurly)));
    }

    #[test]
    fn first_exists_uses_query_order() {
        let mut rule = RuleNode::new(RuleName::BaseType);
        rule.push_token(token(TokenKind::I32, "i32"));
        let node = rule.into_node();

        assert_eq!(
            node.first_exists(&[TokenKind::I16, TokenKind::I32, TokenKind::I64]),
            Some(TokenKind::I32)
        );
        assert_eq!(node.first_exists(&[TokenKind::Bool]), None);
    }

    #[test]
    fn find_closest_walks_depth_first() {
        let mut inner = RuleNode::new(RuleName::Type);
        inner.push_token(token(TokenKind::Identifier, "Foo"));
        let mut outer = RuleNode::new(RuleName::Field);
        outer.push_rule(inner.into_node());
        let node = outer.into_node();

        let found = find_closest_by_name(&[&node], NodeName::Rule(RuleName::Type));
        assert!(found.is_some());
        assert_eq!(found.unwrap().identifier_of(0), Some("Foo"));
    }
}

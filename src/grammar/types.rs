//! Static type classification used to gate constant parsing.
//!
//! When the expected type of a constant is known from context (a field's
//! declared type, a const declaration), only assignment-compatible literal
//! alternatives are attempted. An identifier is always a legal fallback: a
//! constant may reference another declared constant, and that reference is
//! deliberately left unresolved (no semantic validation here).

use super::cst::{CstNode, RuleName, SlotName};
use super::token::TokenKind;

/// The statically known shape of a type position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Binary,
    String,
    Map,
    Set,
    List,
    Identifier,
}

impl TypeName {
    pub fn is_integer_assignable(self) -> bool {
        // Thrift accepts integer literals for bool (0/1) and double.
        matches!(
            self,
            TypeName::Byte
                | TypeName::Bool
                | TypeName::I16
                | TypeName::I32
                | TypeName::I64
                | TypeName::Double
        )
    }

    pub fn is_string_assignable(self) -> bool {
        matches!(self, TypeName::String | TypeName::Binary)
    }

    pub fn is_boolean_assignable(self) -> bool {
        self == TypeName::Bool
    }

    pub fn is_double_assignable(self) -> bool {
        self == TypeName::Double
    }

    pub fn is_list_assignable(self) -> bool {
        matches!(self, TypeName::List | TypeName::Set)
    }

    pub fn is_map_assignable(self) -> bool {
        self == TypeName::Map
    }

    pub fn label(self) -> &'static str {
        match self {
            TypeName::Bool => "bool",
            TypeName::Byte => "byte",
            TypeName::I16 => "i16",
            TypeName::I32 => "i32",
            TypeName::I64 => "i64",
            TypeName::Double => "double",
            TypeName::Binary => "binary",
            TypeName::String => "string",
            TypeName::Map => "map",
            TypeName::Set => "set",
            TypeName::List => "list",
            TypeName::Identifier => "Identifier",
        }
    }
}

fn base_type_name(node: &CstNode) -> Option<TypeName> {
    let kind = node.first_exists(&[
        TokenKind::Double,
        TokenKind::I16,
        TokenKind::I32,
        TokenKind::I64,
        TokenKind::Byte,
        TokenKind::Binary,
        TokenKind::String,
        TokenKind::Bool,
    ])?;

    Some(match kind {
        TokenKind::Double => TypeName::Double,
        TokenKind::I16 => TypeName::I16,
        TokenKind::I32 => TypeName::I32,
        TokenKind::I64 => TypeName::I64,
        TokenKind::Byte => TypeName::Byte,
        TokenKind::Binary => TypeName::Binary,
        TokenKind::String => TypeName::String,
        TokenKind::Bool => TypeName::Bool,
        _ => unreachable!(),
    })
}

fn container_type_name(node: &CstNode) -> Option<TypeName> {
    if node.has_slot(SlotName::Rule(RuleName::MapType)) {
        Some(TypeName::Map)
    } else if node.has_slot(SlotName::Rule(RuleName::SetType)) {
        Some(TypeName::Set)
    } else if node.has_slot(SlotName::Rule(RuleName::ListType)) {
        Some(TypeName::List)
    } else {
        None
    }
}

/// Classifies a `Type` rule node: identifier reference, base type, or
/// container. Returns `None` for malformed nodes (partial CSTs).
pub fn find_type_name(node: &CstNode) -> Option<TypeName> {
    if node.as_token().map(|t| t.kind) == Some(TokenKind::Identifier) {
        return Some(TypeName::Identifier);
    }

    if node.tokens_of(TokenKind::Identifier).next().is_some() {
        return Some(TypeName::Identifier);
    }

    let definition = node.slot(SlotName::Rule(RuleName::DefinitionType)).next()?;

    if let Some(base) = definition.slot(SlotName::Rule(RuleName::BaseType)).next() {
        return base_type_name(base);
    }

    if let Some(container) = definition
        .slot(SlotName::Rule(RuleName::ContainerType))
        .next()
    {
        return container_type_name(container);
    }

    None
}

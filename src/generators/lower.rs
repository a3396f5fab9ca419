//! CST-to-AST lowering.
//!
//! Lowering is a single [`TreeFold`] walk. Nodes under construction live in
//! an arena and are addressed by [`AstId`]; the walker's generated handle is
//! the arena id of the nearest enclosing AST node, so a handler attaches its
//! output by writing through its parent's id. Slots that cannot be filled at
//! creation time (map entry keys and values, container element types) start
//! as stubs and are overwritten in place when the corresponding child is
//! reached.
//!
//! Two state fields steer ambiguous attachment points:
//!
//! - [`TypeSlot`] says which type position of the parent a `Type` subtree
//!   fills: its main type, a function return, a map key or value, or a
//!   container element;
//! - [`FieldSlot`] says which list of the parent a `Field` joins: struct
//!   fields, function arguments, or function throws clauses.

use crate::ast::{
    self, Annotations, ConstValue, Document, MapEntry, Requiredness, TypeDetail, TypeId, TypeInfo,
};
use crate::grammar::comments::{extract_comments, CommentKind};
use crate::grammar::cst::{find_by_name, CstNode, LabelName, NodeName, RuleName, SlotName};
use crate::grammar::token::{Payload, TokenKind};

use super::visit::{TreeFold, VisitInput, VisitOutcome, WalkReport};

/// Arena handle for a node under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AstId(usize);

/// Which type position of the parent the current `Type` subtree fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TypeSlot {
    #[default]
    Default,
    Return,
    Key,
    Value,
    Element,
}

/// Which field list of the parent the current `Field` subtree joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FieldSlot {
    #[default]
    Parent,
    Arguments,
    Throws,
}

#[derive(Debug, Clone, Copy, Default)]
struct LowerState {
    type_slot: TypeSlot,
    field_slot: FieldSlot,
}

impl LowerState {
    fn of(input: &VisitInput<'_, AstId, LowerState>) -> LowerState {
        input.state.copied().unwrap_or_default()
    }

    fn with_type_slot(mut self, slot: TypeSlot) -> Self {
        self.type_slot = slot;
        self
    }

    fn with_field_slot(mut self, slot: FieldSlot) -> Self {
        self.field_slot = slot;
        self
    }
}

/// A type position: its discriminator plus the arena id of its detail node,
/// if the type has one.
#[derive(Debug, Clone, Copy, Default)]
struct TypeRef {
    type_id: TypeId,
    detail: Option<AstId>,
}

#[derive(Debug, Clone)]
enum DetailNode {
    Ref { name: String },
    Map { key: TypeRef, value: TypeRef },
    List { element: TypeRef },
    Set { element: TypeRef },
}

#[derive(Debug, Clone)]
enum ValueNode {
    Boolean(bool),
    Number(f64),
    Text(String),
    Ref(String),
    List(Vec<AstId>),
    Map(Vec<AstId>),
    Entry {
        key: Option<AstId>,
        value: Option<AstId>,
    },
    Stub,
}

#[derive(Debug, Clone)]
enum Node {
    Document {
        namespaces: Vec<AstId>,
        includes: Vec<String>,
        enums: Vec<AstId>,
        typedefs: Vec<AstId>,
        structs: Vec<AstId>,
        constants: Vec<AstId>,
        services: Vec<AstId>,
    },
    Namespace {
        name: String,
        value: String,
        annotations: Annotations,
    },
    Enum {
        name: String,
        doc: Option<String>,
        members: Vec<AstId>,
        annotations: Annotations,
    },
    Member {
        name: String,
        value: i64,
    },
    Typedef {
        name: String,
        ty: TypeRef,
        annotations: Annotations,
    },
    Struct {
        name: String,
        is_exception: bool,
        is_union: bool,
        fields: Vec<AstId>,
        annotations: Annotations,
    },
    Field {
        key: i64,
        name: String,
        required: Requiredness,
        ty: TypeRef,
        value: Option<AstId>,
        annotations: Annotations,
    },
    Constant {
        name: String,
        ty: TypeRef,
        value: Option<AstId>,
        annotations: Annotations,
    },
    Service {
        name: String,
        extends: Option<String>,
        functions: Vec<AstId>,
        annotations: Annotations,
    },
    Function {
        name: String,
        oneway: bool,
        ret: TypeRef,
        arguments: Vec<AstId>,
        exceptions: Vec<AstId>,
        annotations: Annotations,
    },
    Value(ValueNode),
    Detail(DetailNode),
}

/// Builder context threaded through the walk.
struct AstArena {
    nodes: Vec<Node>,
}

const DOCUMENT: AstId = AstId(0);

impl AstArena {
    fn new() -> Self {
        AstArena {
            nodes: vec![Node::Document {
                namespaces: Vec::new(),
                includes: Vec::new(),
                enums: Vec::new(),
                typedefs: Vec::new(),
                structs: Vec::new(),
                constants: Vec::new(),
                services: Vec::new(),
            }],
        }
    }

    fn alloc(&mut self, node: Node) -> AstId {
        let id = AstId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn get(&self, id: AstId) -> &Node {
        &self.nodes[id.0]
    }

    fn get_mut(&mut self, id: AstId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn annotations_mut(&mut self, id: AstId) -> Option<&mut Annotations> {
        match self.get_mut(id) {
            Node::Namespace { annotations, .. }
            | Node::Enum { annotations, .. }
            | Node::Typedef { annotations, .. }
            | Node::Struct { annotations, .. }
            | Node::Field { annotations, .. }
            | Node::Constant { annotations, .. }
            | Node::Service { annotations, .. }
            | Node::Function { annotations, .. } => Some(annotations),
            _ => None,
        }
    }

    /// Writes a type into the slot of `target` selected by `slot`.
    fn set_type(&mut self, target: AstId, slot: TypeSlot, type_ref: TypeRef) {
        match (self.get_mut(target), slot) {
            (Node::Field { ty, .. }, _)
            | (Node::Constant { ty, .. }, _)
            | (Node::Typedef { ty, .. }, _) => *ty = type_ref,
            (Node::Function { ret, .. }, _) => *ret = type_ref,
            (Node::Detail(DetailNode::Map { key, .. }), TypeSlot::Key) => *key = type_ref,
            (Node::Detail(DetailNode::Map { value, .. }), TypeSlot::Value) => *value = type_ref,
            (Node::Detail(DetailNode::List { element }), _)
            | (Node::Detail(DetailNode::Set { element }), _) => *element = type_ref,
            _ => {}
        }
    }

    /// Attaches a freshly lowered constant value to its parent.
    fn attach_value(&mut self, parent: AstId, value: AstId) {
        match self.get_mut(parent) {
            Node::Constant { value: slot, .. } | Node::Field { value: slot, .. } => {
                *slot = Some(value);
            }
            Node::Value(ValueNode::List(items)) => items.push(value),
            Node::Value(ValueNode::Entry { key, value: val }) => {
                if key.is_none() {
                    *key = Some(value);
                } else if val.is_none() {
                    *val = Some(value);
                } else {
                    // Both slots filled means the walk visited a third
                    // constant under one map entry, which the grammar rules
                    // out. This is a lowering bug, not bad input.
                    panic!("map entry already has a key and a value");
                }
            }
            _ => {}
        }
    }
}

fn leading_doc(parents: &[&CstNode]) -> Option<String> {
    let definition = find_by_name(parents, NodeName::Rule(RuleName::Definition))?;
    extract_comments(definition, Some(CommentKind::Doc))
        .into_iter()
        .next()
        .map(|c| c.value.trim().to_string())
}

type Input<'t> = VisitInput<'t, AstId, LowerState>;
type Outcome = VisitOutcome<AstId, LowerState>;

// ---- type handlers ---------------------------------------------------------

fn on_type(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    if let Some(name) = input.node.identifier_of(0) {
        let detail = arena.alloc(Node::Detail(DetailNode::Ref {
            name: name.to_string(),
        }));
        let type_ref = TypeRef {
            type_id: TypeId::Ref,
            detail: Some(detail),
        };
        arena.set_type(*input.parent(), LowerState::of(&input).type_slot, type_ref);
        return Outcome::stop();
    }
    Outcome::pass()
}

fn on_base_type(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let type_id = match input.node.first_exists(&[
        TokenKind::Bool,
        TokenKind::Byte,
        TokenKind::I16,
        TokenKind::I32,
        TokenKind::I64,
        TokenKind::Double,
        TokenKind::Binary,
        TokenKind::String,
    ]) {
        Some(TokenKind::Bool) => TypeId::Bool,
        Some(TokenKind::Byte) => TypeId::I8,
        Some(TokenKind::I16) => TypeId::I16,
        Some(TokenKind::I32) => TypeId::I32,
        Some(TokenKind::I64) => TypeId::I64,
        Some(TokenKind::Double) => TypeId::Double,
        Some(TokenKind::Binary) => TypeId::Binary,
        Some(TokenKind::String) => TypeId::String,
        _ => TypeId::Unknown,
    };
    arena.set_type(
        *input.parent(),
        LowerState::of(&input).type_slot,
        TypeRef {
            type_id,
            detail: None,
        },
    );
    Outcome::stop()
}

fn on_map_type(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let detail = arena.alloc(Node::Detail(DetailNode::Map {
        key: TypeRef::default(),
        value: TypeRef::default(),
    }));
    arena.set_type(
        *input.parent(),
        LowerState::of(&input).type_slot,
        TypeRef {
            type_id: TypeId::Map,
            detail: Some(detail),
        },
    );
    Outcome::descend(detail)
}

fn on_map_key_type(_arena: &mut AstArena, input: Input<'_>) -> Outcome {
    Outcome::pass().with_state(LowerState::of(&input).with_type_slot(TypeSlot::Key))
}

fn on_map_value_type(_arena: &mut AstArena, input: Input<'_>) -> Outcome {
    Outcome::pass().with_state(LowerState::of(&input).with_type_slot(TypeSlot::Value))
}

fn on_list_type(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let detail = arena.alloc(Node::Detail(DetailNode::List {
        element: TypeRef::default(),
    }));
    arena.set_type(
        *input.parent(),
        LowerState::of(&input).type_slot,
        TypeRef {
            type_id: TypeId::List,
            detail: Some(detail),
        },
    );
    Outcome::descend(detail)
        .with_state(LowerState::of(&input).with_type_slot(TypeSlot::Element))
}

fn on_set_type(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let detail = arena.alloc(Node::Detail(DetailNode::Set {
        element: TypeRef::default(),
    }));
    arena.set_type(
        *input.parent(),
        LowerState::of(&input).type_slot,
        TypeRef {
            type_id: TypeId::Set,
            detail: Some(detail),
        },
    );
    Outcome::descend(detail)
        .with_state(LowerState::of(&input).with_type_slot(TypeSlot::Element))
}

// ---- annotations and headers ----------------------------------------------

fn on_annotation(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let name = match input.node.identifier_of(0) {
        Some(name) => name.to_string(),
        None => return Outcome::stop(),
    };
    let value = input
        .node
        .first_payload(&[TokenKind::StringLiteral])
        .and_then(|p| match p {
            Payload::Text(text) => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default();
    if let Some(annotations) = arena.annotations_mut(*input.parent()) {
        annotations.insert(name, value);
    }
    Outcome::stop()
}

fn on_include(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    if let Some(Payload::Text(path)) = input.node.first_payload(&[TokenKind::StringLiteral]) {
        let name = path.strip_suffix(".thrift").unwrap_or(path).to_string();
        if let Node::Document { includes, .. } = arena.get_mut(DOCUMENT) {
            includes.push(name);
        }
    }
    Outcome::stop()
}

fn on_namespace(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let wildcard = input.node.first_exists(&[TokenKind::Wildcard]).is_some();
    let (name, value) = if wildcard {
        ("*".to_string(), input.node.identifier_of(0))
    } else {
        (
            input.node.identifier_of(0).unwrap_or_default().to_string(),
            input.node.identifier_of(1),
        )
    };
    let id = arena.alloc(Node::Namespace {
        name,
        value: value.unwrap_or_default().to_string(),
        annotations: Annotations::new(),
    });
    if let Node::Document { namespaces, .. } = arena.get_mut(DOCUMENT) {
        namespaces.push(id);
    }
    // Not a leaf: annotations may follow.
    Outcome::descend(id)
}

// ---- definitions -----------------------------------------------------------

fn on_typedef(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let id = arena.alloc(Node::Typedef {
        name: input.node.identifier_of(0).unwrap_or_default().to_string(),
        ty: TypeRef::default(),
        annotations: Annotations::new(),
    });
    if let Node::Document { typedefs, .. } = arena.get_mut(DOCUMENT) {
        typedefs.push(id);
    }
    Outcome::descend(id)
}

fn on_enum(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let id = arena.alloc(Node::Enum {
        name: input.node.identifier_of(0).unwrap_or_default().to_string(),
        doc: leading_doc(input.parents),
        members: Vec::new(),
        annotations: Annotations::new(),
    });
    if let Node::Document { enums, .. } = arena.get_mut(DOCUMENT) {
        enums.push(id);
    }
    Outcome::descend(id)
}

fn on_enum_value(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let parent = *input.parent();
    let name = match input.node.identifier_of(0) {
        Some(name) => name.to_string(),
        None => return Outcome::stop(),
    };

    let assigned = input
        .node
        .first_payload(&[TokenKind::HexConst, TokenKind::IntegerConst])
        .and_then(|p| match p {
            Payload::Int(v) => Some(*v),
            _ => None,
        });

    // Unassigned members continue from the previous member's value, starting
    // at 1 when the enum has none yet.
    let value = assigned.unwrap_or_else(|| {
        let last = match arena.get(parent) {
            Node::Enum { members, .. } => members.last().copied(),
            _ => None,
        };
        match last.map(|id| arena.get(id)) {
            Some(Node::Member { value, .. }) => value + 1,
            _ => 1,
        }
    });

    let member = arena.alloc(Node::Member { name, value });
    if let Node::Enum { members, .. } = arena.get_mut(parent) {
        members.push(member);
    }
    Outcome::stop()
}

fn on_const(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let id = arena.alloc(Node::Constant {
        name: input.node.identifier_of(0).unwrap_or_default().to_string(),
        ty: TypeRef::default(),
        value: None,
        annotations: Annotations::new(),
    });
    if let Node::Document { constants, .. } = arena.get_mut(DOCUMENT) {
        constants.push(id);
    }
    Outcome::descend(id)
}

fn struct_like(arena: &mut AstArena, input: &Input<'_>, is_exception: bool, is_union: bool) -> Outcome {
    let id = arena.alloc(Node::Struct {
        name: input.node.identifier_of(0).unwrap_or_default().to_string(),
        is_exception,
        is_union,
        fields: Vec::new(),
        annotations: Annotations::new(),
    });
    if let Node::Document { structs, .. } = arena.get_mut(DOCUMENT) {
        structs.push(id);
    }
    Outcome::descend(id)
}

fn on_struct(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    struct_like(arena, &input, false, false)
}

fn on_exception(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    struct_like(arena, &input, true, false)
}

fn on_union(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    struct_like(arena, &input, false, true)
}

fn on_service(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let extends = input
        .node
        .first_exists(&[TokenKind::Extends])
        .and_then(|_| input.node.identifier_of(1))
        .map(str::to_string);
    let id = arena.alloc(Node::Service {
        name: input.node.identifier_of(0).unwrap_or_default().to_string(),
        extends,
        functions: Vec::new(),
        annotations: Annotations::new(),
    });
    if let Node::Document { services, .. } = arena.get_mut(DOCUMENT) {
        services.push(id);
    }
    Outcome::descend(id)
}

// ---- fields and functions --------------------------------------------------

fn on_field(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    // A comment-only field has no identifier; nothing to lower.
    let name = match input.node.identifier_of(0) {
        Some(name) => name.to_string(),
        None => return Outcome::stop(),
    };

    let state = LowerState::of(&input);
    let parent = *input.parent();
    let id = arena.alloc(Node::Field {
        key: -1,
        name,
        required: Requiredness::ReqOut,
        ty: TypeRef::default(),
        value: None,
        annotations: Annotations::new(),
    });

    match (arena.get_mut(parent), state.field_slot) {
        (Node::Function { arguments, .. }, FieldSlot::Arguments) => arguments.push(id),
        (Node::Function { exceptions, .. }, FieldSlot::Throws) => exceptions.push(id),
        (Node::Struct { fields, .. }, _) => fields.push(id),
        _ => {}
    }

    // The field's own type goes into its default slot regardless of the
    // enclosing function's return-type slot.
    Outcome::descend(id).with_state(state.with_type_slot(TypeSlot::Default))
}

fn on_field_id(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    if let Some(Payload::Int(id)) = input.node.first_payload(&[TokenKind::IntegerConst]) {
        if let Node::Field { key, .. } = arena.get_mut(*input.parent()) {
            *key = *id;
        }
    }
    Outcome::stop()
}

fn on_field_req(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let required = match input
        .node
        .first_exists(&[TokenKind::Optional, TokenKind::Required])
    {
        Some(TokenKind::Optional) => Requiredness::Optional,
        Some(TokenKind::Required) => Requiredness::Required,
        _ => Requiredness::ReqOut,
    };
    if let Node::Field { required: slot, .. } = arena.get_mut(*input.parent()) {
        *slot = required;
    }
    Outcome::stop()
}

fn on_function(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let oneway = input.node.first_exists(&[TokenKind::OneWay]).is_some();
    let id = arena.alloc(Node::Function {
        name: input.node.identifier_of(0).unwrap_or_default().to_string(),
        oneway,
        ret: TypeRef {
            type_id: TypeId::Void,
            detail: None,
        },
        arguments: Vec::new(),
        exceptions: Vec::new(),
        annotations: Annotations::new(),
    });
    if let Node::Service { functions, .. } = arena.get_mut(*input.parent()) {
        functions.push(id);
    }
    Outcome::descend(id).with_state(
        LowerState::of(&input)
            .with_type_slot(TypeSlot::Return)
            .with_field_slot(FieldSlot::Arguments),
    )
}

fn on_function_throws(_arena: &mut AstArena, input: Input<'_>) -> Outcome {
    Outcome::pass().with_state(LowerState::of(&input).with_field_slot(FieldSlot::Throws))
}

// ---- constant values -------------------------------------------------------

fn on_const_value(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    let parent = *input.parent();

    let value = if let Some(identifier) = input.node.identifier_of(0) {
        ValueNode::Ref(identifier.to_string())
    } else {
        match input.node.first_payload(&[
            TokenKind::StringLiteral,
            TokenKind::HexConst,
            TokenKind::IntegerConst,
            TokenKind::DoubleConst,
            TokenKind::BooleanConst,
        ]) {
            Some(Payload::Text(text)) => ValueNode::Text(text.clone()),
            Some(Payload::Int(v)) => ValueNode::Number(*v as f64),
            Some(Payload::Double(v)) => ValueNode::Number(*v),
            Some(Payload::Bool(v)) => ValueNode::Boolean(*v),
            // No literal at this level: a list or map child will overwrite
            // the stub in place.
            None => ValueNode::Stub,
        }
    };

    let stop = !matches!(value, ValueNode::Stub);
    let id = arena.alloc(Node::Value(value));
    arena.attach_value(parent, id);

    let outcome = Outcome::descend(id);
    if stop {
        Outcome::stop()
    } else {
        outcome
    }
}

fn on_list_const(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    *arena.get_mut(*input.parent()) = Node::Value(ValueNode::List(Vec::new()));
    Outcome::pass()
}

fn on_map_const(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    *arena.get_mut(*input.parent()) = Node::Value(ValueNode::Map(Vec::new()));
    Outcome::pass()
}

fn on_map_value(arena: &mut AstArena, input: Input<'_>) -> Outcome {
    // Comment-only entries parse as a MapValue with no key or value slot.
    if !input.node.has_slot(SlotName::Label(LabelName::MapKey)) {
        return Outcome::stop();
    }

    let entry = arena.alloc(Node::Value(ValueNode::Entry {
        key: None,
        value: None,
    }));
    if let Node::Value(ValueNode::Map(entries)) = arena.get_mut(*input.parent()) {
        entries.push(entry);
    }
    Outcome::descend(entry)
}

// ---- finalization ----------------------------------------------------------

impl AstArena {
    fn resolve_value(&self, id: AstId) -> ConstValue {
        match self.get(id) {
            Node::Value(ValueNode::Boolean(v)) => ConstValue::Boolean { value: *v },
            Node::Value(ValueNode::Number(v)) => ConstValue::Number { value: *v },
            Node::Value(ValueNode::Text(v)) => ConstValue::String { value: v.clone() },
            Node::Value(ValueNode::Ref(identifier)) => ConstValue::Ref {
                identifier: identifier.clone(),
            },
            Node::Value(ValueNode::List(items)) => ConstValue::List {
                value: items.iter().map(|&i| self.resolve_value(i)).collect(),
            },
            Node::Value(ValueNode::Map(entries)) => ConstValue::Map {
                value: entries
                    .iter()
                    .filter_map(|&e| match self.get(e) {
                        Node::Value(ValueNode::Entry { key, value }) => Some(MapEntry {
                            key: key
                                .map(|k| self.resolve_value(k))
                                .unwrap_or(ConstValue::Stub),
                            value: value
                                .map(|v| self.resolve_value(v))
                                .unwrap_or(ConstValue::Stub),
                        }),
                        _ => None,
                    })
                    .collect(),
            },
            _ => ConstValue::Stub,
        }
    }

    fn resolve_detail(&self, id: AstId) -> Option<TypeDetail> {
        match self.get(id) {
            Node::Detail(DetailNode::Ref { name }) => Some(TypeDetail::Ref { name: name.clone() }),
            Node::Detail(DetailNode::Map { key, value }) => Some(TypeDetail::Map {
                key_type_id: key.type_id,
                key_type: key.detail.and_then(|d| self.resolve_detail(d)).map(Box::new),
                value_type_id: value.type_id,
                value_type: value
                    .detail
                    .and_then(|d| self.resolve_detail(d))
                    .map(Box::new),
            }),
            Node::Detail(DetailNode::List { element }) => Some(TypeDetail::List {
                element_type_id: element.type_id,
                element_type: element
                    .detail
                    .and_then(|d| self.resolve_detail(d))
                    .map(Box::new),
            }),
            Node::Detail(DetailNode::Set { element }) => Some(TypeDetail::Set {
                element_type_id: element.type_id,
                element_type: element
                    .detail
                    .and_then(|d| self.resolve_detail(d))
                    .map(Box::new),
            }),
            _ => None,
        }
    }

    fn resolve_type(&self, ty: TypeRef) -> TypeInfo {
        TypeInfo {
            type_id: ty.type_id,
            detail: ty.detail.and_then(|d| self.resolve_detail(d)).map(Box::new),
        }
    }

    fn resolve_field(&self, id: AstId) -> Option<ast::Field> {
        match self.get(id) {
            Node::Field {
                key,
                name,
                required,
                ty,
                value,
                annotations,
            } => Some(ast::Field {
                key: *key,
                name: name.clone(),
                required: *required,
                ty: self.resolve_type(*ty),
                value: value.map(|v| self.resolve_value(v)),
                annotations: annotations.clone(),
            }),
            _ => None,
        }
    }

    fn finalize(&self) -> Document {
        let Node::Document {
            namespaces,
            includes,
            enums,
            typedefs,
            structs,
            constants,
            services,
        } = self.get(DOCUMENT)
        else {
            return Document::default();
        };

        let mut document = Document {
            includes: includes.clone(),
            ..Document::default()
        };

        for &id in namespaces {
            if let Node::Namespace {
                name,
                value,
                annotations,
            } = self.get(id)
            {
                document.namespaces.push(ast::Namespace {
                    name: name.clone(),
                    value: value.clone(),
                    annotations: annotations.clone(),
                });
            }
        }

        for &id in enums {
            if let Node::Enum {
                name,
                doc,
                members,
                annotations,
            } = self.get(id)
            {
                document.enums.push(ast::Enum {
                    name: name.clone(),
                    doc: doc.clone(),
                    members: members
                        .iter()
                        .filter_map(|&m| match self.get(m) {
                            Node::Member { name, value } => Some(ast::EnumMember {
                                name: name.clone(),
                                value: *value,
                            }),
                            _ => None,
                        })
                        .collect(),
                    annotations: annotations.clone(),
                });
            }
        }

        for &id in typedefs {
            if let Node::Typedef {
                name,
                ty,
                annotations,
            } = self.get(id)
            {
                document.typedefs.push(ast::Typedef {
                    name: name.clone(),
                    ty: self.resolve_type(*ty),
                    annotations: annotations.clone(),
                });
            }
        }

        for &id in structs {
            if let Node::Struct {
                name,
                is_exception,
                is_union,
                fields,
                annotations,
            } = self.get(id)
            {
                document.structs.push(ast::Struct {
                    name: name.clone(),
                    is_exception: *is_exception,
                    is_union: *is_union,
                    fields: fields.iter().filter_map(|&f| self.resolve_field(f)).collect(),
                    annotations: annotations.clone(),
                });
            }
        }

        for &id in constants {
            if let Node::Constant {
                name,
                ty,
                value,
                annotations,
            } = self.get(id)
            {
                document.constants.push(ast::Constant {
                    name: name.clone(),
                    ty: self.resolve_type(*ty),
                    value: value
                        .map(|v| self.resolve_value(v))
                        .unwrap_or(ConstValue::Stub),
                    annotations: annotations.clone(),
                });
            }
        }

        for &id in services {
            if let Node::Service {
                name,
                extends,
                functions,
                annotations,
            } = self.get(id)
            {
                document.services.push(ast::Service {
                    name: name.clone(),
                    extends: extends.clone(),
                    functions: functions
                        .iter()
                        .filter_map(|&f| match self.get(f) {
                            Node::Function {
                                name,
                                oneway,
                                ret,
                                arguments,
                                exceptions,
                                annotations,
                            } => Some(ast::Function {
                                name: name.clone(),
                                return_type_id: ret.type_id,
                                return_type: ret
                                    .detail
                                    .and_then(|d| self.resolve_detail(d))
                                    .map(Box::new),
                                oneway: *oneway,
                                arguments: arguments
                                    .iter()
                                    .filter_map(|&a| self.resolve_field(a))
                                    .collect(),
                                exceptions: exceptions
                                    .iter()
                                    .filter_map(|&e| self.resolve_field(e))
                                    .collect(),
                                annotations: annotations.clone(),
                            }),
                            _ => None,
                        })
                        .collect(),
                    annotations: annotations.clone(),
                });
            }
        }

        document
    }
}

/// The lowered document plus walk statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Lowering {
    pub document: Document,
    pub report: WalkReport,
}

fn build_fold() -> TreeFold<AstArena, AstId, LowerState> {
    TreeFold::new()
        .on(NodeName::Rule(RuleName::Type), on_type)
        .on(NodeName::Rule(RuleName::BaseType), on_base_type)
        .on(NodeName::Rule(RuleName::MapType), on_map_type)
        .on(NodeName::Rule(RuleName::MapKeyType), on_map_key_type)
        .on(NodeName::Rule(RuleName::MapValueType), on_map_value_type)
        .on(NodeName::Rule(RuleName::ListType), on_list_type)
        .on(NodeName::Rule(RuleName::SetType), on_set_type)
        .on(NodeName::Rule(RuleName::Annotation), on_annotation)
        .on(NodeName::Rule(RuleName::Include), on_include)
        .on(NodeName::Rule(RuleName::Namespace), on_namespace)
        .on(NodeName::Rule(RuleName::TypeDef), on_typedef)
        .on(NodeName::Rule(RuleName::Enum), on_enum)
        .on(NodeName::Rule(RuleName::EnumValue), on_enum_value)
        .on(NodeName::Rule(RuleName::Const), on_const)
        .on(NodeName::Rule(RuleName::ConstValue), on_const_value)
        .on(NodeName::Rule(RuleName::ListConst), on_list_const)
        .on(NodeName::Rule(RuleName::MapConst), on_map_const)
        .on(NodeName::Rule(RuleName::MapValue), on_map_value)
        .on(NodeName::Rule(RuleName::Struct), on_struct)
        .on(NodeName::Rule(RuleName::Exception), on_exception)
        .on(NodeName::Rule(RuleName::Union), on_union)
        .on(NodeName::Rule(RuleName::Service), on_service)
        .on(NodeName::Rule(RuleName::Field), on_field)
        .on(NodeName::Rule(RuleName::FieldId), on_field_id)
        .on(NodeName::Rule(RuleName::FieldReq), on_field_req)
        .on(NodeName::Rule(RuleName::Function), on_function)
        .on(NodeName::Rule(RuleName::FunctionThrows), on_function_throws)
}

/// Lowers a parsed CST into the typed document AST.
pub fn lower(cst: &CstNode) -> Lowering {
    let fold = build_fold();
    let mut arena = AstArena::new();
    let report = fold.run(cst, &mut arena, Some(DOCUMENT), None);
    Lowering {
        document: arena.finalize(),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ThriftGrammar;

    fn lower_source(source: &str) -> Document {
        let parsed = ThriftGrammar::new().parse(source);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        lower(&parsed.cst).document
    }

    #[test]
    fn enum_members_auto_increment_from_last_value() {
        let doc = lower_source("enum E { A, B = 5, C, D = 0x10, E2 }");
        let values: Vec<i64> = doc.enums[0].members.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![1, 5, 6, 16, 17]);
    }

    #[test]
    fn enum_doc_comment_is_extracted() {
        // A header first: comments at the very top of a document attach to
        // the document, not the first definition.
        let doc = lower_source("namespace rs demo\n/** Color choices */\nenum Color { RED }");
        assert_eq!(doc.enums[0].doc.as_deref(), Some("Color choices"));
    }

    #[test]
    fn struct_fields_carry_id_requiredness_and_type() {
        let doc = lower_source("struct P { 1: required i32 x\n 2: optional string label }");
        let s = &doc.structs[0];
        assert_eq!(s.name, "P");
        assert!(!s.is_exception);
        assert_eq!(s.fields[0].key, 1);
        assert_eq!(s.fields[0].required, Requiredness::Required);
        assert_eq!(s.fields[0].ty.type_id, TypeId::I32);
        assert_eq!(s.fields[1].required, Requiredness::Optional);
        assert_eq!(s.fields[1].ty.type_id, TypeId::String);
    }

    #[test]
    fn exception_and_union_set_flags() {
        let doc = lower_source("exception Err { 1: string why }\nunion U { 1: i32 a }");
        assert!(doc.structs[0].is_exception);
        assert!(doc.structs[1].is_union);
    }

    #[test]
    fn nested_container_types_resolve_recursively() {
        let doc = lower_source("struct S { 1: map<string, list<i32>> m }");
        let ty = &doc.structs[0].fields[0].ty;
        assert_eq!(ty.type_id, TypeId::Map);
        let Some(detail) = ty.detail.as_deref() else {
            panic!("missing map detail");
        };
        let TypeDetail::Map {
            key_type_id,
            value_type_id,
            value_type,
            ..
        } = detail
        else {
            panic!("expected map detail");
        };
        assert_eq!(*key_type_id, TypeId::String);
        assert_eq!(*value_type_id, TypeId::List);
        let Some(TypeDetail::List {
            element_type_id, ..
        }) = value_type.as_deref()
        else {
            panic!("expected list value detail");
        };
        assert_eq!(*element_type_id, TypeId::I32);
    }

    #[test]
    fn function_return_and_argument_types_stay_separate() {
        let doc = lower_source("service S { list<string> names(1: i32 limit) }");
        let function = &doc.services[0].functions[0];
        assert_eq!(function.return_type_id, TypeId::List);
        assert_eq!(function.arguments[0].ty.type_id, TypeId::I32);
        assert_eq!(function.arguments[0].key, 1);
    }

    #[test]
    fn throws_fields_land_in_exceptions() {
        let doc = lower_source(
            "service S { void go(1: i32 a) throws (1: Fail f, 2: Worse w) }",
        );
        let function = &doc.services[0].functions[0];
        assert!(!function.oneway);
        assert_eq!(function.return_type_id, TypeId::Void);
        assert_eq!(function.arguments.len(), 1);
        assert_eq!(function.exceptions.len(), 2);
        assert_eq!(function.exceptions[0].ty.type_id, TypeId::Ref);
    }

    #[test]
    fn oneway_void_function() {
        let doc = lower_source("service S { oneway void ping() }");
        let function = &doc.services[0].functions[0];
        assert!(function.oneway);
        assert_eq!(function.return_type_id, TypeId::Void);
    }

    #[test]
    fn const_scalar_values() {
        let doc = lower_source(
            "const i32 A = 5\nconst double B = 1.5\nconst string C = \"hi\"\nconst bool D = true\nconst i32 E = OTHER",
        );
        let values: Vec<&ConstValue> = doc.constants.iter().map(|c| &c.value).collect();
        assert_eq!(values[0], &ConstValue::Number { value: 5.0 });
        assert_eq!(values[1], &ConstValue::Number { value: 1.5 });
        assert_eq!(
            values[2],
            &ConstValue::String {
                value: "hi".to_string()
            }
        );
        assert_eq!(values[3], &ConstValue::Boolean { value: true });
        assert_eq!(
            values[4],
            &ConstValue::Ref {
                identifier: "OTHER".to_string()
            }
        );
    }

    #[test]
    fn const_collections_nest() {
        let doc = lower_source(
            r#"const map<string, list<i32>> M = { "a": [1, 2], "b": [] }"#,
        );
        let ConstValue::Map { value: entries } = &doc.constants[0].value else {
            panic!("expected map constant");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].key,
            ConstValue::String {
                value: "a".to_string()
            }
        );
        let ConstValue::List { value: items } = &entries[0].value else {
            panic!("expected list value");
        };
        assert_eq!(items.len(), 2);
        let ConstValue::List { value: empty } = &entries[1].value else {
            panic!("expected list value");
        };
        assert!(empty.is_empty());
    }

    #[test]
    fn include_names_drop_the_extension() {
        let doc = lower_source("include \"shared.thrift\"\ninclude \"other.idl\"");
        assert_eq!(doc.includes, vec!["shared", "other.idl"]);
    }

    #[test]
    fn namespaces_with_and_without_wildcard() {
        let doc = lower_source("namespace rs mycrate\nnamespace * everywhere");
        assert_eq!(doc.namespaces[0].name, "rs");
        assert_eq!(doc.namespaces[0].value, "mycrate");
        assert_eq!(doc.namespaces[1].name, "*");
        assert_eq!(doc.namespaces[1].value, "everywhere");
    }

    #[test]
    fn annotations_attach_to_their_definition() {
        let doc = lower_source(r#"struct S { 1: i32 x } (final = "true")"#);
        assert_eq!(
            doc.structs[0].annotations.get("final").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn typedef_lowers_its_type() {
        let doc = lower_source("typedef map<i32, string> IdMap");
        assert_eq!(doc.typedefs[0].name, "IdMap");
        assert_eq!(doc.typedefs[0].ty.type_id, TypeId::Map);
    }

    #[test]
    fn field_defaults_are_kept() {
        let doc = lower_source("struct S { 1: i32 x = 7 }");
        assert_eq!(
            doc.structs[0].fields[0].value,
            Some(ConstValue::Number { value: 7.0 })
        );
    }

    #[test]
    fn lowering_is_deterministic() {
        let source = "enum E { A, B }\nstruct S { 1: E e }\nservice V { E get(1: i32 k) }";
        assert_eq!(lower_source(source), lower_source(source));
    }

    #[test]
    fn partial_const_yields_stub_value() {
        let parsed = ThriftGrammar::new().parse("const i32 x = ;");
        assert!(!parsed.errors.is_empty());
        let doc = lower(&parsed.cst).document;
        assert_eq!(doc.constants[0].value, ConstValue::Stub);
    }
}

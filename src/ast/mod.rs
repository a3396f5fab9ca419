//! Typed abstract syntax tree produced by lowering a parsed document.
//!
//! The serialized form is the public contract: every node carries a `node`
//! discriminator, type references carry a `typeId` plus an optional nested
//! `type` object for containers and references, and constant values carry a
//! `node` tag of their own. Optional fields are omitted entirely when unset
//! so consumers can rely on key presence.

use std::collections::BTreeMap;

use serde::Serialize;

/// Annotation key-value pairs, ordered by key for stable output.
pub type Annotations = BTreeMap<String, String>;

fn no_annotations(map: &Annotations) -> bool {
    map.is_empty()
}

/// Discriminator for every type position (`typeId`, `keyTypeId`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum TypeId {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "ref")]
    Ref,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "i8")]
    I8,
    #[serde(rename = "i16")]
    I16,
    #[serde(rename = "i32")]
    I32,
    #[serde(rename = "i64")]
    I64,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "binary")]
    Binary,
    #[serde(rename = "map")]
    Map,
    #[serde(rename = "list")]
    List,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "void")]
    Void,
}

/// Structured payload accompanying non-scalar type ids. Base types carry no
/// detail; references and containers do, recursively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "typeId")]
pub enum TypeDetail {
    #[serde(rename = "ref")]
    Ref { name: String },
    #[serde(rename = "map")]
    Map {
        #[serde(rename = "keyTypeId")]
        key_type_id: TypeId,
        #[serde(rename = "keyType", skip_serializing_if = "Option::is_none")]
        key_type: Option<Box<TypeDetail>>,
        #[serde(rename = "valueTypeId")]
        value_type_id: TypeId,
        #[serde(rename = "valueType", skip_serializing_if = "Option::is_none")]
        value_type: Option<Box<TypeDetail>>,
    },
    #[serde(rename = "list")]
    List {
        #[serde(rename = "elementTypeId")]
        element_type_id: TypeId,
        #[serde(rename = "elementType", skip_serializing_if = "Option::is_none")]
        element_type: Option<Box<TypeDetail>>,
    },
    #[serde(rename = "set")]
    Set {
        #[serde(rename = "elementTypeId")]
        element_type_id: TypeId,
        #[serde(rename = "elementType", skip_serializing_if = "Option::is_none")]
        element_type: Option<Box<TypeDetail>>,
    },
}

/// A `typeId`/`type` pair as embedded in fields, constants, and typedefs.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TypeInfo {
    #[serde(rename = "typeId")]
    pub type_id: TypeId,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub detail: Option<Box<TypeDetail>>,
}

impl TypeInfo {
    pub fn unknown() -> Self {
        TypeInfo::default()
    }

    pub fn void() -> Self {
        TypeInfo {
            type_id: TypeId::Void,
            detail: None,
        }
    }
}

/// A constant value expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node")]
pub enum ConstValue {
    #[serde(rename = "booleanValue")]
    Boolean { value: bool },
    #[serde(rename = "numberValue")]
    Number { value: f64 },
    #[serde(rename = "stringValue")]
    String { value: String },
    #[serde(rename = "refValue")]
    Ref { identifier: String },
    #[serde(rename = "listValue")]
    List { value: Vec<ConstValue> },
    #[serde(rename = "mapValue")]
    Map { value: Vec<MapEntry> },
    /// Placeholder for a value position the source never filled, e.g. behind
    /// a syntax error.
    #[serde(rename = "stubValue")]
    Stub,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "mapValueElement")]
pub struct MapEntry {
    pub key: ConstValue,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "namespace")]
pub struct Namespace {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "member")]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "enum")]
pub struct Enum {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub members: Vec<EnumMember>,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "typedef")]
pub struct Typedef {
    pub name: String,
    #[serde(flatten)]
    pub ty: TypeInfo,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

/// Field requiredness. `req_out` is Thrift's default when neither keyword is
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Requiredness {
    #[serde(rename = "required")]
    Required,
    #[serde(rename = "optional")]
    Optional,
    #[default]
    #[serde(rename = "req_out")]
    ReqOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "field")]
pub struct Field {
    /// Field id, or -1 when the source omits one.
    pub key: i64,
    pub name: String,
    pub required: Requiredness,
    #[serde(flatten)]
    pub ty: TypeInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ConstValue>,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

/// Structs, unions, and exceptions share one shape, distinguished by flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "struct")]
pub struct Struct {
    pub name: String,
    #[serde(rename = "isException")]
    pub is_exception: bool,
    #[serde(rename = "isUnion")]
    pub is_union: bool,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "const")]
pub struct Constant {
    pub name: String,
    #[serde(flatten)]
    pub ty: TypeInfo,
    pub value: ConstValue,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "function")]
pub struct Function {
    pub name: String,
    #[serde(rename = "returnTypeId")]
    pub return_type_id: TypeId,
    #[serde(rename = "returnType", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Box<TypeDetail>>,
    pub oneway: bool,
    pub arguments: Vec<Field>,
    pub exceptions: Vec<Field>,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "service")]
pub struct Service {
    pub name: String,
    #[serde(rename = "extends", skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    pub functions: Vec<Function>,
    #[serde(skip_serializing_if = "no_annotations")]
    pub annotations: Annotations,
}

/// The lowered document. Definition buckets preserve source order within
/// each kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename = "document")]
pub struct Document {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub namespaces: Vec<Namespace>,
    pub includes: Vec<String>,
    #[serde(rename = "enum")]
    pub enums: Vec<Enum>,
    pub typedefs: Vec<Typedef>,
    pub structs: Vec<Struct>,
    pub constants: Vec<Constant>,
    pub services: Vec<Service>,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            name: "UNKNOWN".to_string(),
            doc: None,
            namespaces: Vec::new(),
            includes: Vec::new(),
            enums: Vec::new(),
            typedefs: Vec::new(),
            structs: Vec::new(),
            constants: Vec::new(),
            services: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_pair_serializes_flat() {
        let field = Field {
            key: 1,
            name: "x".to_string(),
            required: Requiredness::Required,
            ty: TypeInfo {
                type_id: TypeId::I32,
                detail: None,
            },
            value: None,
            annotations: Annotations::new(),
        };
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({
                "node": "field",
                "key": 1,
                "name": "x",
                "required": "required",
                "typeId": "i32",
            })
        );
    }

    #[test]
    fn container_detail_nests_recursively() {
        let info = TypeInfo {
            type_id: TypeId::Map,
            detail: Some(Box::new(TypeDetail::Map {
                key_type_id: TypeId::String,
                key_type: None,
                value_type_id: TypeId::List,
                value_type: Some(Box::new(TypeDetail::List {
                    element_type_id: TypeId::I32,
                    element_type: None,
                })),
            })),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({
                "typeId": "map",
                "type": {
                    "typeId": "map",
                    "keyTypeId": "string",
                    "valueTypeId": "list",
                    "valueType": { "typeId": "list", "elementTypeId": "i32" },
                }
            })
        );
    }

    #[test]
    fn const_values_carry_node_tags() {
        let value = ConstValue::Map {
            value: vec![MapEntry {
                key: ConstValue::String {
                    value: "a".to_string(),
                },
                value: ConstValue::Number { value: 1.0 },
            }],
        };
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({
                "node": "mapValue",
                "value": [{
                    "node": "mapValueElement",
                    "key": { "node": "stringValue", "value": "a" },
                    "value": { "node": "numberValue", "value": 1.0 },
                }]
            })
        );
    }

    #[test]
    fn empty_document_shape() {
        let doc = Document::default();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["node"], "document");
        assert_eq!(value["name"], "UNKNOWN");
        assert!(value.get("doc").is_none());
        assert!(value["enum"].as_array().unwrap().is_empty());
    }
}

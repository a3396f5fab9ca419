//! TypeScript enum generator.
//!
//! A deliberately small second instantiation of the visitor engine: it only
//! registers handlers for enums and their members, and renders one
//! `export enum` declaration per Thrift enum. Member numbering follows the
//! same rule as lowering, so the emitted TypeScript agrees with the JSON
//! document for the same source.

use crate::diagnostics::TidlError;
use crate::grammar::cst::{CstNode, NodeName, RuleName};
use crate::grammar::token::{Payload, TokenKind};

use super::visit::{TreeFold, VisitInput, VisitOutcome};
use super::{Generator, GeneratorOutput, GeneratorResult};

#[derive(Debug, Default)]
struct EnumDecl {
    name: String,
    members: Vec<(String, i64)>,
}

#[derive(Debug, Default)]
struct Emitter {
    decls: Vec<EnumDecl>,
}

type Input<'t> = VisitInput<'t, usize, ()>;
type Outcome = VisitOutcome<usize, ()>;

fn on_enum(emitter: &mut Emitter, input: Input<'_>) -> Outcome {
    let name = input.node.identifier_of(0).unwrap_or_default().to_string();
    emitter.decls.push(EnumDecl {
        name,
        members: Vec::new(),
    });
    Outcome::descend(emitter.decls.len() - 1)
}

fn on_enum_value(emitter: &mut Emitter, input: Input<'_>) -> Outcome {
    let decl = &mut emitter.decls[*input.parent()];
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
    let value = assigned.unwrap_or_else(|| match decl.members.last() {
        Some((_, last)) => last + 1,
        None => 1,
    });

    decl.members.push((name, value));
    Outcome::stop()
}

fn render(decls: &[EnumDecl]) -> String {
    let mut out = String::new();
    for decl in decls {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("export enum {} {{\n", decl.name));
        for (name, value) in &decl.members {
            out.push_str(&format!("  {} = {},\n", name, value));
        }
        out.push_str("}\n");
    }
    out
}

/// Emits one TypeScript `export enum` per Thrift enum.
pub struct TsEnumGenerator;

impl Generator for TsEnumGenerator {
    fn name(&self) -> &'static str {
        "ts-enum"
    }

    fn process(&self, cst: &CstNode) -> Result<GeneratorResult, TidlError> {
        let fold = TreeFold::new()
            .on(NodeName::Rule(RuleName::Enum), on_enum)
            .on(NodeName::Rule(RuleName::EnumValue), on_enum_value);

        let mut emitter = Emitter::default();
        let report = fold.run(cst, &mut emitter, None, None);

        Ok(GeneratorResult {
            outputs: vec![GeneratorOutput::Text {
                contents: render(&emitter.decls),
                extension: "ts",
            }],
            errors: Vec::new(),
            warnings: Vec::new(),
            performance: vec![report.walk_time],
        })
    }
}

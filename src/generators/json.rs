//! JSON document generator: lower the CST, then serialize the document.

use crate::diagnostics::TidlError;
use crate::grammar::cst::CstNode;
use crate::timing::time;

use super::lower::lower;
use super::{Generator, GeneratorOutput, GeneratorResult};

/// Emits the lowered document both as a structured value and as
/// pretty-printed JSON text.
pub struct JsonGenerator;

impl Generator for JsonGenerator {
    fn name(&self) -> &'static str {
        "json"
    }

    fn process(&self, cst: &CstNode) -> Result<GeneratorResult, TidlError> {
        let lowering = lower(cst);

        let timer = time(Some("serialize"));
        let object = serde_json::to_value(&lowering.document)?;
        let contents = serde_json::to_string_pretty(&lowering.document)?;
        let serialize_time = timer.stop();

        Ok(GeneratorResult {
            outputs: vec![
                GeneratorOutput::Object(object),
                GeneratorOutput::Text {
                    contents,
                    extension: "json",
                },
            ],
            errors: Vec::new(),
            warnings: Vec::new(),
            performance: vec![lowering.report.walk_time, serialize_time],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ThriftGrammar;

    fn generate(source: &str) -> GeneratorResult {
        let parsed = ThriftGrammar::new().parse(source);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        JsonGenerator.process(&parsed.cst).unwrap()
    }

    #[test]
    fn document_shape_survives_serialization() {
        let result = generate(
            "namespace rs demo\nenum E { A = 3, B }\nstruct S { 1: required E e }",
        );
        let GeneratorOutput::Object(object) = &result.outputs[0] else {
            panic!("expected object output first");
        };

        assert_eq!(object["node"], "document");
        assert_eq!(object["name"], "UNKNOWN");
        assert_eq!(object["namespaces"][0]["name"], "rs");
        assert_eq!(object["enum"][0]["members"][1]["value"], 4);
        assert_eq!(object["structs"][0]["fields"][0]["typeId"], "ref");
        assert_eq!(object["structs"][0]["fields"][0]["type"]["name"], "E");
        assert_eq!(object["structs"][0]["fields"][0]["required"], "required");
    }

    #[test]
    fn text_output_is_pretty_printed_json() {
        let result = generate("enum E { A }");
        let text = result.outputs[1].as_text().unwrap();
        assert!(text.starts_with("{\n"));
        assert!(text.contains("\"node\": \"document\""));
        let reparsed: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(reparsed["enum"][0]["name"], "E");
    }

    #[test]
    fn absent_optionals_are_omitted_from_output() {
        let result = generate("struct S { 1: i32 x }");
        let GeneratorOutput::Object(object) = &result.outputs[0] else {
            panic!("expected object output first");
        };
        let field = &object["structs"][0]["fields"][0];
        assert!(field.get("value").is_none());
        assert!(field.get("annotations").is_none());
        assert!(field.get("type").is_none());
        assert_eq!(field["typeId"], "i32");
    }
}

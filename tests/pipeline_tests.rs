// End-to-end pipeline tests over the fixture files: source text through
// lexing, parsing, lowering, and generator output.

use tidl::ast::{ConstValue, Requiredness, TypeId};
use tidl::generators::{generator_for, lower, GeneratorOutput};
use tidl::ThriftGrammar;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/assets/{}", name)).unwrap()
}

#[test]
fn calculator_fixture_parses_cleanly() {
    let source = fixture("calculator.thrift");
    let parsed = ThriftGrammar::new().parse(&source);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
}

#[test]
fn calculator_fixture_lowers_to_the_expected_document() {
    let source = fixture("calculator.thrift");
    let parsed = ThriftGrammar::new().parse(&source);
    let document = lower(&parsed.cst).document;

    assert_eq!(document.includes, vec!["shared"]);

    assert_eq!(document.namespaces.len(), 2);
    assert_eq!(document.namespaces[0].name, "rs");
    assert_eq!(document.namespaces[0].value, "calculator");
    assert_eq!(document.namespaces[1].name, "*");
    assert_eq!(document.namespaces[1].value, "everywhere");

    let operation = &document.enums[0];
    assert_eq!(operation.name, "Operation");
    assert_eq!(operation.doc.as_deref(), Some("The four classic operations."));
    let values: Vec<i64> = operation.members.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![1, 2, 3, 4]);

    assert_eq!(document.typedefs[0].name, "MyInteger");
    assert_eq!(document.typedefs[0].ty.type_id, TypeId::I32);
    assert_eq!(document.typedefs[1].ty.type_id, TypeId::Map);

    // struct, union, exception land in the same bucket in source order
    let names: Vec<&str> = document.structs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Work", "Payload", "InvalidOperation"]);
    assert!(document.structs[1].is_union);
    assert!(document.structs[2].is_exception);

    let work = &document.structs[0];
    assert_eq!(work.fields[0].value, Some(ConstValue::Number { value: 0.0 }));
    assert_eq!(work.fields[3].required, Requiredness::Optional);
    assert_eq!(work.fields[2].ty.type_id, TypeId::Ref);

    assert_eq!(document.constants[0].name, "INT32CONSTANT");
    assert_eq!(
        document.constants[0].value,
        ConstValue::Number { value: 9853.0 }
    );
    let ConstValue::Map { value: entries } = &document.constants[1].value else {
        panic!("expected map constant");
    };
    assert_eq!(entries.len(), 2);
    let ConstValue::List { value: weights } = &document.constants[2].value else {
        panic!("expected list constant");
    };
    assert_eq!(weights.len(), 3);

    let calculator = &document.services[0];
    assert_eq!(calculator.extends.as_deref(), Some("shared.SharedService"));
    assert_eq!(calculator.functions.len(), 4);
    assert_eq!(calculator.functions[0].name, "ping");
    assert_eq!(calculator.functions[0].return_type_id, TypeId::Void);
    assert_eq!(calculator.functions[2].exceptions.len(), 1);
    assert_eq!(calculator.functions[2].exceptions[0].name, "ouch");
    assert!(calculator.functions[3].oneway);
}

#[test]
fn broken_fixture_recovers_and_keeps_later_definitions() {
    let source = fixture("broken.thrift");
    let parsed = ThriftGrammar::new().parse(&source);
    assert!(!parsed.errors.is_empty());

    let document = lower(&parsed.cst).document;
    // The nameless field is dropped; the enum after the bad struct survives.
    assert_eq!(document.structs[0].name, "Missing");
    assert!(document.structs[0].fields.is_empty());
    assert_eq!(document.enums[0].name, "Ok");
    assert_eq!(document.enums[0].members[0].value, 1);
}

#[test]
fn json_generator_round_trips_the_fixture() {
    let source = fixture("calculator.thrift");
    let parsed = ThriftGrammar::new().parse(&source);
    let result = generator_for("json")
        .unwrap()
        .process(&parsed.cst)
        .unwrap();

    let text = result
        .outputs
        .iter()
        .find_map(GeneratorOutput::as_text)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(value["node"], "document");
    assert_eq!(value["services"][0]["name"], "Calculator");
    assert_eq!(
        value["structs"][0]["fields"][3]["required"],
        "optional"
    );
    assert_eq!(value["enum"][0]["doc"], "The four classic operations.");
}

#[test]
fn ts_enum_generator_emits_typescript_for_the_fixture() {
    let source = fixture("calculator.thrift");
    let parsed = ThriftGrammar::new().parse(&source);
    let result = generator_for("ts-enum")
        .unwrap()
        .process(&parsed.cst)
        .unwrap();

    let text = result
        .outputs
        .iter()
        .find_map(GeneratorOutput::as_text)
        .unwrap();
    assert!(text.contains("export enum Operation {"));
    assert!(text.contains("  ADD = 1,"));
    assert!(text.contains("  DIVIDE = 4,"));
}

#[test]
fn lowering_twice_yields_equal_documents() {
    let source = fixture("calculator.thrift");
    let parsed = ThriftGrammar::new().parse(&source);
    assert_eq!(lower(&parsed.cst).document, lower(&parsed.cst).document);
}

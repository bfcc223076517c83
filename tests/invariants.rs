//! Contract Invariant Tests
//!
//! These tests verify the guarantees the compiler makes to its callers.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

use componentspec_core::{
    compile, platform_digest, ArgumentType, ArgumentValue, CommandToken, CompilationPipeline,
    ComponentSpecification, FieldType, PlatformSpecification, PlatformType, SchemaStore,
    SpecError,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn component(args: Value) -> Value {
    json!({
        "name": "Example component",
        "description": "Used by the invariant tests",
        "image": "ghcr.io/example/component:0.1",
        "args": args,
    })
}

#[test]
fn invariant_args_keep_declaration_order() {
    let spec = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();
    let names: Vec<_> = spec.args().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["model_id", "batch-size", "max_new_tokens", "temperature", "use_cache"]
    );

    let reversed = ComponentSpecification::new(&component(json!({
        "zeta": {"description": "z", "type": "str"},
        "alpha": {"description": "a", "type": "str"},
    })))
    .unwrap();
    assert_eq!(reversed.args()[0].name, "zeta");
    assert_eq!(reversed.args()[1].name, "alpha");
}

#[test]
fn invariant_component_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let original = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();

    let first = dir.path().join("first.yaml");
    original.to_file(&first).unwrap();
    let reloaded = ComponentSpecification::from_file(&first).unwrap();
    assert_eq!(reloaded.document(), original.document());

    let second = dir.path().join("second.yaml");
    reloaded.to_file(&second).unwrap();
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn invariant_compilation_is_deterministic() {
    let spec = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();

    let a = compile(&spec).unwrap();
    let b = compile(&spec).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_yaml_string().unwrap(), b.to_yaml_string().unwrap());
    assert_eq!(platform_digest(&a).unwrap(), platform_digest(&b).unwrap());
}

#[test]
fn invariant_compiles_to_expected_descriptor() {
    let spec = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();
    let compiled = spec.platform_specification().unwrap();
    let expected =
        PlatformSpecification::from_file(fixture("caption_component_compiled.yaml")).unwrap();
    assert_eq!(compiled, expected);
}

#[test]
fn invariant_known_types_translate_through_table() {
    for arg_type in ArgumentType::ALL {
        let spec = ComponentSpecification::new(&component(json!({
            "value": {"description": "typed", "type": arg_type.name()}
        })))
        .unwrap();
        let platform = compile(&spec).unwrap();
        assert_eq!(
            platform.input_arguments()["value"].platform_type,
            arg_type.platform_type()
        );
    }
}

#[test]
fn invariant_unknown_type_fails_compilation() {
    let spec = ComponentSpecification::from_file(fixture("unsupported_arg_type.yaml")).unwrap();
    let err = compile(&spec).unwrap_err();
    match err {
        SpecError::UnsupportedArgumentType { argument, type_name } => {
            assert_eq!(argument, "threshold");
            assert_eq!(type_name, "decimal");
        }
        other => panic!("expected UnsupportedArgumentType, got {other}"),
    }
}

#[test]
fn invariant_missing_name_is_rejected_with_path() {
    let err = ComponentSpecification::from_file(fixture("missing_name.yaml")).unwrap_err();
    match err {
        SpecError::SpecificationInvalid { path, message } => {
            assert_eq!(path, "/name");
            assert!(message.contains("'name' is a required property"));
        }
        other => panic!("expected SpecificationInvalid, got {other}"),
    }
}

#[test]
fn invariant_non_mapping_document_is_rejected() {
    let err = ComponentSpecification::new(&json!(["not", "a", "mapping"])).unwrap_err();
    assert!(matches!(err, SpecError::SpecificationInvalid { ref path, .. } if path.is_empty()));
}

#[test]
fn invariant_wrong_arg_shape_reports_nested_path() {
    let err = ComponentSpecification::new(&component(json!({
        "n": {"description": "count"}
    })))
    .unwrap_err();
    assert!(matches!(err, SpecError::SpecificationInvalid { ref path, .. } if path == "/args/n/type"));
}

#[test]
fn invariant_hyphenated_argument_normalization() {
    let spec = ComponentSpecification::new(&component(json!({
        "batch-size": {"description": "size", "type": "int"}
    })))
    .unwrap();
    let platform = compile(&spec).unwrap();

    let command = platform.command();
    let flag = command
        .iter()
        .position(|t| *t == CommandToken::literal("--batch-size"))
        .unwrap();
    assert_eq!(
        command[flag + 1],
        CommandToken::InputValue {
            input_value: "batch_size".to_string()
        }
    );

    let document = platform.document().unwrap();
    assert!(document["inputs"]
        .as_array()
        .unwrap()
        .contains(&json!({"name": "batch_size", "description": "size", "type": "Integer"})));
}

#[test]
fn invariant_normalized_collision_rejected_on_construction() {
    let err = ComponentSpecification::new(&component(json!({
        "max-tokens": {"description": "hyphen", "type": "int"},
        "max_tokens": {"description": "underscore", "type": "int"},
    })))
    .unwrap_err();
    assert!(err.is_document_error());
    assert!(matches!(err, SpecError::SpecificationInvalid { ref path, .. } if path == "/args/max_tokens"));
}

#[test]
fn invariant_subset_view() {
    let mut document = component(json!({}));
    document["input_subsets"] = json!({
        "points": {"fields": {"x": {"type": "int"}}, "additionalFields": false}
    });
    let spec = ComponentSpecification::new(&document).unwrap();

    let subset = &spec.input_subsets()["points"];
    assert!(!subset.additional_fields());
    assert_eq!(subset.fields().len(), 1);
    assert_eq!(subset.fields()["x"].field_type, FieldType::Int);
    assert_eq!(subset.fields(), spec.input_subsets()["points"].fields());
}

#[test]
fn invariant_sentinel_flags_from_fixture() {
    let spec = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();
    assert!(spec.accepts_additional_subsets());
    assert!(!spec.produces_additional_subsets());
    assert!(!spec.output_subsets().contains_key("additionalSubsets"));
    assert_eq!(spec.output_subsets()["captions"].fields()["text"].field_type, FieldType::Utf8);
}

#[test]
fn invariant_platform_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();
    let platform = compile(&spec).unwrap();

    let path = dir.path().join("kubeflow_component.yaml");
    platform.to_file(&path).unwrap();
    let reloaded = PlatformSpecification::from_file(&path).unwrap();
    assert_eq!(reloaded, platform);
    assert_eq!(
        reloaded.output_arguments()["output_manifest_path"].platform_type,
        PlatformType::String
    );
    assert_eq!(
        reloaded.parse_input_value("use_cache", "true").unwrap(),
        ArgumentValue::Boolean(true)
    );
}

#[test]
fn invariant_parallel_compilation_agrees() {
    let spec = ComponentSpecification::from_file(fixture("caption_component.yaml")).unwrap();
    let expected = platform_digest(&compile(&spec).unwrap()).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let local = spec.clone();
                scope.spawn(move || platform_digest(&compile(&local).unwrap()).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn invariant_schema_dir_matches_bundled() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas");
    let installed = CompilationPipeline::new(SchemaStore::from_dir(&dir).unwrap());
    let bundled = CompilationPipeline::bundled().unwrap();

    let text = fs::read_to_string(fixture("caption_component.yaml")).unwrap();
    let document: Value = serde_yaml_ng::from_str(&text).unwrap();

    let a = installed.compile_document(&document).unwrap();
    let b = bundled.compile_document(&document).unwrap();
    assert_eq!(a.digest, b.digest);
    assert_eq!(installed.schema().version(), bundled.schema().version());
}

//! Compilation Pipeline - Single Entry Point
//!
//! `compile` is a pure function of a validated specification: same input,
//! same bytes out. `CompilationPipeline::compile_document` always validates
//! before compiling. No bypass.

use serde::Serialize;
use serde_json::Value;

use crate::component::{Argument, ComponentSpecification};
use crate::error::Result;
use crate::hashing::platform_digest;
use crate::naming::{flag_name, parameter_name};
use crate::platform::{
    CommandToken, ContainerSpec, Implementation, Parameter, PlatformDocument,
    PlatformSpecification,
};
use crate::schema::{SchemaStore, SchemaViolation};
use crate::types::PlatformType;

pub const INPUT_MANIFEST_PARAMETER: &str = "input_manifest_path";
pub const OUTPUT_MANIFEST_PARAMETER: &str = "output_manifest_path";

/// Literal tokens every component container is invoked with.
pub const COMMAND_PREFIX: [&str; 2] = ["python3", "main.py"];

/// Compile a validated component specification into a platform step.
pub fn compile(spec: &ComponentSpecification) -> Result<PlatformSpecification> {
    let arguments = resolve_arguments(spec.args())?;

    let mut inputs = vec![Parameter {
        name: INPUT_MANIFEST_PARAMETER.to_string(),
        description: "Path to the input manifest".to_string(),
        platform_type: PlatformType::String,
    }];
    inputs.extend(arguments.iter().map(|(param, _)| param.clone()));

    let outputs = vec![Parameter {
        name: OUTPUT_MANIFEST_PARAMETER.to_string(),
        description: "Path to the output manifest".to_string(),
        platform_type: PlatformType::String,
    }];

    let mut command: Vec<CommandToken> =
        COMMAND_PREFIX.iter().map(|t| CommandToken::literal(*t)).collect();
    command.push(CommandToken::literal(flag_name(INPUT_MANIFEST_PARAMETER)));
    command.push(CommandToken::InputPath {
        input_path: INPUT_MANIFEST_PARAMETER.to_string(),
    });
    for (param, declared) in &arguments {
        command.push(CommandToken::literal(flag_name(&declared.name)));
        command.push(CommandToken::InputValue {
            input_value: param.name.clone(),
        });
    }
    command.push(CommandToken::literal(flag_name(OUTPUT_MANIFEST_PARAMETER)));
    command.push(CommandToken::OutputPath {
        output_path: OUTPUT_MANIFEST_PARAMETER.to_string(),
    });

    log::info!(
        "Compiled component `{}` into {} inputs and {} command tokens",
        spec.name(),
        inputs.len(),
        command.len()
    );

    Ok(PlatformSpecification::from_document(PlatformDocument {
        name: spec.name().to_string(),
        description: spec.description().to_string(),
        inputs,
        outputs,
        implementation: Implementation {
            container: ContainerSpec {
                image: spec.image().to_string(),
                command,
            },
        },
    }))
}

/// Translate every argument before anything is emitted, so a failure leaves nothing behind.
fn resolve_arguments(args: &[Argument]) -> Result<Vec<(Parameter, &Argument)>> {
    args.iter()
        .map(|arg| {
            let parameter = Parameter {
                name: parameter_name(&arg.name),
                description: arg.description.clone(),
                platform_type: arg.platform_type()?,
            };
            Ok((parameter, arg))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub schema_version: String,
    pub violations: Vec<SchemaViolation>,
}

#[derive(Debug, Clone)]
pub struct CompiledComponent {
    pub platform: PlatformSpecification,
    pub digest: String,
}

/// The compilation pipeline - validation and compilation against one schema store.
pub struct CompilationPipeline {
    schema: SchemaStore,
}

impl CompilationPipeline {
    pub fn new(schema: SchemaStore) -> Self {
        Self { schema }
    }

    pub fn bundled() -> Result<Self> {
        Ok(Self::new(SchemaStore::bundled()?.clone()))
    }

    pub fn schema(&self) -> &SchemaStore {
        &self.schema
    }

    /// Report every violation rather than stopping at the first.
    pub fn validate_document(&self, document: &Value) -> Result<ValidationReport> {
        let violations = self.schema.validate(document)?;
        Ok(ValidationReport {
            valid: violations.is_empty(),
            schema_version: self.schema.version().to_string(),
            violations,
        })
    }

    pub fn load(&self, document: &Value) -> Result<ComponentSpecification> {
        ComponentSpecification::with_schema(document, &self.schema)
    }

    pub fn compile_document(&self, document: &Value) -> Result<CompiledComponent> {
        let spec = self.load(document)?;
        let platform = compile(&spec)?;
        let digest = platform_digest(&platform)?;
        Ok(CompiledComponent { platform, digest })
    }
}

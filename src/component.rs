//! Component Specification - Validated Contracts
//!
//! A specification is validated when it is built and never changes after.
//! Accessors hand out shared references into typed state computed once at
//! construction; the raw document is a private copy kept for serialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::compiler;
use crate::error::{Result, SpecError};
use crate::naming::parameter_name;
use crate::platform::PlatformSpecification;
use crate::schema::SchemaStore;
use crate::types::{platform_type_for, FieldType, PlatformType};

/// Sentinel entry inside `input_subsets` / `output_subsets`.
pub const ADDITIONAL_SUBSETS_KEY: &str = "additionalSubsets";

fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub description: String,
    /// Declared type name, e.g. `int`. Checked against the type table at compile time.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Argument {
    pub fn platform_type(&self) -> Result<PlatformType> {
        platform_type_for(&self.name, &self.type_name)
    }
}

#[derive(Deserialize)]
struct FieldDocument {
    #[serde(rename = "type")]
    field_type: FieldType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubsetDocument {
    fields: BTreeMap<String, FieldDocument>,
    #[serde(default = "default_true")]
    additional_fields: bool,
}

#[derive(Deserialize)]
struct ArgumentDocument {
    description: String,
    #[serde(rename = "type")]
    type_name: String,
}

/// A named group of typed fields flowing into or out of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSubset {
    fields: BTreeMap<String, Field>,
    additional_fields: bool,
}

impl ComponentSubset {
    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Whether fields beyond the declared ones are tolerated.
    pub fn additional_fields(&self) -> bool {
        self.additional_fields
    }

    fn from_document(path: &str, value: &Value) -> Result<Self> {
        let doc: SubsetDocument = typed(path, value)?;
        let fields = doc
            .fields
            .into_iter()
            .map(|(name, field)| {
                let field = Field {
                    name: name.clone(),
                    field_type: field.field_type,
                };
                (name, field)
            })
            .collect();

        Ok(Self {
            fields,
            additional_fields: doc.additional_fields,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ComponentSpecification {
    document: Value,
    name: String,
    description: String,
    image: String,
    input_subsets: BTreeMap<String, ComponentSubset>,
    output_subsets: BTreeMap<String, ComponentSubset>,
    accepts_additional_subsets: bool,
    produces_additional_subsets: bool,
    args: Vec<Argument>,
}

impl ComponentSpecification {
    /// Validate `document` against the bundled schema and build the typed view.
    pub fn new(document: &Value) -> Result<Self> {
        Self::with_schema(document, SchemaStore::bundled()?)
    }

    pub fn with_schema(document: &Value, schema: &SchemaStore) -> Result<Self> {
        let document = document.clone();
        schema.ensure_valid(&document)?;

        let name = required_str(&document, "name")?;
        let description = required_str(&document, "description")?;
        let image = required_str(&document, "image")?;

        let (input_subsets, accepts_additional_subsets) =
            parse_subsets(&document, "input_subsets")?;
        let (output_subsets, produces_additional_subsets) =
            parse_subsets(&document, "output_subsets")?;
        let args = parse_args(&document)?;

        log::info!(
            "Validated component `{}` ({} args, {} input subsets, {} output subsets)",
            name,
            args.len(),
            input_subsets.len(),
            output_subsets.len()
        );

        Ok(Self {
            document,
            name,
            description,
            image,
            input_subsets,
            output_subsets,
            accepts_additional_subsets,
            produces_additional_subsets,
            args,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let document: Value = serde_yaml_ng::from_str(text)?;
        Self::new(&document)
    }

    /// Load the specification from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SpecError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(&self.document)?)
    }

    /// Dump the specification to a YAML file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_yaml_string()?;
        fs::write(path, text).map_err(|e| SpecError::io(path, e))
    }

    /// The validated source document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn input_subsets(&self) -> &BTreeMap<String, ComponentSubset> {
        &self.input_subsets
    }

    pub fn output_subsets(&self) -> &BTreeMap<String, ComponentSubset> {
        &self.output_subsets
    }

    pub fn accepts_additional_subsets(&self) -> bool {
        self.accepts_additional_subsets
    }

    pub fn produces_additional_subsets(&self) -> bool {
        self.produces_additional_subsets
    }

    /// Arguments in declaration order.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn platform_specification(&self) -> Result<PlatformSpecification> {
        compiler::compile(self)
    }
}

fn typed<T: for<'de> Deserialize<'de>>(path: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| SpecError::SpecificationInvalid {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn required_str(document: &Value, key: &str) -> Result<String> {
    document
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SpecError::SpecificationInvalid {
            path: format!("/{}", key),
            message: format!("'{}' is a required property", key),
        })
}

fn section<'a>(document: &'a Value, key: &str) -> Result<Option<&'a Map<String, Value>>> {
    match document.get(key) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(SpecError::SpecificationInvalid {
            path: format!("/{}", key),
            message: format!("{} is not of type 'object'", other),
        }),
    }
}

/// Split the sentinel flag from the real subsets. Absent flag means `true`.
fn parse_subsets(
    document: &Value,
    key: &str,
) -> Result<(BTreeMap<String, ComponentSubset>, bool)> {
    let Some(map) = section(document, key)? else {
        return Ok((BTreeMap::new(), true));
    };

    let mut subsets = BTreeMap::new();
    let mut additional = true;
    for (name, value) in map {
        let path = format!("/{}/{}", key, name);
        if name == ADDITIONAL_SUBSETS_KEY {
            additional = typed(&path, value)?;
            continue;
        }
        subsets.insert(name.clone(), ComponentSubset::from_document(&path, value)?);
    }
    Ok((subsets, additional))
}

/// Arguments in declaration order. Names must stay distinct after
/// normalization, including from the manifest parameters.
fn parse_args(document: &Value) -> Result<Vec<Argument>> {
    let Some(map) = section(document, "args")? else {
        return Ok(vec![]);
    };

    let mut taken: BTreeSet<String> = [
        compiler::INPUT_MANIFEST_PARAMETER,
        compiler::OUTPUT_MANIFEST_PARAMETER,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut args = Vec::with_capacity(map.len());
    for (name, value) in map {
        let path = format!("/args/{}", name);
        let doc: ArgumentDocument = typed(&path, value)?;
        let normalized = parameter_name(name);
        if !taken.insert(normalized.clone()) {
            return Err(SpecError::SpecificationInvalid {
                path,
                message: format!("argument name collides with parameter `{}`", normalized),
            });
        }
        args.push(Argument {
            name: name.clone(),
            description: doc.description,
            type_name: doc.type_name,
        });
    }
    Ok(args)
}

//! Platform Specification - compiled pipeline step descriptor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, SpecError};
use crate::types::{ArgumentValue, PlatformType};

/// One declared input or output slot of a compiled step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub platform_type: PlatformType,
}

/// A token of the container command: a literal or a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandToken {
    Literal(String),
    InputPath {
        #[serde(rename = "inputPath")]
        input_path: String,
    },
    OutputPath {
        #[serde(rename = "outputPath")]
        output_path: String,
    },
    InputValue {
        #[serde(rename = "inputValue")]
        input_value: String,
    },
}

impl CommandToken {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Parameter name referenced by a placeholder token.
    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::InputPath { input_path: name }
            | Self::OutputPath { output_path: name }
            | Self::InputValue { input_value: name } => Some(name.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<CommandToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub container: ContainerSpec,
}

/// Serialized shape of a platform specification. Field order is the output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDocument {
    pub name: String,
    pub description: String,
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
    pub implementation: Implementation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSpecification {
    document: PlatformDocument,
}

impl PlatformSpecification {
    /// Wrap an already compiled or deserialized document.
    pub fn from_document(document: PlatformDocument) -> Self {
        Self { document }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(Self::from_document(serde_yaml_ng::from_str(text)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SpecError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    /// YAML with keys in compiled order, never alphabetized.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(&self.document)?)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_yaml_string()?;
        fs::write(path, text).map_err(|e| SpecError::io(path, e))
    }

    pub fn document(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.document)?)
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn description(&self) -> &str {
        &self.document.description
    }

    pub fn inputs(&self) -> &[Parameter] {
        &self.document.inputs
    }

    pub fn outputs(&self) -> &[Parameter] {
        &self.document.outputs
    }

    pub fn image(&self) -> &str {
        &self.document.implementation.container.image
    }

    pub fn command(&self) -> &[CommandToken] {
        &self.document.implementation.container.command
    }

    pub fn input_arguments(&self) -> BTreeMap<String, Parameter> {
        by_name(&self.document.inputs)
    }

    pub fn output_arguments(&self) -> BTreeMap<String, Parameter> {
        by_name(&self.document.outputs)
    }

    /// Parse a raw command-line value for one of this step's inputs.
    pub fn parse_input_value(&self, name: &str, raw: &str) -> Result<ArgumentValue> {
        let parameter = self
            .document
            .inputs
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SpecError::UnknownParameter(name.to_string()))?;
        parameter.platform_type.parse_value(name, raw)
    }
}

fn by_name(parameters: &[Parameter]) -> BTreeMap<String, Parameter> {
    parameters
        .iter()
        .map(|p| (p.name.clone(), p.clone()))
        .collect()
}

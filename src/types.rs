//! Type Mapping Tables
//!
//! Two tables with deliberately asymmetric coverage:
//! argument type name -> platform type (8 entries), and
//! platform type -> value parser (scalars only).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SpecError};

/// Type names a component may declare for an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentType {
    Str,
    Int,
    Float,
    Bool,
    Dict,
    List,
    Tuple,
    Set,
}

impl ArgumentType {
    pub const ALL: [ArgumentType; 8] = [
        Self::Str,
        Self::Int,
        Self::Float,
        Self::Bool,
        Self::Dict,
        Self::List,
        Self::Tuple,
        Self::Set,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Dict => "dict",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Set => "set",
        }
    }

    /// Forward table. Tuples have no platform counterpart and travel as lists.
    pub fn platform_type(&self) -> PlatformType {
        match self {
            Self::Str => PlatformType::String,
            Self::Int => PlatformType::Integer,
            Self::Float => PlatformType::Float,
            Self::Bool => PlatformType::Boolean,
            Self::Dict => PlatformType::Map,
            Self::List | Self::Tuple => PlatformType::List,
            Self::Set => PlatformType::Set,
        }
    }
}

/// Translate a declared argument type name, failing on names outside the table.
pub fn platform_type_for(argument: &str, type_name: &str) -> Result<PlatformType> {
    ArgumentType::from_name(type_name)
        .map(|t| t.platform_type())
        .ok_or_else(|| SpecError::UnsupportedArgumentType {
            argument: argument.to_string(),
            type_name: type_name.to_string(),
        })
}

/// Parameter types understood by the pipeline platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformType {
    String,
    Integer,
    Float,
    Boolean,
    Map,
    List,
    Set,
}

impl PlatformType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::Map => "Map",
            Self::List => "List",
            Self::Set => "Set",
        }
    }

    pub fn has_value_parser(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Integer | Self::Float | Self::Boolean
        )
    }

    /// Reverse table: parse a raw command-line value for `parameter`.
    pub fn parse_value(&self, parameter: &str, raw: &str) -> Result<ArgumentValue> {
        let fail = || SpecError::ValueParse {
            parameter: parameter.to_string(),
            platform_type: *self,
            value: raw.to_string(),
        };

        match self {
            Self::String => Ok(ArgumentValue::String(raw.to_string())),
            Self::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ArgumentValue::Integer)
                .map_err(|_| fail()),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .map(ArgumentValue::Float)
                .map_err(|_| fail()),
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(ArgumentValue::Boolean(true)),
                "false" | "0" => Ok(ArgumentValue::Boolean(false)),
                _ => Err(fail()),
            },
            Self::Map | Self::List | Self::Set => Err(SpecError::NoValueParser {
                platform_type: *self,
            }),
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed scalar argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

/// Column types a subset field may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Float16,
    Float32,
    Float64,
    Str,
    Utf8,
    LargeUtf8,
    Binary,
    LargeBinary,
}

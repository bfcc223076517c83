//! Component Specification Core - validator and step compiler
//!
//! # Guarantees
//! 1. A specification that exists has passed the schema
//! 2. Specifications never change after construction
//! 3. Compilation is deterministic
//! 4. Unknown argument types fail compilation, never coerce
//! 5. Flags and parameter names derive from one normalization pair

pub mod error;
pub mod schema;
pub mod types;
pub mod naming;
pub mod component;
pub mod platform;
pub mod compiler;
pub mod hashing;
pub mod explorer;

pub use error::{Result, SpecError};
pub use schema::{SchemaStore, SchemaViolation, SUPPORTED_SCHEMA_VERSION};
pub use types::{ArgumentType, ArgumentValue, FieldType, PlatformType};
pub use component::{Argument, ComponentSpecification, ComponentSubset, Field};
pub use platform::{CommandToken, Parameter, PlatformSpecification};
pub use compiler::{compile, CompilationPipeline, CompiledComponent, ValidationReport};
pub use hashing::{canonical_json, platform_digest};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

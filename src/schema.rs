//! Schema Store - Draft-4 Validation
//!
//! Keywords act like validation rules: each produces structured violations,
//! and the store decides what a violation means for the caller.
//!
//! `$ref` pointers resolve against the referring document's own location
//! inside the store, never against the process working directory.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Result, SpecError};

/// Schema document every component specification is validated against.
pub const ROOT_SCHEMA: &str = "component_spec.json";

/// Schema major version this engine understands.
pub const SUPPORTED_SCHEMA_VERSION: &str = "1.0.0";

const BUNDLED_BASE: &str = "bundled:schemas/";

const BUNDLED_SOURCES: &[(&str, &str)] = &[
    (
        "component_spec.json",
        include_str!("../schemas/component_spec.json"),
    ),
    ("common.json", include_str!("../schemas/common.json")),
];

static BUNDLED: OnceLock<SchemaStore> = OnceLock::new();

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the validated document.
    pub path: String,
    pub keyword: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.keyword, self.message)
    }
}

impl From<SchemaViolation> for SpecError {
    fn from(v: SchemaViolation) -> Self {
        SpecError::SpecificationInvalid {
            path: v.path,
            message: v.message,
        }
    }
}

/// Holds the root schema plus every sibling document it may reference.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    base: String,
    documents: HashMap<String, Value>,
    version: semver::Version,
}

impl SchemaStore {
    /// The schemas compiled into the engine. Parsed once per process.
    pub fn bundled() -> Result<&'static SchemaStore> {
        if let Some(store) = BUNDLED.get() {
            return Ok(store);
        }
        let store = Self::from_sources(
            BUNDLED_BASE,
            BUNDLED_SOURCES
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string())),
        )?;
        Ok(BUNDLED.get_or_init(|| store))
    }

    /// Load an installed schema directory. The directory is the base for `$ref`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let root = dir.join(ROOT_SCHEMA);
        if !root.is_file() {
            return Err(SpecError::SchemaNotFound {
                location: root.display().to_string(),
            });
        }

        let mut sources = vec![];
        collect_json_files(dir, dir, &mut sources)?;
        log::warn!(
            "Using schema directory override {} ({} documents)",
            dir.display(),
            sources.len()
        );

        let base = format!("{}/", dir.display());
        Self::from_sources(&base, sources)
    }

    /// Build a store from `(relative path, JSON text)` pairs.
    pub fn from_sources(
        base: &str,
        sources: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut documents = HashMap::new();
        for (name, text) in sources {
            let value: Value =
                serde_json::from_str(&text).map_err(|e| SpecError::SchemaMalformed {
                    location: format!("{}{}", base, name),
                    reason: e.to_string(),
                })?;
            documents.insert(name, value);
        }

        let root = documents
            .get(ROOT_SCHEMA)
            .ok_or_else(|| SpecError::SchemaNotFound {
                location: format!("{}{}", base, ROOT_SCHEMA),
            })?;
        let version = check_schema_version(root, &format!("{}{}", base, ROOT_SCHEMA))?;

        Ok(Self {
            base: base.to_string(),
            documents,
            version,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    /// Run every keyword rule and return all violations in document order.
    ///
    /// `Err` is reserved for defects in the schema itself.
    pub fn validate(&self, document: &Value) -> Result<Vec<SchemaViolation>> {
        let root = self.document(ROOT_SCHEMA)?;
        let mut violations = vec![];
        self.check(ROOT_SCHEMA, root, document, "", &[], &mut violations)?;

        for v in &violations {
            log::debug!("schema violation: {}", v);
        }
        Ok(violations)
    }

    /// Validate and fail with the first violation.
    pub fn ensure_valid(&self, document: &Value) -> Result<()> {
        match self.validate(document)?.into_iter().next() {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    fn document(&self, key: &str) -> Result<&Value> {
        self.documents
            .get(key)
            .ok_or_else(|| SpecError::SchemaNotFound {
                location: format!("{}{}", self.base, key),
            })
    }

    /// Resolve `other.json#/pointer` relative to the document `current`.
    fn resolve_ref<'s>(&'s self, current: &str, reference: &str) -> Result<(String, &'s Value)> {
        let (doc_part, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let key = if doc_part.is_empty() {
            current.to_string()
        } else {
            join_relative(current, doc_part)
        };

        let document = self.document(&key)?;
        let target = if fragment.is_empty() {
            Some(document)
        } else {
            document.pointer(fragment)
        };

        target
            .map(|schema| (key.clone(), schema))
            .ok_or_else(|| SpecError::SchemaMalformed {
                location: format!("{}{}", self.base, key),
                reason: format!("unresolvable reference `{}`", reference),
            })
    }

    /// `refs` holds the `$ref`s followed without descending into the instance.
    fn check(
        &self,
        doc: &str,
        schema: &Value,
        instance: &Value,
        path: &str,
        refs: &[(String, String)],
        out: &mut Vec<SchemaViolation>,
    ) -> Result<()> {
        let Some(schema) = schema.as_object() else {
            return Ok(());
        };

        // Draft 4: `$ref` replaces every sibling keyword.
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            let hop = (doc.to_string(), reference.to_string());
            if refs.contains(&hop) {
                return Err(SpecError::SchemaMalformed {
                    location: format!("{}{}", self.base, doc),
                    reason: format!("cyclic $ref `{}`", reference),
                });
            }
            let mut chain = refs.to_vec();
            chain.push(hop);

            let (target_doc, target) = self.resolve_ref(doc, reference)?;
            return self.check(&target_doc, target, instance, path, &chain, out);
        }

        if let Some(expected) = schema.get("type") {
            let names: Vec<&str> = match expected {
                Value::String(s) => vec![s.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => vec![],
            };
            if !names.is_empty() && !names.iter().any(|n| matches_type(instance, n)) {
                out.push(violation(
                    path,
                    "type",
                    format!("{} is not of type {}", render(instance), quote_all(&names)),
                ));
                return Ok(());
            }
        }

        if let Some(Value::Array(allowed)) = schema.get("enum") {
            if !allowed.contains(instance) {
                let allowed: Vec<String> = allowed.iter().map(render).collect();
                out.push(violation(
                    path,
                    "enum",
                    format!("{} is not one of [{}]", render(instance), allowed.join(", ")),
                ));
            }
        }

        match instance {
            Value::Object(map) => self.check_object(doc, schema, map, path, out)?,
            Value::Array(items) => self.check_array(doc, schema, items, path, out)?,
            _ => {}
        }

        self.check_combinators(doc, schema, instance, path, refs, out)
    }

    fn check_object(
        &self,
        doc: &str,
        schema: &serde_json::Map<String, Value>,
        map: &serde_json::Map<String, Value>,
        path: &str,
        out: &mut Vec<SchemaViolation>,
    ) -> Result<()> {
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !map.contains_key(name) {
                    out.push(violation(
                        &child(path, name),
                        "required",
                        format!("'{}' is a required property", name),
                    ));
                }
            }
        }

        if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
            if (map.len() as u64) < min {
                out.push(violation(
                    path,
                    "minProperties",
                    format!("{} does not have enough properties", render_object(map)),
                ));
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let patterns = match schema.get("patternProperties").and_then(Value::as_object) {
            Some(patterns) => compile_patterns(patterns)?,
            None => vec![],
        };
        let additional = schema.get("additionalProperties");

        let mut unexpected = vec![];
        for (key, value) in map {
            let key_path = child(path, key);
            let mut matched = false;

            if let Some(sub) = properties.and_then(|p| p.get(key)) {
                matched = true;
                self.check(doc, sub, value, &key_path, &[], out)?;
            }
            for (regex, sub) in &patterns {
                if regex.is_match(key) {
                    matched = true;
                    self.check(doc, sub, value, &key_path, &[], out)?;
                }
            }

            if matched {
                continue;
            }
            match additional {
                Some(Value::Bool(false)) => unexpected.push(key.as_str()),
                Some(sub @ Value::Object(_)) => self.check(doc, sub, value, &key_path, &[], out)?,
                _ => {}
            }
        }

        if !unexpected.is_empty() {
            let verb = if unexpected.len() == 1 { "was" } else { "were" };
            out.push(violation(
                path,
                "additionalProperties",
                format!(
                    "Additional properties are not allowed ({} {} unexpected)",
                    quote_all(&unexpected),
                    verb
                ),
            ));
        }

        Ok(())
    }

    fn check_array(
        &self,
        doc: &str,
        schema: &serde_json::Map<String, Value>,
        items: &[Value],
        path: &str,
        out: &mut Vec<SchemaViolation>,
    ) -> Result<()> {
        match schema.get("items") {
            Some(Value::Array(positional)) => {
                for (i, (sub, item)) in positional.iter().zip(items).enumerate() {
                    self.check(doc, sub, item, &child(path, &i.to_string()), &[], out)?;
                }
            }
            Some(sub @ Value::Object(_)) => {
                for (i, item) in items.iter().enumerate() {
                    self.check(doc, sub, item, &child(path, &i.to_string()), &[], out)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_combinators(
        &self,
        doc: &str,
        schema: &serde_json::Map<String, Value>,
        instance: &Value,
        path: &str,
        refs: &[(String, String)],
        out: &mut Vec<SchemaViolation>,
    ) -> Result<()> {
        if let Some(Value::Array(all)) = schema.get("allOf") {
            for sub in all {
                self.check(doc, sub, instance, path, refs, out)?;
            }
        }

        if let Some(Value::Array(any)) = schema.get("anyOf") {
            if self.count_matching(doc, any, instance, path, refs)? == 0 {
                out.push(violation(
                    path,
                    "anyOf",
                    format!(
                        "{} is not valid under any of the given schemas",
                        render(instance)
                    ),
                ));
            }
        }

        if let Some(Value::Array(one)) = schema.get("oneOf") {
            match self.count_matching(doc, one, instance, path, refs)? {
                1 => {}
                0 => out.push(violation(
                    path,
                    "oneOf",
                    format!(
                        "{} is not valid under any of the given schemas",
                        render(instance)
                    ),
                )),
                _ => out.push(violation(
                    path,
                    "oneOf",
                    format!("{} is valid under more than one schema", render(instance)),
                )),
            }
        }

        Ok(())
    }

    fn count_matching(
        &self,
        doc: &str,
        candidates: &[Value],
        instance: &Value,
        path: &str,
        refs: &[(String, String)],
    ) -> Result<usize> {
        let mut count = 0;
        for sub in candidates {
            let mut scratch = vec![];
            self.check(doc, sub, instance, path, refs, &mut scratch)?;
            if scratch.is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn check_schema_version(root: &Value, location: &str) -> Result<semver::Version> {
    let malformed = |reason: String| SpecError::SchemaMalformed {
        location: location.to_string(),
        reason,
    };

    let raw = root
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing `version`".to_string()))?;
    let version =
        semver::Version::parse(raw).map_err(|e| malformed(format!("bad version `{}`: {}", raw, e)))?;
    let supported = semver::Version::parse(SUPPORTED_SCHEMA_VERSION)
        .map_err(|e| malformed(e.to_string()))?;

    if version.major != supported.major {
        return Err(malformed(format!(
            "schema version {} is incompatible with supported version {}",
            version, supported
        )));
    }
    Ok(version)
}

fn collect_json_files(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| SpecError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| SpecError::io(dir, e))?.path();
        if path.is_dir() {
            collect_json_files(root, &path, out)?;
        } else if path.extension().map_or(false, |e| e == "json") {
            let text = fs::read_to_string(&path).map_err(|e| SpecError::io(&path, e))?;
            let key = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((key, text));
        }
    }
    Ok(())
}

fn compile_patterns(
    patterns: &serde_json::Map<String, Value>,
) -> Result<Vec<(Regex, &Value)>> {
    patterns
        .iter()
        .map(|(pattern, sub)| {
            Regex::new(pattern)
                .map(|re| (re, sub))
                .map_err(|e| SpecError::SchemaMalformed {
                    location: format!("patternProperties `{}`", pattern),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Join a relative document reference onto the directory of `current`.
fn join_relative(current: &str, reference: &str) -> String {
    let mut parts: Vec<&str> = current.split('/').collect();
    parts.pop();
    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

fn matches_type(instance: &Value, name: &str) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        "integer" => match instance {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
            }
            _ => false,
        },
        _ => true,
    }
}

fn child(path: &str, key: &str) -> String {
    format!("{}/{}", path, key.replace('~', "~0").replace('/', "~1"))
}

fn violation(path: &str, keyword: &str, message: String) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        keyword: keyword.to_string(),
        message,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Object(map) => render_object(map),
        other => other.to_string(),
    }
}

fn render_object(map: &serde_json::Map<String, Value>) -> String {
    let keys: Vec<String> = map.keys().map(|k| format!("'{}'", k)).collect();
    format!("{{{}}}", keys.join(", "))
}

fn quote_all(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

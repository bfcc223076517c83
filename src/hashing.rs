//! Hashing - SHA-256 fingerprints of compiled descriptors
//!
//! Two compilations of the same specification must produce the same digest.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::error::Result;
use crate::platform::PlatformSpecification;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        })
}

/// Compact JSON with object keys in byte order at every depth. Arrays keep their order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = String::new();
    write_canonical(&serde_json::to_value(value)?, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// Digest of a compiled platform specification.
pub fn platform_digest(platform: &PlatformSpecification) -> Result<String> {
    let canonical = canonical_json(&platform.document()?)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

//! Argument name normalization.
//!
//! Components declare argument names in either form (`batch-size` or
//! `batch_size`). Compiled parameters use underscores, command-line flags
//! use hyphens. Both directions go through this pair and nothing else.

const FLAG_PREFIX: &str = "--";

/// Internal form: `batch-size` -> `batch_size`.
pub fn parameter_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

/// External form: `batch_size` -> `--batch-size`.
pub fn flag_name(name: &str) -> String {
    format!("{}{}", FLAG_PREFIX, name.trim().replace('_', "-"))
}

/// Inverse of [`flag_name`]: `--batch-size` -> `batch_size`.
///
/// Returns `None` for tokens that are not flags.
pub fn parameter_from_flag(flag: &str) -> Option<String> {
    flag.trim()
        .strip_prefix(FLAG_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(parameter_name)
}

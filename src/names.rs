//! # Test Names
//!
//! Random namespace names and per-test resource names that are valid
//! DNS-1123 labels.

use crate::constants::MAX_DNS_LABEL_LENGTH;
use crate::error::{HarnessError, Result};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Runs of characters not allowed in a DNS-1123 label
static INVALID_LABEL_CHARS: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+"));

/// Lowercase hex string of `len` random characters (at most 32)
pub fn random_suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

/// `<prefix>-<random>`, e.g. `brkconfig-tests-3fa`
pub fn random_namespace_name(prefix: &str, len: usize) -> Result<String> {
    sanitize_label(&format!("{}-{}", prefix, random_suffix(len)))
}

/// Resource name for one test method, e.g. `cfg-broker-initialvariablesettingtest`
pub fn test_resource_name(prefix: &str, test_method: &str) -> Result<String> {
    sanitize_label(&format!("{prefix}-{test_method}"))
}

/// Lowercase, replace disallowed runs with `-`, and fit the label length limit
pub fn sanitize_label(raw: &str) -> Result<String> {
    let invalid = INVALID_LABEL_CHARS
        .as_ref()
        .map_err(|e| HarnessError::Configuration(format!("Failed to compile regex: {e}")))?;
    let lowered = raw.to_lowercase();
    let replaced = invalid.replace_all(&lowered, "-");
    let trimmed = replaced.trim_matches('-');
    let capped: String = trimmed.chars().take(MAX_DNS_LABEL_LENGTH).collect();
    Ok(capped.trim_end_matches('-').to_string())
}

//! Cache Key Module
//!
//! Derives hybrid cache keys: a human-readable prefix built from the query
//! terms followed by the first 8 hex characters of a SHA-256 digest over a
//! canonical parameter map.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
const DIGEST_LEN: usize = 8;

/// Extra query parameters, keyed by name.
pub type ExtraParams = BTreeMap<String, Value>;

// == Cache Key ==
/// A derived cache key, usable directly as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the trailing digest portion of the key.
    pub fn digest(&self) -> &str {
        &self.0[self.0.len().saturating_sub(DIGEST_LEN)..]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Cache Query ==
/// The semantic inputs of one cached search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheQuery {
    /// Data source name, e.g. "indeed"
    pub source: String,
    /// Main search term, e.g. "software engineer"
    pub primary_term: String,
    /// Secondary term, typically a location
    pub secondary_term: String,
    /// Additional parameters; `Null` values are ignored
    pub params: ExtraParams,
}

impl CacheQuery {
    /// Creates a query without extra parameters.
    pub fn new(
        source: impl Into<String>,
        primary_term: impl Into<String>,
        secondary_term: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            primary_term: primary_term.into(),
            secondary_term: secondary_term.into(),
            params: ExtraParams::new(),
        }
    }

    /// Adds an extra parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Normalized source name (lowercased, trimmed).
    pub fn normalized_source(&self) -> String {
        normalize(&self.source)
    }

    /// Derives the cache key for this query.
    pub fn key(&self) -> CacheKey {
        derive_key(
            &self.source,
            &self.primary_term,
            &self.secondary_term,
            &self.params,
        )
    }
}

// == Derive ==
/// Derives a deterministic hybrid key.
///
/// Case and surrounding whitespace of every input are ignored, and
/// parameters are always visited in sorted order, so two semantically equal
/// queries yield the same key no matter how the parameters were assembled.
pub fn derive_key(
    source: &str,
    primary_term: &str,
    secondary_term: &str,
    params: &ExtraParams,
) -> CacheKey {
    let source = normalize(source);
    let primary = normalize(primary_term);
    let secondary = normalize(secondary_term);

    let extras: Vec<(&str, String)> = params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.as_str(), normalize(&stringify(value))))
        .collect();

    let mut readable = vec![slug(&source), slug(&primary), slug(&secondary)];
    for (name, value) in &extras {
        readable.push(format!("{}_{}", slug(name), slug(value)));
    }

    let mut canonical: BTreeMap<&str, &str> = BTreeMap::new();
    canonical.insert("source", source.as_str());
    canonical.insert("primary_term", primary.as_str());
    canonical.insert("secondary_term", secondary.as_str());
    for (name, value) in &extras {
        canonical.insert(*name, value.as_str());
    }

    // BTreeMap serializes with sorted keys
    let digest_input = serde_json::to_string(&canonical).unwrap_or_default();
    let digest = hex::encode(Sha256::digest(digest_input.as_bytes()));

    CacheKey(format!("{}_{}", readable.join("_"), &digest[..DIGEST_LEN]))
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whitespace runs and path separators become a single underscore.
fn slug(value: &str) -> String {
    value
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

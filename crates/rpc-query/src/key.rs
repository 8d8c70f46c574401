//! Cache key construction for RPC procedures
//!
//! A cache key is an ordered pair serialized as
//! `[pathSegments, { "input"?: any, "type"?: "query" | "mutation" | "path" }]`.
//! The path is the client's key prefix followed by the procedure's tag
//! segments; the metadata record only carries the fields that were supplied.
//!
//! # Example
//! ```rust,ignore
//! use rpc_query::key::{build_key, KeyOptions, KeyType};
//! use serde_json::json;
//!
//! let key = build_key(
//!     &["users", "get"],
//!     KeyOptions::new()
//!         .with_prefix("app")
//!         .with_input(json!({ "id": 1 }))
//!         .with_type(KeyType::Query),
//! );
//! assert_eq!(
//!     serde_json::to_value(&key).unwrap(),
//!     json!([["app", "users", "get"], { "input": { "id": 1 }, "type": "query" }])
//! );
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Discriminator stored in a key's metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Key of a query helper
    Query,
    /// Key of a mutation helper
    Mutation,
    /// Coarse key addressing everything under a path
    Path,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
            Self::Path => write!(f, "path"),
        }
    }
}

/// Segments prepended to every key a client derives.
///
/// Deserializes from either a JSON string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPrefix {
    /// A single prefix segment
    Single(String),
    /// An ordered list of prefix segments
    Segments(Vec<String>),
}

impl KeyPrefix {
    /// The prefix as a slice of segments.
    ///
    /// An empty single prefix yields no segments.
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Single(segment) if segment.is_empty() => &[],
            Self::Single(segment) => std::slice::from_ref(segment),
            Self::Segments(segments) => segments,
        }
    }
}

impl From<&str> for KeyPrefix {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for KeyPrefix {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for KeyPrefix {
    fn from(value: Vec<String>) -> Self {
        Self::Segments(value)
    }
}

impl From<Vec<&str>> for KeyPrefix {
    fn from(value: Vec<&str>) -> Self {
        Self::Segments(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeyPrefix {
    fn from(value: [&str; N]) -> Self {
        Self::Segments(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Normalize an optional prefix into its segments.
pub fn normalize_key_prefix(prefix: Option<&KeyPrefix>) -> &[String] {
    prefix.map(KeyPrefix::segments).unwrap_or(&[])
}

/// Metadata half of an [`RpcQueryKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcQueryKeyMeta {
    /// The call's input, present only when one was supplied (`null` included)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub input: Option<Value>,
    /// Key discriminator, present only when supplied
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub key_type: Option<KeyType>,
}

// A present `null` is still an input; only a missing field means "absent".
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Cache key for an RPC procedure: `(full path, metadata)`.
///
/// Equality is structural over both halves, which is what cache hits and
/// filter matching rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcQueryKey(pub Vec<String>, pub RpcQueryKeyMeta);

// Hashes the canonical JSON of the metadata; object keys serialize sorted,
// so equal keys hash equally.
impl Hash for RpcQueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
        serde_json::to_string(&self.1).unwrap_or_default().hash(state);
    }
}

impl RpcQueryKey {
    /// Prefix segments followed by tag segments.
    pub fn path(&self) -> &[String] {
        &self.0
    }

    /// Metadata record.
    pub fn meta(&self) -> &RpcQueryKeyMeta {
        &self.1
    }

    /// The input recorded in the key, if any.
    pub fn input(&self) -> Option<&Value> {
        self.1.input.as_ref()
    }

    /// The discriminator recorded in the key, if any.
    pub fn key_type(&self) -> Option<KeyType> {
        self.1.key_type
    }
}

/// Options accepted by [`build_key`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyOptions {
    /// Input to record in the metadata
    pub input: Option<Value>,
    /// Prefix to prepend to the path
    pub key_prefix: Option<KeyPrefix>,
    /// Discriminator to record in the metadata
    pub key_type: Option<KeyType>,
}

impl KeyOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an input.
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Prepend a prefix.
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Prepend an optional prefix.
    pub fn with_prefix_opt(mut self, prefix: Option<KeyPrefix>) -> Self {
        self.key_prefix = prefix;
        self
    }

    /// Record a discriminator.
    pub fn with_type(mut self, key_type: KeyType) -> Self {
        self.key_type = Some(key_type);
        self
    }
}

/// Build the cache key for `path_segments`.
///
/// Pure: identical arguments always produce equal keys. An empty
/// `path_segments` yields a key whose path is just the prefix.
pub fn build_key<S: AsRef<str>>(path_segments: &[S], options: KeyOptions) -> RpcQueryKey {
    let prefix = normalize_key_prefix(options.key_prefix.as_ref());
    let mut path = Vec::with_capacity(prefix.len() + path_segments.len());
    path.extend(prefix.iter().cloned());
    path.extend(path_segments.iter().map(|s| s.as_ref().to_string()));

    RpcQueryKey(
        path,
        RpcQueryKeyMeta {
            input: options.input,
            key_type: options.key_type,
        },
    )
}

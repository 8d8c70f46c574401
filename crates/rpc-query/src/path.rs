//! Coarse path keys and query filters
//!
//! A path key wraps only the path half of a cache key (`[[...path]]`) and is
//! used to address every cached entry under that path at once, typically for
//! invalidation. A [`QueryFilter`] is the descriptor handed to the caching
//! layer's invalidation and subscription APIs.

use crate::key::{KeyOptions, KeyPrefix, RpcQueryKey, RpcQueryKeyMeta, build_key};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One-element key holding only a full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcPathKey(pub Vec<String>);

impl RpcPathKey {
    /// The full path (prefix followed by segments).
    pub fn path(&self) -> &[String] {
        &self.0
    }

    /// True when `key` lives at or below this path.
    pub fn contains(&self, key: &RpcQueryKey) -> bool {
        key.path().starts_with(&self.0)
    }
}

impl Serialize for RpcPathKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.0,).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RpcPathKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <(Vec<String>,)>::deserialize(deserializer).map(|(path,)| Self(path))
    }
}

/// Options for [`path_key`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathOptions {
    /// Prefix to prepend
    pub key_prefix: Option<KeyPrefix>,
}

impl PathOptions {
    /// Options with no prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a prefix.
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Options for [`query_filter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilterOptions {
    /// Prefix to prepend
    pub key_prefix: Option<KeyPrefix>,
    /// Passed through to the filter only when set
    pub exact: Option<bool>,
}

impl QueryFilterOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a prefix.
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the `exact` flag.
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = Some(exact);
        self
    }
}

/// Filter descriptor for the caching layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    /// Path key the filter matches against
    pub query_key: RpcPathKey,
    /// Exact matching, omitted to let the consumer's default apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,
}

impl QueryFilter {
    /// Whether `key` is selected by this filter.
    ///
    /// Without `exact` (or with `exact: false`) any key at or below the
    /// filter's path matches, whatever its metadata. With `exact: true` the
    /// whole key must equal the one-element path key: same path and no
    /// input or discriminator.
    pub fn matches(&self, key: &RpcQueryKey) -> bool {
        match self.exact {
            Some(true) => {
                key.path() == self.query_key.path() && key.meta() == &RpcQueryKeyMeta::default()
            }
            _ => self.query_key.contains(key),
        }
    }
}

/// Build the path key for `path_segments`.
pub fn path_key<S: AsRef<str>>(path_segments: &[S], options: PathOptions) -> RpcPathKey {
    let RpcQueryKey(path, _) = build_key(
        path_segments,
        KeyOptions::new().with_prefix_opt(options.key_prefix),
    );
    RpcPathKey(path)
}

/// Build a filter addressing every key under `path_segments`.
pub fn query_filter<S: AsRef<str>>(path_segments: &[S], options: QueryFilterOptions) -> QueryFilter {
    QueryFilter {
        query_key: path_key(
            path_segments,
            PathOptions {
                key_prefix: options.key_prefix,
            },
        ),
        exact: options.exact,
    }
}

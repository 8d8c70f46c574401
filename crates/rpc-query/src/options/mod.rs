//! Query and mutation option builders
//!
//! Both builders follow the same layering: group-wide defaults first, the
//! per-call overrides on top (field by field), then the derived key, the
//! supplied function and the `meta` record. `meta` is merged the same way
//! but always ends with `rpc.path` set to the procedure's path segments,
//! whatever the defaults or overrides say.
//!
//! Defaults and overrides are only ever borrowed; building options never
//! changes them.

mod mutation;
mod query;

pub use mutation::{
    MutationFn, MutationOptions, MutationOptionsConfig, MutationOptionsOverrides,
    build_mutation_options,
};
pub use query::{
    QueryFn, QueryFnContext, QueryOptions, QueryOptionsConfig, QueryOptionsOverrides,
    build_query_options,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Retry policy understood by the caching layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Retry {
    /// Retry forever (`true`) or never (`false`)
    Enabled(bool),
    /// Retry up to this many times
    Count(u32),
}

impl From<bool> for Retry {
    fn from(value: bool) -> Self {
        Self::Enabled(value)
    }
}

impl From<u32> for Retry {
    fn from(value: u32) -> Self {
        Self::Count(value)
    }
}

/// When the caching layer is allowed to run functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkMode {
    /// Only while online
    Online,
    /// Regardless of connectivity
    Always,
    /// First attempt regardless, retries only while online
    OfflineFirst,
}

/// Key under which the provenance envelope is stored in `meta`.
pub const RPC_META_KEY: &str = "rpc";

// Fields the builders assign themselves; pass-through settings may not shadow them.
const QUERY_RESERVED_FIELDS: &[&str] = &["queryKey", "queryFn", "meta"];
const MUTATION_RESERVED_FIELDS: &[&str] = &["mutationKey", "mutationFn", "meta"];

/// Later layers win; `rpc.path` is written last.
fn merge_meta(
    defaults: Option<&Map<String, Value>>,
    overrides: Option<&Map<String, Value>>,
    path_segments: &[String],
) -> Map<String, Value> {
    let mut meta = merge_layers(defaults, overrides, &[]);
    meta.insert(RPC_META_KEY.to_string(), json!({ "path": path_segments }));
    meta
}

fn merge_layers(
    defaults: Option<&Map<String, Value>>,
    overrides: Option<&Map<String, Value>>,
    reserved: &[&str],
) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in [defaults, overrides].into_iter().flatten() {
        for (key, value) in layer {
            if !reserved.contains(&key.as_str()) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

// Milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Override if set, default otherwise.
fn pick<O, T: Clone>(
    defaults: Option<&O>,
    overrides: Option<&O>,
    field: impl Fn(&O) -> &Option<T>,
) -> Option<T> {
    overrides
        .and_then(|o| field(o).clone())
        .or_else(|| defaults.and_then(|d| field(d).clone()))
}

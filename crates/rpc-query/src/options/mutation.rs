//! Mutation options

use super::{MUTATION_RESERVED_FIELDS, NetworkMode, Retry, merge_layers, merge_meta, pick};
use crate::key::{KeyOptions, KeyPrefix, KeyType, RpcQueryKey, build_key};
use crate::RpcResult;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Function performing a mutation with the given variables.
pub type MutationFn = Arc<dyn Fn(Value) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

/// Partial mutation configuration used for group defaults and call overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOptionsOverrides {
    /// Retry policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,
    /// Milliseconds between retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
    /// Milliseconds the mutation result stays in the cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_time: Option<u64>,
    /// Network mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<NetworkMode>,
    /// Free-form metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    /// Any other setting
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MutationOptionsOverrides {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `retry`.
    pub fn with_retry(mut self, retry: impl Into<Retry>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    /// Set `retryDelay`.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(super::millis(delay));
        self
    }

    /// Set `gcTime`.
    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(super::millis(gc_time));
        self
    }

    /// Add one `meta` entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Add a pass-through setting.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Complete mutation configuration for one procedure.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOptions {
    /// Derived key, always typed `mutation` and without input
    pub mutation_key: RpcQueryKey,
    /// Bound mutation function
    #[serde(skip)]
    pub mutation_fn: MutationFn,
    /// Merged `retry`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,
    /// Merged `retryDelay`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
    /// Merged `gcTime`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_time: Option<u64>,
    /// Merged `networkMode`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<NetworkMode>,
    /// Merged metadata, always carrying `rpc.path`
    pub meta: Map<String, Value>,
    /// Merged pass-through settings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MutationOptions {
    /// Run the mutation function.
    pub async fn mutate(&self, variables: Value) -> RpcResult<Value> {
        (self.mutation_fn)(variables).await
    }
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("mutation_key", &self.mutation_key)
            .field("retry", &self.retry)
            .field("meta", &self.meta)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

/// Inputs of [`build_mutation_options`].
pub struct MutationOptionsConfig<'a> {
    /// Tag segments of the procedure
    pub path_segments: &'a [String],
    /// Key prefix
    pub key_prefix: Option<&'a KeyPrefix>,
    /// Function to attach
    pub mutation_fn: MutationFn,
    /// Group-wide defaults
    pub defaults: Option<&'a MutationOptionsOverrides>,
    /// Per-call overrides
    pub overrides: Option<&'a MutationOptionsOverrides>,
}

/// Build mutation options for one procedure.
pub fn build_mutation_options(config: MutationOptionsConfig<'_>) -> MutationOptions {
    let MutationOptionsConfig {
        path_segments,
        key_prefix,
        mutation_fn,
        defaults,
        overrides,
    } = config;

    let meta = merge_meta(
        defaults.and_then(|d| d.meta.as_ref()),
        overrides.and_then(|o| o.meta.as_ref()),
        path_segments,
    );

    MutationOptions {
        retry: pick(defaults, overrides, |o| &o.retry),
        retry_delay: pick(defaults, overrides, |o| &o.retry_delay),
        gc_time: pick(defaults, overrides, |o| &o.gc_time),
        network_mode: pick(defaults, overrides, |o| &o.network_mode),
        extra: merge_layers(
            defaults.map(|d| &d.extra),
            overrides.map(|o| &o.extra),
            MUTATION_RESERVED_FIELDS,
        ),
        mutation_key: build_key(
            path_segments,
            KeyOptions::new()
                .with_prefix_opt(key_prefix.cloned())
                .with_type(KeyType::Mutation),
        ),
        mutation_fn,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn echo_fn() -> MutationFn {
        Arc::new(|vars: Value| async move { Ok(vars) }.boxed())
    }

    #[test]
    fn test_mutation_key_is_typed() {
        let segments = vec!["users".to_string(), "rename".to_string()];
        let prefix = KeyPrefix::from("app");
        let options = build_mutation_options(MutationOptionsConfig {
            path_segments: &segments,
            key_prefix: Some(&prefix),
            mutation_fn: echo_fn(),
            defaults: None,
            overrides: None,
        });

        assert_eq!(
            serde_json::to_value(&options.mutation_key).unwrap(),
            json!([["app", "users", "rename"], { "type": "mutation" }])
        );
        assert_eq!(options.meta["rpc"], json!({ "path": ["users", "rename"] }));
    }

    #[test]
    fn test_defaults_fill_unset_overrides() {
        let segments = vec!["a".to_string()];
        let defaults = MutationOptionsOverrides::new()
            .with_retry(3u32)
            .with_gc_time(Duration::from_secs(1));
        let overrides = MutationOptionsOverrides::new().with_retry(false);

        let options = build_mutation_options(MutationOptionsConfig {
            path_segments: &segments,
            key_prefix: None,
            mutation_fn: echo_fn(),
            defaults: Some(&defaults),
            overrides: Some(&overrides),
        });

        assert_eq!(options.retry, Some(Retry::Enabled(false)));
        assert_eq!(options.gc_time, Some(1000));
    }

    #[tokio::test]
    async fn test_mutate_runs_supplied_fn() {
        let segments = vec!["a".to_string()];
        let options = build_mutation_options(MutationOptionsConfig {
            path_segments: &segments,
            key_prefix: None,
            mutation_fn: echo_fn(),
            defaults: None,
            overrides: None,
        });

        let out = options.mutate(json!({ "name": "x" })).await.unwrap();
        assert_eq!(out, json!({ "name": "x" }));
    }
}

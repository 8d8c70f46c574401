//! Query options

use super::{NetworkMode, QUERY_RESERVED_FIELDS, Retry, merge_layers, merge_meta, pick};
use crate::key::{KeyOptions, KeyPrefix, KeyType, RpcQueryKey, build_key};
use crate::transport::CancellationSignal;
use crate::RpcResult;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What the caching layer hands a query function.
#[derive(Debug, Clone)]
pub struct QueryFnContext {
    /// Key of the query being fetched
    pub query_key: RpcQueryKey,
    /// Fires when the caching layer abandons the fetch
    pub signal: CancellationSignal,
}

impl QueryFnContext {
    /// Context with a fresh, untriggered signal.
    pub fn new(query_key: RpcQueryKey) -> Self {
        Self {
            query_key,
            signal: CancellationSignal::new(),
        }
    }

    /// Use an existing cancellation signal.
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }
}

/// Function fetching a query's data.
pub type QueryFn =
    Arc<dyn Fn(QueryFnContext) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

/// Partial query configuration used for group defaults and call overrides.
///
/// Unknown settings are kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptionsOverrides {
    /// Milliseconds before cached data is considered stale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_time: Option<u64>,
    /// Milliseconds unused data stays in the cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_time: Option<u64>,
    /// Retry policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,
    /// Milliseconds between retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
    /// Whether the query runs automatically
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Refetch when the window regains focus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch_on_window_focus: Option<bool>,
    /// Polling interval in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch_interval: Option<u64>,
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

impl QueryOptionsOverrides {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `staleTime`.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(super::millis(stale_time));
        self
    }

    /// Set `gcTime`.
    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(super::millis(gc_time));
        self
    }

    /// Set `retry`.
    pub fn with_retry(mut self, retry: impl Into<Retry>) -> Self {
        self.retry = Some(retry.into());
        self
    }

    /// Set `enabled`.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set `networkMode`.
    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = Some(mode);
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

/// Complete query configuration for one procedure call.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Derived cache key
    pub query_key: RpcQueryKey,
    /// Bound query function
    #[serde(skip)]
    pub query_fn: QueryFn,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `staleTime`
    pub stale_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `gcTime`
    pub gc_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `retry`
    pub retry: Option<Retry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `retryDelay`
    pub retry_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `enabled`
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `refetchOnWindowFocus`
    pub refetch_on_window_focus: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `refetchInterval`
    pub refetch_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Merged `networkMode`
    pub network_mode: Option<NetworkMode>,
    /// Merged metadata, always carrying `rpc.path`
    pub meta: Map<String, Value>,
    /// Merged pass-through settings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QueryOptions {
    /// The procedure path recorded under `meta.rpc.path`.
    pub fn rpc_path(&self) -> Vec<String> {
        self.meta
            .get(super::RPC_META_KEY)
            .and_then(|rpc| rpc.get("path"))
            .and_then(|path| serde_json::from_value(path.clone()).ok())
            .unwrap_or_default()
    }

    /// Run the query function with a fresh context for this key.
    pub async fn fetch(&self) -> RpcResult<Value> {
        (self.query_fn)(QueryFnContext::new(self.query_key.clone())).await
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("query_key", &self.query_key)
            .field("stale_time", &self.stale_time)
            .field("gc_time", &self.gc_time)
            .field("retry", &self.retry)
            .field("enabled", &self.enabled)
            .field("meta", &self.meta)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

/// Inputs of [`build_query_options`].
pub struct QueryOptionsConfig<'a> {
    /// Tag segments of the procedure
    pub path_segments: &'a [String],
    /// Call input, recorded in the key
    pub input: Option<Value>,
    /// Key prefix
    pub key_prefix: Option<&'a KeyPrefix>,
    /// Key discriminator
    pub key_type: Option<KeyType>,
    /// Function to attach
    pub query_fn: QueryFn,
    /// Group-wide defaults
    pub defaults: Option<&'a QueryOptionsOverrides>,
    /// Per-call overrides
    pub overrides: Option<&'a QueryOptionsOverrides>,
}

/// Build query options for one procedure call.
pub fn build_query_options(config: QueryOptionsConfig<'_>) -> QueryOptions {
    let QueryOptionsConfig {
        path_segments,
        input,
        key_prefix,
        key_type,
        query_fn,
        defaults,
        overrides,
    } = config;

    let meta = merge_meta(
        defaults.and_then(|d| d.meta.as_ref()),
        overrides.and_then(|o| o.meta.as_ref()),
        path_segments,
    );

    let mut key_options = KeyOptions::new().with_prefix_opt(key_prefix.cloned());
    key_options.input = input;
    key_options.key_type = key_type;

    QueryOptions {
        stale_time: pick(defaults, overrides, |o| &o.stale_time),
        gc_time: pick(defaults, overrides, |o| &o.gc_time),
        retry: pick(defaults, overrides, |o| &o.retry),
        retry_delay: pick(defaults, overrides, |o| &o.retry_delay),
        enabled: pick(defaults, overrides, |o| &o.enabled),
        refetch_on_window_focus: pick(defaults, overrides, |o| &o.refetch_on_window_focus),
        refetch_interval: pick(defaults, overrides, |o| &o.refetch_interval),
        network_mode: pick(defaults, overrides, |o| &o.network_mode),
        extra: merge_layers(
            defaults.map(|d| &d.extra),
            overrides.map(|o| &o.extra),
            QUERY_RESERVED_FIELDS,
        ),
        query_key: build_key(path_segments, key_options),
        query_fn,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn noop_fn() -> QueryFn {
        Arc::new(|_ctx: QueryFnContext| async { Ok(Value::Null) }.boxed())
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_overrides_shadow_defaults() {
        let segments = path(&["a", "b"]);
        let defaults = QueryOptionsOverrides::new()
            .with_retry(1u32)
            .with_stale_time(Duration::from_secs(5));
        let overrides = QueryOptionsOverrides::new().with_retry(2u32);

        let options = build_query_options(QueryOptionsConfig {
            path_segments: &segments,
            input: None,
            key_prefix: None,
            key_type: None,
            query_fn: noop_fn(),
            defaults: Some(&defaults),
            overrides: Some(&overrides),
        });

        assert_eq!(options.retry, Some(Retry::Count(2)));
        assert_eq!(options.stale_time, Some(5000));
    }

    #[test]
    fn test_rpc_path_not_overridable() {
        let segments = path(&["a", "b"]);
        let overrides = QueryOptionsOverrides::new().with_meta("rpc", json!({ "path": ["x"] }));

        let options = build_query_options(QueryOptionsConfig {
            path_segments: &segments,
            input: None,
            key_prefix: None,
            key_type: None,
            query_fn: noop_fn(),
            defaults: None,
            overrides: Some(&overrides),
        });

        assert_eq!(options.rpc_path(), ["a", "b"]);
    }

    #[test]
    fn test_inputs_untouched() {
        let segments = path(&["a"]);
        let defaults = QueryOptionsOverrides::new().with_meta("owner", json!("defaults"));
        let overrides = QueryOptionsOverrides::new().with_meta("owner", json!("overrides"));
        let defaults_before = defaults.clone();
        let overrides_before = overrides.clone();

        let options = build_query_options(QueryOptionsConfig {
            path_segments: &segments,
            input: Some(json!({ "id": 1 })),
            key_prefix: None,
            key_type: Some(KeyType::Query),
            query_fn: noop_fn(),
            defaults: Some(&defaults),
            overrides: Some(&overrides),
        });

        assert_eq!(options.meta["owner"], json!("overrides"));
        assert_eq!(defaults, defaults_before);
        assert_eq!(overrides, overrides_before);
    }

    #[test]
    fn test_extra_cannot_shadow_key() {
        let segments = path(&["a"]);
        let defaults = QueryOptionsOverrides::new()
            .with_extra("queryKey", json!("bogus"))
            .with_extra("placeholderData", json!([]));

        let options = build_query_options(QueryOptionsConfig {
            path_segments: &segments,
            input: None,
            key_prefix: None,
            key_type: None,
            query_fn: noop_fn(),
            defaults: Some(&defaults),
            overrides: None,
        });

        let wire = serde_json::to_value(&options).unwrap();
        assert_eq!(wire["queryKey"], json!([["a"], {}]));
        assert_eq!(wire["placeholderData"], json!([]));
        assert_eq!(wire["meta"], json!({ "rpc": { "path": ["a"] } }));
    }
}

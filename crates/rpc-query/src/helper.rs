//! Per-procedure helpers
//!
//! Every procedure in a group gets one helper. Query procedures get a
//! [`QueryHelper`] (`query_key`, `query_fn`, `query_options`), mutation
//! procedures a [`MutationHelper`] (`mutation_key`, `mutation_fn`,
//! `mutation_options`). Both can `call` and `call_effect` the procedure.
//!
//! Helpers for streaming procedures are built like any other, but every
//! method that would run the procedure fails with
//! [`ClientError::StreamUnsupported`].

use crate::key::{KeyOptions, KeyPrefix, KeyType, RpcQueryKey, build_key};
use crate::logging::log_stream_rejected;
use crate::options::{
    MutationFn, MutationOptions, MutationOptionsConfig, MutationOptionsOverrides, QueryFn,
    QueryFnContext, QueryOptions, QueryOptionsConfig, QueryOptionsOverrides,
    build_mutation_options, build_query_options,
};
use crate::transport::{CallFuture, RpcCall, TransportLayer};
use crate::{ClassifiedRpc, ClientError, ClientResult, ProcedureKind, Rpc};
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Per-call key settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyOverrides {
    /// Replaces the client's key prefix for this call
    pub key_prefix: Option<KeyPrefix>,
}

impl KeyOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` instead of the client's prefix.
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Per-call input of [`QueryHelper::query_options`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptionsInput {
    /// Replaces the client's key prefix for this call
    pub key_prefix: Option<KeyPrefix>,
    /// Settings layered over the client's query defaults
    pub overrides: Option<QueryOptionsOverrides>,
}

impl QueryOptionsInput {
    /// Nothing overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` instead of the client's prefix.
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Layer `overrides` over the defaults.
    pub fn with_overrides(mut self, overrides: QueryOptionsOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// Per-call input of [`MutationHelper::mutation_options`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationOptionsInput {
    /// Replaces the client's key prefix for this call
    pub key_prefix: Option<KeyPrefix>,
    /// Settings layered over the client's mutation defaults
    pub overrides: Option<MutationOptionsOverrides>,
}

impl MutationOptionsInput {
    /// Nothing overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `prefix` instead of the client's prefix.
    pub fn with_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Layer `overrides` over the defaults.
    pub fn with_overrides(mut self, overrides: MutationOptionsOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// What every helper of one client shares.
#[derive(Clone)]
pub(crate) struct HelperContext {
    pub transport: Arc<dyn TransportLayer>,
    pub key_prefix: Option<KeyPrefix>,
    pub query_defaults: Arc<QueryOptionsOverrides>,
    pub mutation_defaults: Arc<MutationOptionsOverrides>,
}

// State shared by a helper and the functions it hands out.
struct HelperCore {
    rpc: Rpc,
    path: Vec<String>,
    context: HelperContext,
}

impl HelperCore {
    fn new(rpc: Rpc, context: HelperContext) -> Arc<Self> {
        Arc::new(Self {
            path: rpc.path_segments(),
            rpc,
            context,
        })
    }

    fn ensure_callable(&self) -> ClientResult<()> {
        if self.rpc.is_stream() {
            log_stream_rejected(self.rpc.tag());
            return Err(ClientError::StreamUnsupported {
                tag: self.rpc.tag().to_string(),
            });
        }
        Ok(())
    }

    fn call_effect(&self, input: Value) -> ClientResult<RpcCall> {
        self.ensure_callable()?;
        Ok(RpcCall::new(
            self.context.transport.clone(),
            self.rpc.tag(),
            input,
        ))
    }

    fn call(&self, input: Value) -> ClientResult<CallFuture> {
        self.call_effect(input)?.spawn()
    }

    // The per-call prefix wins over the client's prefix.
    fn resolve_prefix<'a>(&'a self, call_prefix: Option<&'a KeyPrefix>) -> Option<&'a KeyPrefix> {
        call_prefix.or(self.context.key_prefix.as_ref())
    }
}

macro_rules! helper_accessors {
    () => {
        /// The procedure tag.
        pub fn tag(&self) -> &str {
            self.core.rpc.tag()
        }

        /// Tag segments.
        pub fn path(&self) -> &[String] {
            &self.core.path
        }

        /// The procedure this helper wraps.
        pub fn rpc(&self) -> &Rpc {
            &self.core.rpc
        }

        /// True when the procedure streams its result and cannot be called here.
        pub fn is_stream(&self) -> bool {
            self.core.rpc.is_stream()
        }

        /// The uncommitted call. Nothing is sent until it is awaited.
        pub fn call_effect(&self, input: Value) -> ClientResult<RpcCall> {
            self.core.call_effect(input)
        }

        /// Start the call on the current tokio runtime.
        pub fn call(&self, input: Value) -> ClientResult<CallFuture> {
            self.core.call(input)
        }
    };
}

/// Helper of a query procedure.
#[derive(Clone)]
pub struct QueryHelper {
    core: Arc<HelperCore>,
}

impl QueryHelper {
    helper_accessors!();

    /// Always [`ProcedureKind::Query`].
    pub fn kind(&self) -> ProcedureKind {
        ProcedureKind::Query
    }

    /// Cache key for a call with `input`.
    pub fn query_key(&self, input: Value, overrides: KeyOverrides) -> RpcQueryKey {
        build_key(
            &self.core.path,
            KeyOptions::new()
                .with_input(input)
                .with_prefix_opt(self.core.resolve_prefix(overrides.key_prefix.as_ref()).cloned())
                .with_type(KeyType::Query),
        )
    }

    /// Function fetching the procedure's result for `input`.
    ///
    /// The signal in the [`QueryFnContext`] is forwarded to the transport.
    pub fn query_fn(&self, input: Value) -> ClientResult<QueryFn> {
        self.core.ensure_callable()?;
        let core = self.core.clone();
        Ok(Arc::new(move |context: QueryFnContext| {
            let call = RpcCall::new(core.context.transport.clone(), core.rpc.tag(), input.clone())
                .with_signal(context.signal);
            call.run().boxed()
        }))
    }

    /// Complete query options for `input`.
    pub fn query_options(&self, input: Value, options: QueryOptionsInput) -> ClientResult<QueryOptions> {
        let query_fn = self.query_fn(input.clone())?;
        Ok(build_query_options(QueryOptionsConfig {
            path_segments: &self.core.path,
            input: Some(input),
            key_prefix: self.core.resolve_prefix(options.key_prefix.as_ref()),
            key_type: Some(KeyType::Query),
            query_fn,
            defaults: Some(&self.core.context.query_defaults),
            overrides: options.overrides.as_ref(),
        }))
    }
}

impl fmt::Debug for QueryHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHelper")
            .field("tag", &self.tag())
            .field("stream", &self.is_stream())
            .finish()
    }
}

/// Helper of a mutation procedure.
#[derive(Clone)]
pub struct MutationHelper {
    core: Arc<HelperCore>,
}

impl MutationHelper {
    helper_accessors!();

    /// Always [`ProcedureKind::Mutation`].
    pub fn kind(&self) -> ProcedureKind {
        ProcedureKind::Mutation
    }

    /// Key of the mutation. Never carries an input.
    pub fn mutation_key(&self, overrides: KeyOverrides) -> RpcQueryKey {
        build_key(
            &self.core.path,
            KeyOptions::new()
                .with_prefix_opt(self.core.resolve_prefix(overrides.key_prefix.as_ref()).cloned())
                .with_type(KeyType::Mutation),
        )
    }

    /// Function running the mutation with its variables.
    pub fn mutation_fn(&self) -> ClientResult<MutationFn> {
        self.core.ensure_callable()?;
        let core = self.core.clone();
        Ok(Arc::new(move |variables: Value| {
            let call = RpcCall::new(core.context.transport.clone(), core.rpc.tag(), variables);
            call.run().boxed()
        }))
    }

    /// Complete mutation options.
    pub fn mutation_options(&self, options: MutationOptionsInput) -> ClientResult<MutationOptions> {
        let mutation_fn = self.mutation_fn()?;
        Ok(build_mutation_options(MutationOptionsConfig {
            path_segments: &self.core.path,
            key_prefix: self.core.resolve_prefix(options.key_prefix.as_ref()),
            mutation_fn,
            defaults: Some(&self.core.context.mutation_defaults),
            overrides: options.overrides.as_ref(),
        }))
    }
}

impl fmt::Debug for MutationHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHelper")
            .field("tag", &self.tag())
            .field("stream", &self.is_stream())
            .finish()
    }
}

/// The helper of one procedure, shaped by its classification.
#[derive(Debug, Clone)]
pub enum ProcedureHelper {
    /// Query-shaped helper
    Query(QueryHelper),
    /// Mutation-shaped helper
    Mutation(MutationHelper),
}

impl ProcedureHelper {
    pub(crate) fn new(procedure: ClassifiedRpc, context: HelperContext) -> Self {
        let core = HelperCore::new(procedure.rpc, context);
        match procedure.kind {
            ProcedureKind::Query => Self::Query(QueryHelper { core }),
            ProcedureKind::Mutation => Self::Mutation(MutationHelper { core }),
        }
    }

    fn core(&self) -> &HelperCore {
        match self {
            Self::Query(helper) => &helper.core,
            Self::Mutation(helper) => &helper.core,
        }
    }

    /// The procedure tag.
    pub fn tag(&self) -> &str {
        self.core().rpc.tag()
    }

    /// Tag segments.
    pub fn path(&self) -> &[String] {
        &self.core().path
    }

    /// Helper shape.
    pub fn kind(&self) -> ProcedureKind {
        match self {
            Self::Query(_) => ProcedureKind::Query,
            Self::Mutation(_) => ProcedureKind::Mutation,
        }
    }

    /// The query helper, if this is one.
    pub fn as_query(&self) -> Option<&QueryHelper> {
        match self {
            Self::Query(helper) => Some(helper),
            Self::Mutation(_) => None,
        }
    }

    /// The mutation helper, if this is one.
    pub fn as_mutation(&self) -> Option<&MutationHelper> {
        match self {
            Self::Mutation(helper) => Some(helper),
            Self::Query(_) => None,
        }
    }

    /// See [`QueryHelper::call_effect`].
    pub fn call_effect(&self, input: Value) -> ClientResult<RpcCall> {
        self.core().call_effect(input)
    }

    /// See [`QueryHelper::call`].
    pub fn call(&self, input: Value) -> ClientResult<CallFuture> {
        self.core().call(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CancellationSignal, Transport, TransportRequest};
    use crate::{RpcError, RpcResult, as_mutation};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoLayer;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(
            &mut self,
            request: TransportRequest,
            signal: CancellationSignal,
        ) -> RpcResult<Value> {
            if signal.is_cancelled() {
                return Err(RpcError::cancelled(&request.path));
            }
            Ok(json!({ "path": request.path, "input": request.input }))
        }
    }

    #[async_trait]
    impl TransportLayer for EchoLayer {
        async fn acquire(&self) -> RpcResult<Box<dyn Transport>> {
            Ok(Box::new(EchoTransport))
        }
    }

    fn context(prefix: Option<&str>) -> HelperContext {
        HelperContext {
            transport: Arc::new(EchoLayer),
            key_prefix: prefix.map(KeyPrefix::from),
            query_defaults: Arc::new(QueryOptionsOverrides::new().with_retry(1u32)),
            mutation_defaults: Arc::new(MutationOptionsOverrides::new()),
        }
    }

    #[test]
    fn test_query_key_uses_client_prefix_unless_overridden() {
        let helper = ProcedureHelper::new(Rpc::new("users.get").into(), context(Some("app")));
        let query = helper.as_query().unwrap();

        let key = query.query_key(json!({ "id": 1 }), KeyOverrides::new());
        assert_eq!(
            serde_json::to_value(&key).unwrap(),
            json!([["app", "users", "get"], { "input": { "id": 1 }, "type": "query" }])
        );

        let key = query.query_key(json!(1), KeyOverrides::new().with_prefix("other"));
        assert_eq!(key.path(), ["other", "users", "get"]);
    }

    #[test]
    fn test_mutation_key_has_no_input() {
        let helper = ProcedureHelper::new(as_mutation(Rpc::new("users.rename")), context(None));
        let mutation = helper.as_mutation().unwrap();

        assert_eq!(
            serde_json::to_value(mutation.mutation_key(KeyOverrides::new())).unwrap(),
            json!([["users", "rename"], { "type": "mutation" }])
        );
        assert!(helper.as_query().is_none());
    }

    #[tokio::test]
    async fn test_query_options_fetch_through_transport() {
        let helper = ProcedureHelper::new(Rpc::new("users.get").into(), context(None));
        let options = helper
            .as_query()
            .unwrap()
            .query_options(json!({ "id": 2 }), QueryOptionsInput::new())
            .unwrap();

        assert_eq!(options.retry, Some(crate::options::Retry::Count(1)));
        assert_eq!(
            options.fetch().await.unwrap(),
            json!({ "path": "users.get", "input": { "id": 2 } })
        );
    }

    #[tokio::test]
    async fn test_query_fn_forwards_signal() {
        let helper = ProcedureHelper::new(Rpc::new("a").into(), context(None));
        let query = helper.as_query().unwrap();
        let query_fn = query.query_fn(Value::Null).unwrap();

        let signal = CancellationSignal::new();
        signal.cancel();
        let context = QueryFnContext::new(query.query_key(Value::Null, KeyOverrides::new()))
            .with_signal(signal);

        let error = query_fn(context).await.unwrap_err();
        assert_eq!(error.code, crate::RpcErrorCode::Cancelled);
    }

    #[test]
    fn test_stream_helper_fails_only_on_use() {
        let helper = ProcedureHelper::new(Rpc::stream("events.tail").into(), context(None));
        let query = helper.as_query().unwrap();
        let expected = ClientError::StreamUnsupported {
            tag: "events.tail".into(),
        };

        assert_eq!(query.query_key(Value::Null, KeyOverrides::new()).path(), ["events", "tail"]);
        assert_eq!(query.call_effect(Value::Null).err(), Some(expected.clone()));
        assert_eq!(query.call(Value::Null).err(), Some(expected.clone()));
        assert_eq!(query.query_fn(Value::Null).err(), Some(expected.clone()));
        assert_eq!(
            query
                .query_options(Value::Null, QueryOptionsInput::new())
                .err(),
            Some(expected)
        );
    }
}

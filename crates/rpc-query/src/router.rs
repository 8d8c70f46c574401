//! Local procedure router and in-process transport
//!
//! A [`Router`] maps procedure paths to async handlers running in the same
//! process. [`RouterTransport`] exposes any router as a [`TransportLayer`],
//! and [`Router::contract`] derives the matching [`RpcGroup`], so a query
//! client can be pointed at local procedures without a network hop.
//!
//! ```rust,ignore
//! let router = Router::new()
//!     .context(AppContext::default())
//!     .query("health", health)
//!     .merge("users", users_router());
//!
//! let group = router.contract();
//! let transport = Arc::new(RouterTransport::new(router));
//! let factory = create_rpc_query_client(RpcQueryClientConfigInput::new(group, transport));
//! ```

use crate::handler::{BoxedHandler, Handler, into_boxed};
use crate::transport::{CancellationSignal, Transport, TransportLayer, TransportRequest};
use crate::{
    ClassifiedRpc, Context, EmptyContext, ProcedureKind, Rpc, RpcError, RpcGroup, RpcResult,
    as_mutation,
};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) enum Procedure<Ctx: Clone + Send + Sync + 'static> {
    Handler {
        handler: BoxedHandler<Ctx>,
        kind: ProcedureKind,
    },
    Stream,
}

/// Router for local procedures.
///
/// # Example
/// ```rust,ignore
/// let router = Router::new()
///     .context(AppContext::default())
///     .query("health", health_handler)
///     .mutation("create", create_handler)
///     .stream("events")
///     .merge("users", users_router());
/// ```
pub struct Router<Ctx: Clone + Send + Sync + 'static = EmptyContext> {
    context: Option<Ctx>,
    procedures: HashMap<String, Procedure<Ctx>>,
}

impl Default for Router<EmptyContext> {
    fn default() -> Self {
        Self::new()
    }
}

impl Router<EmptyContext> {
    /// Create a new router without application context
    pub fn new() -> Self {
        Self {
            context: Some(EmptyContext),
            procedures: HashMap::new(),
        }
    }
}

impl<Ctx: Clone + Send + Sync + 'static> Router<Ctx> {
    /// Set the context for this router
    ///
    /// Procedures registered before this call are dropped; set the context first.
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn context<NewCtx: Clone + Send + Sync + 'static>(self, ctx: NewCtx) -> Router<NewCtx> {
        Router {
            context: Some(ctx),
            procedures: HashMap::new(),
        }
    }

    /// Add a query procedure (read-only operation)
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn query<N, Input, Output, H>(self, name: N, handler: H) -> Self
    where
        N: Into<String>,
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Ctx, Input, Output>,
    {
        self.handler(name.into(), into_boxed(handler), ProcedureKind::Query)
    }

    /// Add a mutation procedure (write operation)
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn mutation<N, Input, Output, H>(self, name: N, handler: H) -> Self
    where
        N: Into<String>,
        Input: DeserializeOwned + Send + 'static,
        Output: Serialize + Send + 'static,
        H: Handler<Ctx, Input, Output>,
    {
        self.handler(name.into(), into_boxed(handler), ProcedureKind::Mutation)
    }

    /// Declare a streaming procedure.
    ///
    /// It is part of [`Router::contract`] as a stream procedure but is not
    /// served by this router; calling it fails with `BAD_REQUEST`.
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn stream<N: Into<String>>(mut self, name: N) -> Self {
        let path = name.into();
        tracing::trace!(path = %path, "Declared streaming procedure");
        self.procedures.insert(path, Procedure::Stream);
        self
    }

    fn handler(mut self, path: String, handler: BoxedHandler<Ctx>, kind: ProcedureKind) -> Self {
        tracing::trace!(path = %path, procedure_type = %kind, "Registered procedure handler");
        self.procedures
            .insert(path, Procedure::Handler { handler, kind });
        self
    }

    /// Merge another router under a namespace
    ///
    /// # Example
    /// ```rust,ignore
    /// let router = Router::new()
    ///     .merge("users", users_router())
    ///     .merge("posts", posts_router());
    /// // Creates: users.get, users.list, posts.get, posts.list, etc.
    /// ```
    #[must_use = "This method returns a new Router and does not modify self"]
    pub fn merge<N: Into<String>>(mut self, namespace: N, other: Router<Ctx>) -> Self {
        let namespace = namespace.into();
        for (path, procedure) in other.procedures {
            let full_path = if namespace.is_empty() {
                path
            } else {
                format!("{}.{}", namespace, path)
            };
            self.procedures.insert(full_path, procedure);
        }
        self
    }

    /// List all registered procedure paths
    pub fn procedures(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.procedures.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// The procedure group matching this router, sorted by tag.
    ///
    /// Mutations are marked as mutations and declared streams become
    /// streaming procedures.
    pub fn contract(&self) -> RpcGroup {
        let procedures = self
            .procedures()
            .into_iter()
            .filter_map(|path| {
                let procedure: ClassifiedRpc = match self.procedures.get(&path)? {
                    Procedure::Handler {
                        kind: ProcedureKind::Query,
                        ..
                    } => Rpc::new(path).into(),
                    Procedure::Handler {
                        kind: ProcedureKind::Mutation,
                        ..
                    } => as_mutation(Rpc::new(path)),
                    Procedure::Stream => Rpc::stream(path).into(),
                };
                Some(procedure)
            })
            .collect();
        RpcGroup::from_unique(procedures)
    }

    fn context_or_err(&self) -> RpcResult<Context<Ctx>> {
        self.context
            .clone()
            .map(Context::new)
            .ok_or_else(|| RpcError::internal("Router context not initialized"))
    }

    /// Call a procedure by path
    pub async fn call(&self, path: &str, input: Value) -> RpcResult<Value> {
        let procedure = self.procedures.get(path).ok_or_else(|| {
            tracing::debug!(path = %path, "Procedure not found");

            let mut available: Vec<&String> = self
                .procedures
                .iter()
                .filter(|(_, p)| matches!(p, Procedure::Handler { .. }))
                .map(|(k, _)| k)
                .collect();
            available.sort();

            let mut error = RpcError::procedure_not_found(path);
            if !available.is_empty() {
                error = error.with_details(serde_json::json!({
                    "available_procedures": available,
                    "requested": path
                }));
            }
            error
        })?;

        match procedure {
            Procedure::Handler { handler, kind } => {
                tracing::trace!(path = %path, procedure_type = %kind, "Executing procedure");
                let ctx = self.context_or_err()?;
                (handler.clone())(ctx, input).await
            }
            Procedure::Stream => {
                tracing::debug!(path = %path, "Attempted to call streaming procedure");
                Err(RpcError::bad_request(format!(
                    "Procedure '{}' streams its results and cannot be called",
                    path
                )))
            }
        }
    }
}

// =============================================================================
// Dynamic router
// =============================================================================

/// Type-erased router, whatever its context type.
pub trait DynRouter: Send + Sync {
    /// Call a procedure by path
    fn call<'a>(
        &'a self,
        path: &'a str,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = RpcResult<Value>> + Send + 'a>>;

    /// The procedure group matching this router
    fn contract(&self) -> RpcGroup;
}

impl<Ctx: Clone + Send + Sync + 'static> DynRouter for Router<Ctx> {
    fn call<'a>(
        &'a self,
        path: &'a str,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = RpcResult<Value>> + Send + 'a>> {
        Box::pin(async move { Router::call(self, path, input).await })
    }

    fn contract(&self) -> RpcGroup {
        Router::contract(self)
    }
}

// =============================================================================
// In-process transport
// =============================================================================

/// Transport layer calling a local router.
#[derive(Clone)]
pub struct RouterTransport {
    router: Arc<dyn DynRouter>,
}

impl RouterTransport {
    /// Serve calls from `router`.
    pub fn new(router: impl DynRouter + 'static) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// The procedure group of the wrapped router.
    pub fn contract(&self) -> RpcGroup {
        self.router.contract()
    }
}

struct RouterConnection {
    router: Arc<dyn DynRouter>,
}

#[async_trait]
impl Transport for RouterConnection {
    async fn send(&mut self, request: TransportRequest, signal: CancellationSignal) -> RpcResult<Value> {
        if signal.is_cancelled() {
            return Err(RpcError::cancelled(&request.path));
        }
        self.router.call(&request.path, request.input).await
    }
}

#[async_trait]
impl TransportLayer for RouterTransport {
    async fn acquire(&self) -> RpcResult<Box<dyn Transport>> {
        Ok(Box::new(RouterConnection {
            router: self.router.clone(),
        }))
    }
}

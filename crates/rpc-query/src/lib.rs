#![warn(missing_docs)]
//! # rpc-query
//!
//! Binds a group of RPC procedures to a query-caching layer and an
//! injection container.
//!
//! ## Overview
//!
//! For every procedure in an [`RpcGroup`] the client builds one helper:
//! - **Query helpers** derive cache keys (`query_key`), fetch functions
//!   (`query_fn`) and complete option records (`query_options`)
//! - **Mutation helpers** derive mutation keys, mutation functions and options
//! - **Both** can run the procedure directly (`call`) or hand back the
//!   uncommitted call (`call_effect`)
//!
//! Helpers are arranged in a tree following the dot-segments of their tags,
//! next to two root methods, `path_key` and `query_filter`, used to address
//! whole subtrees of the cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐
//! │ RpcGroup     │──▶│ HelperTree   │──▶│ Query/Mutation helpers   │
//! │ (contract)   │   │ (namespaces) │   │ keys · options · call    │
//! └──────────────┘   └──────────────┘   └────────────┬─────────────┘
//!                                                    │ RpcCall
//!                                                    ▼
//!                                       ┌──────────────────────────┐
//!                                       │ TransportLayer           │
//!                                       │ RouterTransport / HTTP   │
//!                                       └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rpc_query::prelude::*;
//! use serde_json::json;
//!
//! let group = RpcGroup::make([
//!     ClassifiedRpc::from(Rpc::new("users.get")),
//!     as_mutation(Rpc::new("users.updateName")),
//! ])?;
//!
//! let factory = create_rpc_query_client(
//!     RpcQueryClientConfigInput::new(group, transport).with_key_prefix("app"),
//! );
//! let injector = Injector::new(factory.providers());
//! let client = factory.inject_client(&injector)?;
//!
//! let options = client
//!     .query("users.get")?
//!     .query_options(json!({ "id": 1 }), QueryOptionsInput::new())?;
//! // options.query_key == [["app", "users", "get"], { "input": { "id": 1 }, "type": "query" }]
//!
//! let renamed = client
//!     .mutation("users.updateName")?
//!     .call(json!({ "id": 1, "name": "Ada" }))?
//!     .await?;
//!
//! let filter = client.query_filter(&["users"], QueryFilterOptions::new());
//! ```
//!
//! ## Errors
//!
//! - [`ClientError`] covers construction (reserved names, path conflicts),
//!   lookups, streaming procedures and injection
//! - [`RpcError`] is whatever the transport produced; it is passed through
//!   unchanged

pub mod client;
pub mod config;
mod context;
mod error;
pub mod group;
mod handler;
pub mod helper;
pub mod injector;
pub mod key;
pub mod logging;
pub mod options;
pub mod path;
#[cfg(feature = "tauri")]
pub mod plugin;
pub mod procedure;
mod router;
pub mod transport;
pub mod tree;

#[cfg(test)]
mod tests;

// Public API
pub use client::{
    RpcQueryClient, RpcQueryClientConfig, RpcQueryClientConfigInput, RpcQueryClientFactory,
    TransportSource, create_rpc_query_client,
};
pub use config::{ClientOptions, ConfigValidationError};
pub use context::{Context, EmptyContext};
pub use error::{ClientError, ClientResult, RpcError, RpcErrorCode, RpcResult};
pub use group::RpcGroup;
pub use handler::Handler;
pub use helper::{
    KeyOverrides, MutationHelper, MutationOptionsInput, ProcedureHelper, QueryHelper,
    QueryOptionsInput,
};
pub use injector::{InjectionToken, Injector, Providers};
pub use key::{KeyOptions, KeyPrefix, KeyType, RpcQueryKey, RpcQueryKeyMeta, build_key};
pub use options::{
    MutationFn, MutationOptions, MutationOptionsOverrides, NetworkMode, QueryFn, QueryFnContext,
    QueryOptions, QueryOptionsOverrides, Retry, build_mutation_options, build_query_options,
};
pub use path::{PathOptions, QueryFilter, QueryFilterOptions, RpcPathKey, path_key, query_filter};
#[cfg(feature = "tauri")]
pub use plugin::{RpcQueryExt, manage_client};
pub use procedure::{
    ClassifiedRpc, ProcedureKind, Rpc, SuccessShape, as_mutation, as_query, classify,
};
pub use router::{DynRouter, Router, RouterTransport};
pub use transport::{
    CallFuture, CancellationSignal, RpcCall, ScopedTransport, Transport, TransportLayer,
    TransportRequest,
};
pub use tree::{HelperNode, HelperTree};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use rpc_query::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Procedures
        ClassifiedRpc,
        // Errors
        ClientError,
        ClientResult,
        // Configuration
        ClientOptions,
        // Local router
        Context,
        EmptyContext,
        // Injection
        InjectionToken,
        Injector,
        // Keys
        KeyOverrides,
        KeyPrefix,
        KeyType,
        MutationOptionsInput,
        MutationOptionsOverrides,
        PathOptions,
        ProcedureKind,
        Providers,
        QueryFilterOptions,
        QueryOptionsInput,
        QueryOptionsOverrides,
        Router,
        RouterTransport,
        Rpc,
        RpcError,
        RpcErrorCode,
        RpcGroup,
        // Client
        RpcQueryClient,
        RpcQueryClientConfigInput,
        RpcQueryKey,
        RpcResult,
        // Transport
        CancellationSignal,
        Transport,
        TransportLayer,
        TransportRequest,
        as_mutation,
        as_query,
        create_rpc_query_client,
    };
}

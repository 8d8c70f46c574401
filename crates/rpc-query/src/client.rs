//! Query client and its injection factory
//!
//! [`create_rpc_query_client`] turns a procedure group, a transport source
//! and optional key settings into an [`RpcQueryClientFactory`]. The factory
//! carries a token and a provider; registering the provider in an
//! [`Injector`] makes the client a singleton of that scope.
//!
//! ```rust,ignore
//! let factory = create_rpc_query_client(
//!     RpcQueryClientConfigInput::new(group, Arc::new(RouterTransport::new(router)))
//!         .with_key_prefix("app"),
//! );
//! let injector = Injector::new(factory.providers());
//! let client = factory.inject_client(&injector)?;
//!
//! let key = client.query("users.get")?.query_key(json!({ "id": 1 }), KeyOverrides::new());
//! let user = client.query("users.get")?.call(json!({ "id": 1 }))?.await?;
//! ```

use crate::config::ClientOptions;
use crate::helper::HelperContext;
use crate::injector::{InjectionToken, Injector, Providers};
use crate::key::KeyPrefix;
use crate::logging::log_client_built;
use crate::options::{MutationOptionsOverrides, QueryOptionsOverrides};
use crate::path::{PathOptions, QueryFilter, QueryFilterOptions, RpcPathKey, path_key, query_filter};
use crate::transport::TransportLayer;
use crate::tree::HelperTree;
use crate::{ClientResult, RpcGroup};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

type ResolveFn = Arc<dyn Fn(&Injector) -> ClientResult<Arc<dyn TransportLayer>> + Send + Sync>;

/// Where a client gets its transport layer from.
#[derive(Clone)]
pub enum TransportSource {
    /// A ready layer
    Layer(Arc<dyn TransportLayer>),
    /// Resolved from the injector the client is created in
    Resolve(ResolveFn),
}

impl TransportSource {
    fn resolve(&self, injector: Option<&Injector>) -> ClientResult<Arc<dyn TransportLayer>> {
        match (self, injector) {
            (Self::Layer(layer), _) => Ok(layer.clone()),
            (Self::Resolve(resolve), Some(injector)) => resolve(injector),
            (Self::Resolve(_), None) => Err(crate::ClientError::Config(
                "transport is resolved from an injector but none was given".into(),
            )),
        }
    }
}

impl fmt::Debug for TransportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer(_) => write!(f, "TransportSource::Layer"),
            Self::Resolve(_) => write!(f, "TransportSource::Resolve"),
        }
    }
}

impl<L: TransportLayer> From<Arc<L>> for TransportSource {
    fn from(layer: Arc<L>) -> Self {
        Self::Layer(layer)
    }
}

impl From<Arc<dyn TransportLayer>> for TransportSource {
    fn from(layer: Arc<dyn TransportLayer>) -> Self {
        Self::Layer(layer)
    }
}

/// Caller-facing client configuration.
#[derive(Debug, Clone)]
pub struct RpcQueryClientConfigInput {
    /// The procedures to expose
    pub group: RpcGroup,
    /// Transport used by every call
    pub transport: TransportSource,
    /// Prefix prepended to every derived key
    pub key_prefix: Option<KeyPrefix>,
    /// Defaults under every query helper's options
    pub query_defaults: Option<QueryOptionsOverrides>,
    /// Defaults under every mutation helper's options
    pub mutation_defaults: Option<MutationOptionsOverrides>,
}

impl RpcQueryClientConfigInput {
    /// Configuration with no prefix and no defaults.
    pub fn new(group: RpcGroup, transport: impl Into<TransportSource>) -> Self {
        Self {
            group,
            transport: transport.into(),
            key_prefix: None,
            query_defaults: None,
            mutation_defaults: None,
        }
    }

    /// Configuration whose transport is injected under `token`.
    pub fn with_transport_from(
        group: RpcGroup,
        token: InjectionToken<Arc<dyn TransportLayer>>,
    ) -> Self {
        let resolve: ResolveFn =
            Arc::new(move |injector: &Injector| Ok((*injector.get(&token)?).clone()));
        Self::new(group, TransportSource::Resolve(resolve))
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the query defaults.
    pub fn with_query_defaults(mut self, defaults: QueryOptionsOverrides) -> Self {
        self.query_defaults = Some(defaults);
        self
    }

    /// Set the mutation defaults.
    pub fn with_mutation_defaults(mut self, defaults: MutationOptionsOverrides) -> Self {
        self.mutation_defaults = Some(defaults);
        self
    }

    /// Apply validated [`ClientOptions`].
    pub fn with_options(self, options: ClientOptions) -> ClientResult<Self> {
        options.validate()?;
        let ClientOptions {
            key_prefix,
            query_defaults,
            mutation_defaults,
        } = options;
        Ok(Self {
            key_prefix,
            query_defaults: Some(query_defaults),
            mutation_defaults: Some(mutation_defaults),
            ..self
        })
    }
}

/// Normalized client configuration.
#[derive(Debug, Clone)]
pub struct RpcQueryClientConfig {
    /// The procedures to expose
    pub group: RpcGroup,
    /// Transport used by every call
    pub transport: TransportSource,
    /// Prefix prepended to every derived key; stays absent when not given
    pub key_prefix: Option<KeyPrefix>,
    /// Query defaults, empty when not given
    pub query_defaults: QueryOptionsOverrides,
    /// Mutation defaults, empty when not given
    pub mutation_defaults: MutationOptionsOverrides,
}

impl From<RpcQueryClientConfigInput> for RpcQueryClientConfig {
    fn from(input: RpcQueryClientConfigInput) -> Self {
        Self {
            group: input.group,
            transport: input.transport,
            key_prefix: input.key_prefix,
            query_defaults: input.query_defaults.unwrap_or_default(),
            mutation_defaults: input.mutation_defaults.unwrap_or_default(),
        }
    }
}

/// Procedure helpers plus the root `path_key`/`query_filter` methods.
///
/// Dereferences to its [`HelperTree`], so `client.query("users.get")`
/// works directly.
#[derive(Debug)]
pub struct RpcQueryClient {
    tree: HelperTree,
    key_prefix: Option<KeyPrefix>,
}

impl RpcQueryClient {
    /// Build a client without an injector. The transport must be a ready layer.
    pub fn build(config: RpcQueryClientConfig) -> ClientResult<Self> {
        Self::build_in(config, None)
    }

    fn build_in(config: RpcQueryClientConfig, injector: Option<&Injector>) -> ClientResult<Self> {
        let transport = config.transport.resolve(injector)?;
        let context = HelperContext {
            transport,
            key_prefix: config.key_prefix.clone(),
            query_defaults: Arc::new(config.query_defaults),
            mutation_defaults: Arc::new(config.mutation_defaults),
        };
        let tree = HelperTree::build(&config.group, &context)?;

        log_client_built(
            config.group.len(),
            config.key_prefix.as_ref().map(|p| p.segments().join(".")).as_deref(),
        );
        Ok(Self {
            tree,
            key_prefix: config.key_prefix,
        })
    }

    /// The helper tree.
    pub fn tree(&self) -> &HelperTree {
        &self.tree
    }

    /// The client's key prefix.
    pub fn key_prefix(&self) -> Option<&KeyPrefix> {
        self.key_prefix.as_ref()
    }

    /// Path key under the client's prefix, unless `options` carries its own.
    pub fn path_key<S: AsRef<str>>(&self, path_segments: &[S], options: PathOptions) -> RpcPathKey {
        let key_prefix = options.key_prefix.or_else(|| self.key_prefix.clone());
        path_key(path_segments, PathOptions { key_prefix })
    }

    /// Query filter under the client's prefix, unless `options` carries its own.
    pub fn query_filter<S: AsRef<str>>(
        &self,
        path_segments: &[S],
        options: QueryFilterOptions,
    ) -> QueryFilter {
        let key_prefix = options.key_prefix.or_else(|| self.key_prefix.clone());
        query_filter(
            path_segments,
            QueryFilterOptions {
                key_prefix,
                exact: options.exact,
            },
        )
    }
}

impl Deref for RpcQueryClient {
    type Target = HelperTree;

    fn deref(&self) -> &Self::Target {
        &self.tree
    }
}

/// Token and provider of one client.
#[derive(Debug, Clone)]
pub struct RpcQueryClientFactory {
    token: InjectionToken<RpcQueryClient>,
    providers: Providers,
}

impl RpcQueryClientFactory {
    /// Token the client is registered under.
    pub fn token(&self) -> InjectionToken<RpcQueryClient> {
        self.token
    }

    /// The singleton provider to register in an injector.
    pub fn providers(&self) -> Providers {
        self.providers.clone()
    }

    /// Resolve the client in `injector`, building it on first use.
    pub fn inject_client(&self, injector: &Injector) -> ClientResult<Arc<RpcQueryClient>> {
        injector.get(&self.token)
    }
}

/// Create the injection factory of a query client.
///
/// Nothing is built until the client is first resolved; construction errors
/// (reserved names, path conflicts) surface from
/// [`RpcQueryClientFactory::inject_client`].
pub fn create_rpc_query_client(input: RpcQueryClientConfigInput) -> RpcQueryClientFactory {
    let token = InjectionToken::new("RpcQueryClient");
    let config = RpcQueryClientConfig::from(input);
    let providers = Providers::new().factory(&token, move |injector| {
        RpcQueryClient::build_in(config.clone(), Some(injector)).map(Arc::new)
    });
    RpcQueryClientFactory { token, providers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use crate::{ClientError, Rpc, RpcError, RpcResult};
    use async_trait::async_trait;

    struct NoTransport;

    #[async_trait]
    impl TransportLayer for NoTransport {
        async fn acquire(&self) -> RpcResult<Box<dyn Transport>> {
            Err(RpcError::transport("unused"))
        }
    }

    fn group(tags: &[&str]) -> RpcGroup {
        RpcGroup::make(tags.iter().map(|t| Rpc::new(*t))).unwrap()
    }

    #[test]
    fn test_config_normalization() {
        let config = RpcQueryClientConfig::from(RpcQueryClientConfigInput::new(
            group(&["a"]),
            Arc::new(NoTransport),
        ));
        assert!(config.key_prefix.is_none());
        assert_eq!(config.query_defaults, QueryOptionsOverrides::new());
        assert_eq!(config.mutation_defaults, MutationOptionsOverrides::new());
    }

    #[test]
    fn test_root_helpers_bind_prefix() {
        let client = RpcQueryClient::build(
            RpcQueryClientConfigInput::new(group(&["users.get"]), Arc::new(NoTransport))
                .with_key_prefix("app")
                .into(),
        )
        .unwrap();

        assert_eq!(client.path_key(&["users"], PathOptions::new()).path(), ["app", "users"]);
        assert_eq!(
            client
                .query_filter(&["users"], QueryFilterOptions::new().with_prefix("other"))
                .query_key
                .path(),
            ["other", "users"]
        );
        assert_eq!(client.query("users.get").unwrap().tag(), "users.get");
    }

    #[test]
    fn test_inject_is_singleton_per_injector() {
        let factory = create_rpc_query_client(RpcQueryClientConfigInput::new(
            group(&["a"]),
            Arc::new(NoTransport),
        ));
        let first = Injector::new(factory.providers());
        let second = Injector::new(factory.providers());

        let a = factory.inject_client(&first).unwrap();
        let b = factory.inject_client(&first).unwrap();
        let c = factory.inject_client(&second).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_construction_error_surfaces_on_inject() {
        let factory = create_rpc_query_client(RpcQueryClientConfigInput::new(
            group(&["pathKey"]),
            Arc::new(NoTransport),
        ));
        let injector = Injector::new(factory.providers());

        assert_eq!(
            factory.inject_client(&injector).unwrap_err(),
            ClientError::ReservedName {
                tag: "pathKey".into()
            }
        );
    }

    #[test]
    fn test_transport_from_injector() {
        let transport = InjectionToken::<Arc<dyn TransportLayer>>::new("Transport");
        let factory = create_rpc_query_client(RpcQueryClientConfigInput::with_transport_from(
            group(&["a"]),
            transport,
        ));

        let missing = Injector::new(factory.providers());
        assert_eq!(
            factory.inject_client(&missing).unwrap_err(),
            ClientError::MissingProvider {
                token: "Transport".into()
            }
        );

        let layer: Arc<dyn TransportLayer> = Arc::new(NoTransport);
        let injector = Injector::new(factory.providers().value(&transport, layer));
        assert!(factory.inject_client(&injector).is_ok());
    }

    #[test]
    fn test_with_options_validates() {
        let options = ClientOptions::new().with_key_prefix(["", "x"]);
        let error = RpcQueryClientConfigInput::new(group(&["a"]), Arc::new(NoTransport))
            .with_options(options)
            .unwrap_err();
        assert!(matches!(error, ClientError::Config(_)));
    }
}

//! Injection providers for the shared HTTP client and transport

use rpc_query::{InjectionToken, Injector, Providers, TransportLayer};
use std::sync::{Arc, LazyLock};

use crate::layer::{HttpTransportLayer, HttpTransportOptions};

static HTTP_CLIENT: LazyLock<InjectionToken<reqwest::Client>> =
    LazyLock::new(|| InjectionToken::new("HttpClient"));

static HTTP_TRANSPORT: LazyLock<InjectionToken<Arc<dyn TransportLayer>>> =
    LazyLock::new(|| InjectionToken::new("HttpTransport"));

/// Token of the shared `reqwest::Client`.
pub fn http_client_token() -> InjectionToken<reqwest::Client> {
    *HTTP_CLIENT
}

/// Token of the HTTP transport layer, usable with
/// [`RpcQueryClientConfigInput::with_transport_from`](rpc_query::RpcQueryClientConfigInput::with_transport_from).
pub fn http_transport_token() -> InjectionToken<Arc<dyn TransportLayer>> {
    *HTTP_TRANSPORT
}

/// Register a default `reqwest::Client`.
pub fn provide_http_client() -> Providers {
    provide_http_client_with(reqwest::Client::new())
}

/// Register `client` as the shared HTTP client.
pub fn provide_http_client_with(client: reqwest::Client) -> Providers {
    Providers::new().value(&HTTP_CLIENT, client)
}

/// Register an [`HttpTransportLayer`] built on the injected HTTP client.
///
/// Needs [`provide_http_client`] (or [`provide_http_client_with`]) in the
/// same injector or one of its parents.
pub fn provide_http_transport(options: HttpTransportOptions) -> Providers {
    Providers::new().factory(&HTTP_TRANSPORT, move |injector: &Injector| {
        let client = injector.get(&HTTP_CLIENT)?;
        let layer: Arc<dyn TransportLayer> =
            Arc::new(HttpTransportLayer::new((*client).clone(), options.clone()));
        Ok(Arc::new(layer))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc_query::ClientError;

    #[test]
    fn test_transport_needs_client() {
        let injector = Injector::new(provide_http_transport(HttpTransportOptions::new(
            "http://localhost/rpc",
        )));
        assert!(matches!(
            injector.get(&http_transport_token()),
            Err(ClientError::MissingProvider { .. })
        ));
    }

    #[test]
    fn test_transport_is_singleton() {
        let injector = Injector::new(
            provide_http_client()
                .extend(provide_http_transport(HttpTransportOptions::new("http://localhost/rpc"))),
        );
        let first = injector.get(&http_transport_token()).unwrap();
        let second = injector.get(&http_transport_token()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(http_client_token(), http_client_token());
    }
}

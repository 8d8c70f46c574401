//! HTTP transport layer

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use rpc_query::{
    CancellationSignal, RpcError, RpcResult, Transport, TransportLayer, TransportRequest,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::response::decode_response;

type UrlFn = Arc<dyn Fn() -> RpcResult<String> + Send + Sync>;

/// Where the endpoint URL comes from.
#[derive(Clone)]
pub enum UrlSource {
    /// One fixed URL
    Static(String),
    /// Resolved again on every acquisition
    Dynamic(UrlFn),
}

impl UrlSource {
    /// A URL computed by `resolve` each time a connection is acquired.
    pub fn dynamic<F>(resolve: F) -> Self
    where
        F: Fn() -> RpcResult<String> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(resolve))
    }

    fn resolve(&self) -> RpcResult<String> {
        match self {
            Self::Static(url) => Ok(url.clone()),
            Self::Dynamic(resolve) => resolve(),
        }
    }
}

impl fmt::Debug for UrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(url) => f.debug_tuple("Static").field(url).finish(),
            Self::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}

impl From<String> for UrlSource {
    fn from(url: String) -> Self {
        Self::Static(url)
    }
}

impl From<&str> for UrlSource {
    fn from(url: &str) -> Self {
        Self::Static(url.to_string())
    }
}

/// Options for [`HttpTransportLayer`].
#[derive(Debug, Clone)]
pub struct HttpTransportOptions {
    /// Endpoint every procedure is posted to
    pub url: UrlSource,
    /// Extra headers sent with every request
    pub headers: HeaderMap,
    /// Per-request timeout; none by default
    pub timeout: Option<Duration>,
}

impl HttpTransportOptions {
    /// Options posting to `url` with no extra headers.
    pub fn new(url: impl Into<UrlSource>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Add a header. Invalid names or values are rejected.
    pub fn with_header(mut self, name: &str, value: &str) -> RpcResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RpcError::bad_request(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RpcError::bad_request(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Transport posting `{"path", "input"}` as JSON to an endpoint.
///
/// Connections share one `reqwest::Client`; acquiring one only resolves the
/// endpoint URL, so releasing it is a no-op.
#[derive(Debug, Clone)]
pub struct HttpTransportLayer {
    client: reqwest::Client,
    options: HttpTransportOptions,
}

impl HttpTransportLayer {
    /// Layer on `client`.
    pub fn new(client: reqwest::Client, options: HttpTransportOptions) -> Self {
        Self { client, options }
    }

    /// The options this layer was built with.
    pub fn options(&self) -> &HttpTransportOptions {
        &self.options
    }
}

#[async_trait]
impl TransportLayer for HttpTransportLayer {
    async fn acquire(&self) -> RpcResult<Box<dyn Transport>> {
        let url = self.options.url.resolve()?;
        tracing::trace!(url = %url, "Acquired HTTP connection");
        Ok(Box::new(HttpConnection {
            client: self.client.clone(),
            url,
            headers: self.options.headers.clone(),
            timeout: self.options.timeout,
        }))
    }
}

struct HttpConnection {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

#[async_trait]
impl Transport for HttpConnection {
    async fn send(
        &mut self,
        request: TransportRequest,
        signal: CancellationSignal,
    ) -> RpcResult<Value> {
        if signal.is_cancelled() {
            return Err(RpcError::cancelled(&request.path));
        }

        let mut builder = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!(path = %request.path, url = %self.url, "Sending RPC over HTTP");
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "HTTP request failed");
            RpcError::transport(format!("HTTP request failed: {}", e))
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RpcError::transport(format!("Failed to read response body: {}", e)))?;
        decode_response(status, &body)
    }
}

//! Transport seam and call execution
//!
//! A [`TransportLayer`] hands out connections ([`Transport`]) on demand. Each
//! call acquires one connection, sends a single request through it and
//! releases it again. Release happens in [`ScopedTransport`]'s `Drop`, so it
//! runs on success, on failure and when the call future is dropped mid-flight.
//!
//! [`RpcCall`] is the uncommitted form of a call: nothing happens until it is
//! awaited (or [`RpcCall::run`] is polled). [`RpcCall::spawn`] commits it on
//! the current tokio runtime and returns a [`CallFuture`].

use crate::{ClientError, ClientResult, RpcError, RpcResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::Instrument;

// =============================================================================
// Cancellation
// =============================================================================

#[derive(Debug, Default)]
struct SignalState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation signal shared between a caller and a call.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    state: Arc<SignalState>,
}

impl CancellationSignal {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the signal. Every clone observes it.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancelled
    pub async fn cancelled(&self) {
        // Register before checking the flag so a concurrent cancel is not missed.
        let notified = self.state.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

// =============================================================================
// Transport traits
// =============================================================================

/// One procedure invocation on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    /// Procedure tag (e.g., "users.get")
    pub path: String,
    /// Call input as JSON
    pub input: Value,
}

/// A connection able to send requests.
#[async_trait]
pub trait Transport: Send {
    /// Send one request. Implementations should stop work when `signal` fires.
    async fn send(&mut self, request: TransportRequest, signal: CancellationSignal)
    -> RpcResult<Value>;

    /// Give the connection's resources back. Called exactly once.
    fn release(&mut self) {}
}

/// Factory of connections; one per client.
#[async_trait]
pub trait TransportLayer: Send + Sync + 'static {
    /// Acquire a connection for a single call.
    async fn acquire(&self) -> RpcResult<Box<dyn Transport>>;
}

/// A connection that is released when dropped.
pub struct ScopedTransport {
    inner: Option<Box<dyn Transport>>,
}

impl ScopedTransport {
    /// Acquire a connection from `layer`.
    pub async fn acquire(layer: &dyn TransportLayer) -> RpcResult<Self> {
        let inner = layer.acquire().await?;
        tracing::trace!("Transport acquired");
        Ok(Self { inner: Some(inner) })
    }

    /// Send through the held connection.
    pub async fn send(
        &mut self,
        request: TransportRequest,
        signal: CancellationSignal,
    ) -> RpcResult<Value> {
        match self.inner.as_mut() {
            Some(transport) => transport.send(request, signal).await,
            None => Err(RpcError::transport("Transport already released")),
        }
    }
}

impl Drop for ScopedTransport {
    fn drop(&mut self) {
        if let Some(mut transport) = self.inner.take() {
            transport.release();
            tracing::trace!("Transport released");
        }
    }
}

// =============================================================================
// Calls
// =============================================================================

/// An uncommitted procedure call.
///
/// Awaiting it acquires a connection, sends the request and resolves with
/// the transport's result, unchanged. Triggering the attached signal resolves
/// it with a `CANCELLED` error and releases the connection.
pub struct RpcCall {
    layer: Arc<dyn TransportLayer>,
    request: TransportRequest,
    signal: CancellationSignal,
}

impl RpcCall {
    /// Describe a call of `path` with `input` over `layer`.
    pub fn new(layer: Arc<dyn TransportLayer>, path: impl Into<String>, input: Value) -> Self {
        Self {
            layer,
            request: TransportRequest {
                path: path.into(),
                input,
            },
            signal: CancellationSignal::new(),
        }
    }

    /// Use `signal` for cancellation.
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }

    /// The procedure tag.
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// The call input.
    pub fn input(&self) -> &Value {
        &self.request.input
    }

    /// The signal forwarded to the transport.
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// Execute the call.
    pub async fn run(self) -> RpcResult<Value> {
        let RpcCall {
            layer,
            request,
            signal,
        } = self;
        let path = request.path.clone();
        let span = tracing::debug_span!("rpc_call", path = %path);

        async move {
            if signal.is_cancelled() {
                return Err(RpcError::cancelled(&path));
            }

            // Covers acquisition too; a held connection is released on drop.
            let watcher = signal.clone();
            let exchange = async {
                let mut scope = ScopedTransport::acquire(layer.as_ref()).await?;
                scope.send(request, signal).await
            };
            let result = tokio::select! {
                biased;
                _ = watcher.cancelled() => Err(RpcError::cancelled(&path)),
                result = exchange => result,
            };

            if let Err(error) = &result {
                tracing::debug!(code = %error.code, "RPC call failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Execute the call and decode the result.
    pub async fn run_as<T: DeserializeOwned>(self) -> RpcResult<T> {
        let value = self.run().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Commit the call on the current tokio runtime.
    pub fn spawn(self) -> ClientResult<CallFuture> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ClientError::RuntimeUnavailable {
                tag: self.request.path.clone(),
            })?;
        let path: Arc<str> = Arc::from(self.request.path.as_str());
        let handle = runtime.spawn(self.run());
        Ok(CallFuture { handle, path })
    }
}

impl IntoFuture for RpcCall {
    type Output = RpcResult<Value>;
    type IntoFuture = BoxFuture<'static, RpcResult<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

/// A committed call running on the tokio runtime.
///
/// Dropping it does not stop the call; use [`CallFuture::abort`] for that.
pub struct CallFuture {
    handle: JoinHandle<RpcResult<Value>>,
    path: Arc<str>,
}

impl CallFuture {
    /// Stop the call. The connection is released and the future resolves
    /// with a `CANCELLED` error.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Future for CallFuture {
    type Output = RpcResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) if join_error.is_cancelled() => {
                Poll::Ready(Err(RpcError::cancelled(&self.path)))
            }
            Poll::Ready(Err(join_error)) => Poll::Ready(Err(RpcError::internal(format!(
                "Call to '{}' panicked: {}",
                self.path, join_error
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

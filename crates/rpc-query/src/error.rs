//! Error types for RPC query helpers
//!
//! Two families of errors live here:
//!
//! - [`RpcError`] is what a transport (or the procedure behind it) produces.
//!   Helpers hand it back to the caller exactly as the transport returned it.
//! - [`ClientError`] covers everything this crate decides on its own: tree
//!   construction conflicts, streaming procedures invoked through a
//!   request/response helper, injector misses.
//!
//! # Example
//! ```rust,ignore
//! use rpc_query::{RpcError, RpcErrorCode};
//!
//! let error = RpcError::new(RpcErrorCode::NotFound, "User not found");
//! let error = RpcError::not_found("User not found"); // Convenience method
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error codes carried by [`RpcError`].
///
/// Serialized as SCREAMING_SNAKE_CASE strings (`NotFound` becomes `"NOT_FOUND"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorCode {
    // Client errors (4xx equivalent)
    /// The request was malformed or invalid
    BadRequest,
    /// Authentication is required
    Unauthorized,
    /// The authenticated user lacks permission
    Forbidden,
    /// The requested resource was not found
    NotFound,
    /// Input validation failed
    ValidationError,
    /// The request conflicts with current state
    Conflict,
    /// The request payload exceeds size limits
    PayloadTooLarge,

    // Server errors (5xx equivalent)
    /// An unexpected internal error occurred
    InternalError,
    /// The requested functionality is not implemented
    NotImplemented,
    /// The service is temporarily unavailable
    ServiceUnavailable,

    // RPC-specific errors
    /// The requested procedure was not found
    ProcedureNotFound,
    /// JSON serialization/deserialization failed
    SerializationError,
    /// The transport could not deliver the request
    TransportError,
    /// The caller cancelled the call
    Cancelled,
}

impl RpcErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::ProcedureNotFound => "PROCEDURE_NOT_FOUND",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if this is a client error (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest
                | Self::Unauthorized
                | Self::Forbidden
                | Self::NotFound
                | Self::ValidationError
                | Self::Conflict
                | Self::PayloadTooLarge
        )
    }

    /// Returns true if this is a server error (5xx equivalent).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::InternalError | Self::NotImplemented | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error produced by a transport or by the remote procedure.
///
/// Helpers never rewrite these; whatever the transport returns is what the
/// caller of `call`, `call_effect`, `query_fn` or `mutation_fn` observes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct RpcError {
    /// Error code
    pub code: RpcErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (JSON value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new error with code and message.
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Create a NOT_FOUND error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::NotFound, message)
    }

    /// Create a BAD_REQUEST error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::BadRequest, message)
    }

    /// Create a VALIDATION_ERROR error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::ValidationError, message)
    }

    /// Create an INTERNAL_ERROR error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InternalError, message)
    }

    /// Create a PROCEDURE_NOT_FOUND error.
    pub fn procedure_not_found(path: &str) -> Self {
        Self::new(
            RpcErrorCode::ProcedureNotFound,
            format!("Procedure '{}' not found", path),
        )
    }

    /// Create a SERIALIZATION_ERROR error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::SerializationError, message)
    }

    /// Create a TRANSPORT_ERROR error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::TransportError, message)
    }

    /// Create a CANCELLED error for the given procedure path.
    pub fn cancelled(path: &str) -> Self {
        Self::new(
            RpcErrorCode::Cancelled,
            format!("Call to '{}' was cancelled", path),
        )
    }

    /// Create a SERVICE_UNAVAILABLE error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::ServiceUnavailable, message)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

/// Result type alias for transport-level operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors raised by the client integration itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// A single-segment tag shadows one of the client's root helpers.
    #[error(
        "RPC procedure \"{tag}\" conflicts with a reserved root helper name of the query client"
    )]
    ReservedName {
        /// The offending tag
        tag: String,
    },

    /// Two tags disagree on whether a segment is a procedure or a namespace.
    #[error(
        "RPC procedure path \"{path}\" conflicts with an existing helper segment \"{segment}\""
    )]
    PathConflict {
        /// Dotted path of the procedure being inserted
        path: String,
        /// The segment where the conflict was detected
        segment: String,
    },

    /// The same tag was registered twice.
    #[error("RPC procedure \"{tag}\" is already registered in this group")]
    DuplicateTag {
        /// The duplicated tag
        tag: String,
    },

    /// A streaming procedure was invoked through a request/response helper.
    #[error(
        "RPC procedure \"{tag}\" returns a stream and is not supported by this integration. \
         Use a stream-specific integration path for this procedure."
    )]
    StreamUnsupported {
        /// The streaming procedure's tag
        tag: String,
    },

    /// No helper exists at the requested path.
    #[error("No RPC procedure helper at \"{path}\"")]
    UnknownProcedure {
        /// The dotted path that was looked up
        path: String,
    },

    /// A helper exists but has the other shape.
    #[error("RPC procedure \"{path}\" is a {actual}, not a {expected}")]
    KindMismatch {
        /// The dotted path that was looked up
        path: String,
        /// Shape the caller asked for
        expected: crate::ProcedureKind,
        /// Shape the helper actually has
        actual: crate::ProcedureKind,
    },

    /// `call` needs a running tokio runtime to commit the computation.
    #[error("Cannot call RPC procedure \"{tag}\" outside of a tokio runtime")]
    RuntimeUnavailable {
        /// Tag of the procedure being called
        tag: String,
    },

    /// An injection token has no provider in the injector or its parents.
    #[error("No provider for {token}")]
    MissingProvider {
        /// Name of the token
        token: String,
    },

    /// A provider produced a value of an unexpected type.
    #[error("Provider for {token} produced a value of the wrong type")]
    ProviderType {
        /// Name of the token
        token: String,
    },

    /// A provider's factory resolved its own token, directly or through
    /// other providers.
    #[error("Circular dependency while resolving {token}")]
    CircularDependency {
        /// Name of the token
        token: String,
    },

    /// Client options failed validation.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Result type alias for client-side operations.
pub type ClientResult<T> = Result<T, ClientError>;

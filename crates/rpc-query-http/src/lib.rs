#![warn(missing_docs)]
//! # rpc-query-http
//!
//! An HTTP [`TransportLayer`](rpc_query::TransportLayer) for `rpc-query`
//! clients. Every call is one `POST` carrying `{"path": tag, "input": value}`
//! as JSON.
//!
//! ```rust,ignore
//! use rpc_query::prelude::*;
//! use rpc_query_http::*;
//!
//! let factory = create_rpc_query_client(
//!     RpcQueryClientConfigInput::with_transport_from(group, http_transport_token())
//!         .with_key_prefix("app"),
//! );
//! let injector = Injector::new(
//!     factory
//!         .providers()
//!         .extend(provide_http_client())
//!         .extend(provide_http_transport(HttpTransportOptions::new("http://localhost:3000/rpc"))),
//! );
//! let client = factory.inject_client(&injector)?;
//! ```
//!
//! Non-success responses whose body is an `RpcError` (bare or under
//! `"error"`) surface as that error; other failures get a code derived from
//! the status.

mod layer;
mod provider;
mod response;

pub use layer::{HttpTransportLayer, HttpTransportOptions, UrlSource};
pub use provider::{
    http_client_token, http_transport_token, provide_http_client, provide_http_client_with,
    provide_http_transport,
};
pub use response::{code_for_status, decode_response};

//! Response decoding

use reqwest::StatusCode;
use rpc_query::{RpcError, RpcErrorCode, RpcResult};
use serde_json::Value;

/// Error code for a non-success status that carried no error body.
pub fn code_for_status(status: StatusCode) -> RpcErrorCode {
    match status {
        StatusCode::BAD_REQUEST => RpcErrorCode::BadRequest,
        StatusCode::UNAUTHORIZED => RpcErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => RpcErrorCode::Forbidden,
        StatusCode::NOT_FOUND => RpcErrorCode::NotFound,
        StatusCode::CONFLICT => RpcErrorCode::Conflict,
        StatusCode::PAYLOAD_TOO_LARGE => RpcErrorCode::PayloadTooLarge,
        StatusCode::UNPROCESSABLE_ENTITY => RpcErrorCode::ValidationError,
        StatusCode::NOT_IMPLEMENTED => RpcErrorCode::NotImplemented,
        StatusCode::SERVICE_UNAVAILABLE => RpcErrorCode::ServiceUnavailable,
        s if s.is_client_error() => RpcErrorCode::BadRequest,
        _ => RpcErrorCode::InternalError,
    }
}

/// Turn a status and raw body into the call's result.
///
/// Success bodies are JSON (an empty body or `204` is `null`). Error bodies
/// that carry an [`RpcError`], bare or under an `"error"` field, are returned
/// as is.
pub fn decode_response(status: StatusCode, body: &[u8]) -> RpcResult<Value> {
    if status.is_success() {
        if status == StatusCode::NO_CONTENT || body.is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_slice(body)?);
    }

    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        let candidate = value.get("error").cloned().unwrap_or(value);
        if let Ok(error) = serde_json::from_value::<RpcError>(candidate) {
            return Err(error);
        }
    }

    let text = String::from_utf8_lossy(body);
    let message = if text.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, text.trim())
    };
    Err(RpcError::new(code_for_status(status), message))
}

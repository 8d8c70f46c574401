//! Client lifecycle logging functions.
//!
//! Inputs and results are never logged; only tags, counts and kinds.

use crate::ProcedureKind;

// =============================================================================
// Client Lifecycle Logging
// =============================================================================

/// Log that a client's helper tree was built.
///
/// Logged at Debug level.
///
/// # Example
///
/// ```rust,ignore
/// log_client_built(12, Some("app"));
/// ```
pub fn log_client_built(procedure_count: usize, key_prefix: Option<&str>) {
    tracing::debug!(
        procedure_count = %procedure_count,
        key_prefix = key_prefix.unwrap_or(""),
        "RPC query client built"
    );
}

/// Log the registration of one procedure helper. Logged at Trace level.
///
/// # Example
///
/// ```rust,ignore
/// log_procedure_registered("users.get", ProcedureKind::Query, false);
/// ```
pub fn log_procedure_registered(tag: &str, kind: ProcedureKind, stream: bool) {
    tracing::trace!(
        tag = %tag,
        kind = %kind,
        stream = stream,
        "Procedure helper registered"
    );
}

/// Log a rejected call of a streaming procedure. Logged at Warn level.
pub fn log_stream_rejected(tag: &str) {
    tracing::warn!(tag = %tag, "Streaming procedure called through the query client");
}

/// Log the first resolution of an injected singleton.
pub fn log_provider_resolved(token: &str) {
    tracing::debug!(token = %token, "Provider resolved");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_without_subscriber() {
        log_client_built(0, None);
        log_procedure_registered("a.b", ProcedureKind::Mutation, false);
        log_stream_rejected("events.tail");
        log_provider_resolved("RpcQueryClient");
    }
}

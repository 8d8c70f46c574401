//! Procedure definitions and their query/mutation classification
//!
//! A procedure is declared once with [`Rpc::new`] (request/response) or
//! [`Rpc::stream`] (streamed success payload). Whether the client exposes it
//! with a query-shaped or a mutation-shaped helper is decided by wrapping it
//! with [`as_query`] or [`as_mutation`]; an unwrapped procedure is a query.
//!
//! ```rust,ignore
//! use rpc_query::procedure::{Rpc, as_mutation};
//!
//! let get = Rpc::new("users.get");
//! let rename = as_mutation(Rpc::new("users.updateName"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a procedure's success payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessShape {
    /// A single value
    #[default]
    Value,
    /// A stream of values
    Stream,
}

/// A procedure declaration: its tag and its success shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rpc {
    tag: String,
    success: SuccessShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Rpc {
    /// Declare a request/response procedure.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            success: SuccessShape::Value,
            description: None,
        }
    }

    /// Declare a procedure whose success payload is streamed.
    pub fn stream(tag: impl Into<String>) -> Self {
        Self {
            success: SuccessShape::Stream,
            ..Self::new(tag)
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The procedure tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The success shape.
    pub fn success(&self) -> SuccessShape {
        self.success
    }

    /// True when the success payload is a stream.
    pub fn is_stream(&self) -> bool {
        self.success == SuccessShape::Stream
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Tag split on `.`.
    pub fn path_segments(&self) -> Vec<String> {
        self.tag.split('.').map(str::to_string).collect()
    }
}

/// Which helper shape a procedure gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Read-only; gets `query_key`/`query_fn`/`query_options`
    #[default]
    Query,
    /// Write; gets `mutation_key`/`mutation_fn`/`mutation_options`
    Mutation,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
        }
    }
}

/// A procedure together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRpc {
    /// Helper shape
    pub kind: ProcedureKind,
    /// The procedure
    pub rpc: Rpc,
}

impl ClassifiedRpc {
    /// The procedure tag.
    pub fn tag(&self) -> &str {
        self.rpc.tag()
    }

    /// Same procedure under another tag; classification is kept.
    pub(crate) fn retag(mut self, tag: String) -> Self {
        self.rpc.tag = tag;
        self
    }
}

impl From<Rpc> for ClassifiedRpc {
    fn from(rpc: Rpc) -> Self {
        Self {
            kind: ProcedureKind::Query,
            rpc,
        }
    }
}

/// Mark a procedure as a mutation. Marking twice is a no-op.
pub fn as_mutation(procedure: impl Into<ClassifiedRpc>) -> ClassifiedRpc {
    ClassifiedRpc {
        kind: ProcedureKind::Mutation,
        ..procedure.into()
    }
}

/// Mark a procedure as a query. Marking twice is a no-op.
pub fn as_query(procedure: impl Into<ClassifiedRpc>) -> ClassifiedRpc {
    ClassifiedRpc {
        kind: ProcedureKind::Query,
        ..procedure.into()
    }
}

/// The helper shape for `procedure`.
pub fn classify(procedure: &ClassifiedRpc) -> ProcedureKind {
    procedure.kind
}

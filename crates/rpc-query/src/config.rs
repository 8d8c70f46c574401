//! Client configuration
//!
//! [`ClientOptions`] holds the serializable part of a client's setup: the
//! key prefix and the query/mutation defaults. It can be written in code with
//! the `with_*` builders or loaded from JSON:
//!
//! ```rust,ignore
//! let options = ClientOptions::from_json(r#"{
//!     "keyPrefix": ["app", "v1"],
//!     "queryDefaults": { "staleTime": 30000, "retry": 2 }
//! }"#)?;
//! ```

use crate::key::KeyPrefix;
use crate::options::{MutationOptionsOverrides, QueryOptionsOverrides};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings the caller may not put in defaults; the client derives them.
pub const DERIVED_FIELDS: &[&str] = &["queryKey", "queryFn", "mutationKey", "mutationFn"];

/// Error returned when client options fail validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// A key prefix segment is the empty string
    EmptyPrefixSegment,
    /// Defaults try to set a field the client derives
    DerivedField(String),
    /// The options are not valid JSON of the expected shape
    Parse(String),
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPrefixSegment => {
                write!(f, "key_prefix segments must not be empty")
            }
            Self::DerivedField(field) => {
                write!(f, "defaults cannot set derived field '{}'", field)
            }
            Self::Parse(msg) => write!(f, "invalid client options: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl From<ConfigValidationError> for crate::ClientError {
    fn from(err: ConfigValidationError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Serializable client settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    /// Prefix prepended to every derived key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<KeyPrefix>,
    /// Defaults under every query helper's options
    pub query_defaults: QueryOptionsOverrides,
    /// Defaults under every mutation helper's options
    pub mutation_defaults: MutationOptionsOverrides,
}

impl ClientOptions {
    /// Options with no prefix and empty defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate options from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigValidationError> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| ConfigValidationError::Parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(KeyPrefix::Segments(segments)) = &self.key_prefix
            && segments.iter().any(String::is_empty)
        {
            return Err(ConfigValidationError::EmptyPrefixSegment);
        }

        let set_fields = self
            .query_defaults
            .extra
            .keys()
            .chain(self.mutation_defaults.extra.keys());
        for field in set_fields {
            if DERIVED_FIELDS.contains(&field.as_str()) {
                return Err(ConfigValidationError::DerivedField(field.clone()));
            }
        }
        Ok(())
    }

    /// Set the key prefix.
    #[must_use = "This method returns new ClientOptions and does not modify self"]
    pub fn with_key_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the query defaults.
    #[must_use = "This method returns new ClientOptions and does not modify self"]
    pub fn with_query_defaults(mut self, defaults: QueryOptionsOverrides) -> Self {
        self.query_defaults = defaults;
        self
    }

    /// Set the mutation defaults.
    #[must_use = "This method returns new ClientOptions and does not modify self"]
    pub fn with_mutation_defaults(mut self, defaults: MutationOptionsOverrides) -> Self {
        self.mutation_defaults = defaults;
        self
    }
}

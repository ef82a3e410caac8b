//! Error types for the epic audit

use thiserror::Error;

/// Result type for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Errors raised while loading rules or evaluating them against a backend
#[derive(Debug, Error)]
pub enum AuditError {
    /// A rule or serializer names a field the entity schema does not define
    #[error("unknown field '{field}' on {entity}")]
    UnknownField { entity: String, field: String },

    /// A rule names a validator kind that is not registered
    #[error("unknown validator kind: {kind}")]
    UnknownValidator { kind: String },

    /// The rule set document could not be parsed
    #[error("invalid rule set: {message}")]
    InvalidRuleSet { message: String },

    /// No Scope entity carries the given name
    #[error("scope not found: {name}")]
    ScopeNotFound { name: String },

    /// No status entity carries the given name
    #[error("status not found: {name}")]
    StatusNotFound { name: String },

    /// An item returned by the backend lacks a field the serializer needs
    #[error("{oid} has no attribute '{field}'")]
    MissingAttribute { oid: String, field: String },

    /// Backend transport or decoding failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// Create an unknown field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create a missing attribute error
    pub fn missing_attribute(oid: impl ToString, field: impl Into<String>) -> Self {
        Self::MissingAttribute {
            oid: oid.to_string(),
            field: field.into(),
        }
    }

    /// Create an invalid rule set error
    pub fn invalid_rule_set(message: impl Into<String>) -> Self {
        Self::InvalidRuleSet {
            message: message.into(),
        }
    }

    /// True when a Scope or status name did not resolve to an entity
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Self::ScopeNotFound { .. } | Self::StatusNotFound { .. })
    }
}

/// Errors raised by a [`Backend`](crate::backend::Backend) implementation
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or connection failure
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// 401 - token missing, invalid or revoked
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// 404 - endpoint or asset type not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The payload did not have the expected shape
    #[error("cannot decode backend payload: {0}")]
    Decode(String),
}

impl BackendError {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

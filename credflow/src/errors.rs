//! Error types for the credflow operation pipeline.
//!
//! Every failure an operation can surface is a variant of
//! [`PipelineError`]; there is no internal retry and no wrapping layer —
//! errors raised by a stage or by the default action reach the caller
//! unchanged.

use thiserror::Error;

use crate::extensions::ExtensionStage;

/// The error type surfaced by every pipeline operation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required identity attribute was absent or empty.
    ///
    /// Distinct from [`PipelineError::Unauthorized`]: the principal could
    /// not even be evaluated. The message names the missing attribute.
    #[error("{attribute} is required for authorization")]
    InvalidPrincipal {
        /// The missing attribute ("email" or "tenant").
        attribute: String,
    },

    /// The policy decision denied the operation.
    #[error("unauthorized access")]
    Unauthorized,

    /// No record with the given identifier exists.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// The resource type name.
        resource: String,
        /// The identifier that missed.
        id: String,
    },

    /// An extension rejected the input during the ValidateInput stage.
    #[error("input validation failed: {0}")]
    ValidationFailed(String),

    /// The operation is deliberately unsupported for this resource.
    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),

    /// The digest configuration is malformed (cost or length out of bounds).
    #[error("invalid secret configuration: {0}")]
    Configuration(String),

    /// Cancellation was observed at operation entry.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// An extension failed outside the validation and cleanup stages.
    #[error("extension '{name}' failed during {stage}: {message}")]
    Extension {
        /// The extension that failed.
        name: String,
        /// The stage it was executing.
        stage: ExtensionStage,
        /// The failure description.
        message: String,
    },

    /// An extension failed during AfterAction or ReleaseUnmanagedResources.
    ///
    /// The default action may already have completed; the caller is still
    /// told the surrounding cleanup failed rather than receiving a result.
    #[error("cleanup failed during {stage}: {message}")]
    Cleanup {
        /// The cleanup stage that failed.
        stage: ExtensionStage,
        /// The failure description.
        message: String,
    },

    /// The call finished but no result was left in the slot.
    ///
    /// Happens when an extension suppressed the default action without
    /// planting a result of its own, or unbound the target role.
    #[error("operation completed without a result")]
    ResultUnset,

    /// A payload could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Creates a not-found error for a resource type and identifier.
    #[must_use]
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Creates an invalid-principal error naming the missing attribute.
    #[must_use]
    pub fn invalid_principal(attribute: impl Into<String>) -> Self {
        Self::InvalidPrincipal {
            attribute: attribute.into(),
        }
    }
}

/// Error raised by an [`Extension`](crate::extensions::Extension) from
/// within a stage.
///
/// The pipeline maps it to a [`PipelineError`] variant according to the
/// stage it was raised in.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExtensionError {
    /// The failure description.
    pub message: String,
}

impl ExtensionError {
    /// Creates a new extension error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_principal_message_names_attribute() {
        let err = PipelineError::invalid_principal("email");
        assert_eq!(err.to_string(), "email is required for authorization");

        let err = PipelineError::invalid_principal("tenant");
        assert_eq!(err.to_string(), "tenant is required for authorization");
    }

    #[test]
    fn not_found_message_carries_resource_and_id() {
        let err = PipelineError::not_found("ClientCredential", "abc-123");
        assert_eq!(err.to_string(), "ClientCredential with id abc-123 not found");
    }

    #[test]
    fn cleanup_is_distinct_from_extension_failure() {
        let cleanup = PipelineError::Cleanup {
            stage: ExtensionStage::AfterAction,
            message: "socket leak".into(),
        };
        assert!(cleanup.to_string().contains("AfterAction"));
        assert!(matches!(cleanup, PipelineError::Cleanup { .. }));
    }
}

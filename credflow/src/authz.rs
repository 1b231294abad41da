//! Authorization gate consumed by the operation pipeline.
//!
//! The gate is an external collaborator: the pipeline calls
//! [`AuthorizationGate::check`] exactly once per operation, before any
//! extension stage, and extensions cannot bypass it. The policy engine
//! behind the gate is out of scope; [`PolicyTableGate`] is the trivial
//! deterministic implementation used by tests and embedders that do not
//! run a real engine.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::errors::PipelineError;

/// The authenticated caller identity presented for authorization.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    /// Email-like subject identifier.
    pub email: Option<String>,
    /// Tenant identifier.
    pub tenant: Option<String>,
    /// Additional claims, opaque to the pipeline.
    pub claims: HashMap<String, String>,
}

impl Principal {
    /// Creates a principal with both required attributes set.
    #[must_use]
    pub fn new(email: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            tenant: Some(tenant.into()),
            claims: HashMap::new(),
        }
    }

    /// Adds a claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    /// Validates that both identity attributes are present and non-empty,
    /// returning `(email, tenant)`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::MissingAttribute`] naming the first missing
    /// attribute; email is checked before tenant.
    pub fn require_attributes(&self) -> Result<(&str, &str), AuthzError> {
        let email = self
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthzError::missing("email"))?;
        let tenant = self
            .tenant
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthzError::missing("tenant"))?;
        Ok((email, tenant))
    }
}

/// Authorization failure reasons.
#[derive(Debug, Clone, Error)]
pub enum AuthzError {
    /// An identity attribute was absent or empty. Reported as a
    /// client-input error, not a denial.
    #[error("{attribute} is required for authorization")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: String,
    },

    /// The policy decision denied the operation.
    #[error("unauthorized access")]
    Denied,
}

impl AuthzError {
    fn missing(attribute: &str) -> Self {
        Self::MissingAttribute {
            attribute: attribute.to_string(),
        }
    }
}

impl From<AuthzError> for PipelineError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingAttribute { attribute } => Self::InvalidPrincipal { attribute },
            AuthzError::Denied => Self::Unauthorized,
        }
    }
}

/// External collaborator deciding whether a principal may perform an
/// action on a resource.
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// Checks the principal against the policy for `(resource, action)`.
    ///
    /// # Errors
    ///
    /// [`AuthzError::MissingAttribute`] when an identity attribute is
    /// absent or empty; [`AuthzError::Denied`] on policy denial.
    async fn check(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
    ) -> Result<(), AuthzError>;
}

/// A deterministic in-memory gate over an explicit allow-list.
///
/// The decision is purely a function of
/// `(tenant, subject, resource, action)`.
#[derive(Debug, Clone, Default)]
pub struct PolicyTableGate {
    rules: BTreeSet<(String, String, String, String)>,
}

impl PolicyTableGate {
    /// Creates an empty gate that denies everything with valid attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `(tenant, subject, resource, action)`.
    #[must_use]
    pub fn allow(
        mut self,
        tenant: impl Into<String>,
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        self.rules
            .insert((tenant.into(), subject.into(), resource.into(), action.into()));
        self
    }
}

#[async_trait]
impl AuthorizationGate for PolicyTableGate {
    async fn check(
        &self,
        principal: &Principal,
        resource: &str,
        action: &str,
    ) -> Result<(), AuthzError> {
        let (email, tenant) = principal.require_attributes()?;
        let key = (
            tenant.to_string(),
            email.to_string(),
            resource.to_string(),
            action.to_string(),
        );
        if self.rules.contains(&key) {
            Ok(())
        } else {
            Err(AuthzError::Denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> PolicyTableGate {
        PolicyTableGate::new()
            .allow("looplex", "bob.rivest@email.com", "resource", "read")
            .allow("looplex", "bob.rivest@email.com", "resource", "write")
            .allow("looplex", "bob.rivest@email.com", "resource", "delete")
    }

    #[tokio::test]
    async fn empty_email_is_invalid_principal_not_denial() {
        let principal = Principal {
            email: Some(String::new()),
            tenant: Some("tenant".into()),
            claims: HashMap::new(),
        };

        let err = gate().check(&principal, "resource", "read").await.unwrap_err();
        assert!(
            matches!(err, AuthzError::MissingAttribute { ref attribute } if attribute == "email")
        );
        assert_eq!(err.to_string(), "email is required for authorization");
    }

    #[tokio::test]
    async fn missing_tenant_is_invalid_principal_naming_tenant() {
        let principal = Principal {
            email: Some("user@email.com".into()),
            tenant: None,
            claims: HashMap::new(),
        };

        let err = gate().check(&principal, "resource", "read").await.unwrap_err();
        assert!(
            matches!(err, AuthzError::MissingAttribute { ref attribute } if attribute == "tenant")
        );
    }

    #[tokio::test]
    async fn empty_tenant_is_invalid_principal() {
        let principal = Principal {
            email: Some("user@email.com".into()),
            tenant: Some(String::new()),
            claims: HashMap::new(),
        };

        let err = gate().check(&principal, "resource", "read").await.unwrap_err();
        assert!(
            matches!(err, AuthzError::MissingAttribute { ref attribute } if attribute == "tenant")
        );
    }

    #[tokio::test]
    async fn allowed_actions_pass() {
        let principal = Principal::new("bob.rivest@email.com", "looplex");
        for action in ["read", "write", "delete"] {
            gate().check(&principal, "resource", action).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unlisted_action_is_denied() {
        let principal = Principal::new("bob.rivest@email.com", "looplex");
        let err = gate()
            .check(&principal, "resource", "execute")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Denied));
    }

    #[tokio::test]
    async fn decision_is_deterministic() {
        let principal = Principal::new("bob.rivest@email.com", "looplex");
        for _ in 0..32 {
            assert!(gate().check(&principal, "resource", "read").await.is_ok());
            assert!(gate().check(&principal, "resource", "execute").await.is_err());
        }
    }
}

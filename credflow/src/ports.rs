//! Contracts for external collaborators.
//!
//! These interfaces are consumed by layers adjacent to the pipeline; the
//! core never implements them. They exist here so embedders share one
//! vocabulary with the credential service.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// Signs and validates bearer tokens for the authentication layer that
/// consumes the credentials this crate issues.
///
/// Token cryptography is out of scope for the pipeline; implementations
/// wrap whatever JWT stack the embedding application uses.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Generates a signed token for the given claims.
    async fn generate_token(
        &self,
        signing_key: &str,
        issuer: &str,
        audience: &str,
        claims: HashMap<String, String>,
        ttl: Duration,
    ) -> String;

    /// Validates a token's signature, issuer, audience and lifetime.
    async fn validate_token(
        &self,
        verifying_key: &str,
        issuer: &str,
        audience: &str,
        token: &str,
    ) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issuer_contract_round_trip() {
        let mut issuer = MockTokenIssuer::new();
        issuer
            .expect_generate_token()
            .returning(|_, _, _, _, _| "token".to_string());
        issuer
            .expect_validate_token()
            .returning(|_, _, _, token| token == "token");

        let token = issuer
            .generate_token(
                "signing-key",
                "credflow",
                "api",
                HashMap::new(),
                Duration::from_secs(300),
            )
            .await;
        assert!(issuer.validate_token("verify-key", "credflow", "api", &token).await);
        assert!(!issuer.validate_token("verify-key", "credflow", "api", "forged").await);
    }
}

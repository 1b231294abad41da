//! Salted, cost-parameterized one-way digesting of client secrets.
//!
//! A secret is never stored; only its Argon2id digest is, keyed by the
//! public `client_id` as the salt so that verification can recompute the
//! digest deterministically from the presented pair. Comparison against
//! a stored digest is constant-time.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::SecretsConfig;
use crate::errors::PipelineError;

/// Digest output length in bytes.
const DIGEST_LEN: usize = 32;

/// A failure while computing a digest.
#[derive(Debug, Clone, Error)]
#[error("digest computation failed: {message}")]
pub struct DigestError {
    /// The underlying KDF failure.
    pub message: String,
}

impl From<argon2::Error> for DigestError {
    fn from(err: argon2::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<DigestError> for PipelineError {
    fn from(err: DigestError) -> Self {
        Self::Configuration(err.message)
    }
}

/// A freshly issued secret together with its storable digest.
///
/// The plaintext secret exists only in this value; persist the digest,
/// hand the secret to the client, and drop the rest.
#[derive(Debug, Clone)]
pub struct IssuedSecret {
    /// The raw random secret bytes.
    pub secret: Vec<u8>,
    /// Base64-encoded digest of the secret, salted by the client id.
    pub digest: String,
}

/// One-way transform of randomly generated secrets into verifiable
/// digests.
#[derive(Clone)]
pub struct CredentialDigestor {
    kdf: Argon2<'static>,
    secret_byte_length: usize,
}

impl std::fmt::Debug for CredentialDigestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDigestor")
            .field("secret_byte_length", &self.secret_byte_length)
            .finish_non_exhaustive()
    }
}

impl CredentialDigestor {
    /// Builds a digestor from validated configuration.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] when a parameter is out of the
    /// documented bounds or rejected by the KDF.
    pub fn new(config: &SecretsConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let params = Params::new(
            config.digest_memory_kib,
            config.digest_cost,
            1,
            Some(DIGEST_LEN),
        )
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        Ok(Self {
            kdf: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            secret_byte_length: config.secret_byte_length,
        })
    }

    /// Generates a fresh random secret and its digest for a client id.
    ///
    /// # Errors
    ///
    /// Propagates digest failures; nothing is issued on error.
    pub fn issue(&self, client_id: &str) -> Result<IssuedSecret, DigestError> {
        let mut secret = vec![0u8; self.secret_byte_length];
        OsRng.fill_bytes(&mut secret);
        let digest = self.digest(client_id, &secret)?;
        Ok(IssuedSecret { secret, digest })
    }

    /// Recomputes the digest for a `(client_id, secret)` pair.
    ///
    /// Deterministic: the same pair always yields the same digest under
    /// the same configuration.
    ///
    /// # Errors
    ///
    /// Fails when the KDF rejects the inputs, e.g. a salt shorter than
    /// the KDF minimum.
    pub fn digest(&self, client_id: &str, secret: &[u8]) -> Result<String, DigestError> {
        let mut out = [0u8; DIGEST_LEN];
        self.kdf
            .hash_password_into(secret, client_id.as_bytes(), &mut out)?;
        Ok(BASE64.encode(out))
    }

    /// Verifies a presented secret against a stored digest in constant
    /// time.
    ///
    /// A malformed stored digest verifies as `false`, never as an error:
    /// the caller must not be able to distinguish it from a mismatch.
    ///
    /// # Errors
    ///
    /// Fails only when the digest of the presented pair cannot be
    /// computed.
    pub fn verify(
        &self,
        client_id: &str,
        secret: &[u8],
        stored_digest: &str,
    ) -> Result<bool, DigestError> {
        let computed = self.digest(client_id, secret)?;
        Ok(Self::digests_match(&computed, stored_digest))
    }

    /// Constant-time comparison of two base64 digests.
    #[must_use]
    pub fn digests_match(computed: &str, stored: &str) -> bool {
        let Ok(computed_bytes) = BASE64.decode(computed) else {
            return false;
        };
        let Ok(stored_bytes) = BASE64.decode(stored) else {
            return false;
        };
        if computed_bytes.len() != stored_bytes.len() {
            return false;
        }
        computed_bytes.ct_eq(&stored_bytes).into()
    }
}

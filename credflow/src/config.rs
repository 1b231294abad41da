//! Configuration for secret issuance and digesting.

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Upper bound on the digest cost factor; beyond this the KDF runtime is
/// pathological for an interactive service.
pub const MAX_DIGEST_COST: u32 = 64;

/// Upper bound on the generated secret length in bytes.
pub const MAX_SECRET_BYTE_LENGTH: usize = 1024;

/// Minimum KDF memory in KiB accepted by the digest parameters.
pub const MIN_DIGEST_MEMORY_KIB: u32 = 8;

/// Parameters for secret generation and digesting.
///
/// Defaults are production-strength; tests construct cheap variants
/// explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretsConfig {
    /// Number of random bytes in a generated client secret.
    pub secret_byte_length: usize,
    /// KDF work factor (iterations). Higher strictly increases runtime.
    pub digest_cost: u32,
    /// KDF memory in KiB.
    pub digest_memory_kib: u32,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            secret_byte_length: 32,
            digest_cost: 2,
            digest_memory_kib: 19_456,
        }
    }
}

impl SecretsConfig {
    /// Cheap parameters for tests. Not suitable for production use.
    #[must_use]
    pub fn insecure_fast() -> Self {
        Self {
            secret_byte_length: 16,
            digest_cost: 1,
            digest_memory_kib: MIN_DIGEST_MEMORY_KIB,
        }
    }

    /// Validates the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] naming the malformed
    /// parameter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.secret_byte_length == 0 || self.secret_byte_length > MAX_SECRET_BYTE_LENGTH {
            return Err(PipelineError::Configuration(format!(
                "secret_byte_length must be in 1..={MAX_SECRET_BYTE_LENGTH}, got {}",
                self.secret_byte_length
            )));
        }
        if self.digest_cost == 0 || self.digest_cost > MAX_DIGEST_COST {
            return Err(PipelineError::Configuration(format!(
                "digest_cost must be in 1..={MAX_DIGEST_COST}, got {}",
                self.digest_cost
            )));
        }
        if self.digest_memory_kib < MIN_DIGEST_MEMORY_KIB {
            return Err(PipelineError::Configuration(format!(
                "digest_memory_kib must be at least {MIN_DIGEST_MEMORY_KIB}, got {}",
                self.digest_memory_kib
            )));
        }
        Ok(())
    }
}

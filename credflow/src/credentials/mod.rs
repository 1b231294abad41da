//! The client-credential resource family.
//!
//! [`ClientCredential`] is the concrete resource exemplifying the
//! pipeline pattern; [`ClientCredentials`] is its operation service.

mod service;

pub use service::{ClientCredentials, RESOURCE_NAME};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Identified;

/// An OAuth2-style client credential record.
///
/// `id` and `client_id` are assigned at creation and immutable
/// thereafter. The digest is the only stored trace of the secret and
/// never leaves the process: it is skipped during serialization, so
/// retrieved payloads cannot leak the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientCredential {
    /// Store-assigned unique identifier.
    pub id: String,
    /// Public client identifier.
    pub client_id: String,
    /// Secret verifier. `None` marks a failed issuance; such a record
    /// must never be persisted.
    #[serde(skip)]
    pub digest: Option<String>,
    /// Optional human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ClientCredential {
    /// Creates an empty, unpersisted credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ClientCredential {
    fn default() -> Self {
        Self {
            id: String::new(),
            client_id: String::new(),
            digest: None,
            display_name: None,
            created_at: Utc::now(),
        }
    }
}

impl Identified for ClientCredential {
    fn id(&self) -> &str {
        &self.id
    }
}

/// SCIM-style page envelope returned by Query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// The records of the requested window.
    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
    /// The 1-based start index the caller asked for.
    pub start_index: i64,
    /// The requested page size.
    pub items_per_page: usize,
    /// Total records in the collection, independent of the window.
    pub total_results: usize,
}

//! # Credflow
//!
//! An extensible operation pipeline for identity-adjacent resources.
//!
//! Every read/write request passes through a fixed sequence of named
//! extension stages around a built-in default action, gated by an
//! authorization check and, for credential creation and lookup, by
//! cryptographically sound secret issuance and verification:
//!
//! - **Extension stages**: seven fixed points where pluggable behavior
//!   runs, in protocol order, without weakening the authorization or
//!   secret-handling guarantees
//! - **Authorization gate**: consulted once per operation, before any
//!   stage, impossible to bypass from an extension
//! - **Secret digesting**: salted, cost-parameterized one-way transform;
//!   the plaintext secret is never stored and never serialized
//! - **Cancellation**: one cooperative check at operation entry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use credflow::prelude::*;
//!
//! let service = ClientCredentials::new(
//!     gate,
//!     Arc::new(InMemoryStore::new()),
//!     ExtensionRegistry::new(),
//!     &SecretsConfig::default(),
//! )?;
//!
//! let id = service.create(&principal, payload, &cancel).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod authz;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod credentials;
pub mod digest;
pub mod errors;
pub mod extensions;
pub mod pipeline;
pub mod ports;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::authz::{AuthorizationGate, AuthzError, PolicyTableGate, Principal};
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::SecretsConfig;
    pub use crate::context::{
        OperationContext, OperationOutcome, RoleBag, RoleBinding, CREDENTIAL_ROLE,
    };
    pub use crate::credentials::{ClientCredential, ClientCredentials, ListResponse};
    pub use crate::digest::{CredentialDigestor, IssuedSecret};
    pub use crate::errors::{ExtensionError, PipelineError};
    pub use crate::extensions::{Extension, ExtensionRegistry, ExtensionStage};
    pub use crate::pipeline::OperationPipeline;
    pub use crate::ports::TokenIssuer;
    pub use crate::store::{Identified, InMemoryStore, ResourceStore};
}

//! Per-invocation operation context.
//!
//! An [`OperationContext`] is created fresh for each operation, owned
//! exclusively by that call, carried mutably through every stage, and
//! discarded when the call returns. Because ownership is exclusive there
//! is no interior locking; stages observe each other's mutations by
//! running strictly in sequence.

use std::collections::HashMap;

use crate::credentials::ClientCredential;

/// The role name under which the pipeline binds the target credential.
pub const CREDENTIAL_ROLE: &str = "ClientCredential";

/// A domain object bound under a role name.
///
/// A closed sum over the entities of this resource family keeps the
/// "bind now, consume later" pattern type-safe; extensions needing to
/// stash arbitrary data use [`RoleBinding::Value`].
#[derive(Debug, Clone)]
pub enum RoleBinding {
    /// A client credential record.
    Credential(ClientCredential),
    /// Opaque extension-owned data.
    Value(serde_json::Value),
}

/// A typed map from role name to bound domain object.
#[derive(Debug, Clone, Default)]
pub struct RoleBag {
    bindings: HashMap<String, RoleBinding>,
}

impl RoleBag {
    /// Creates an empty role bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a domain object under a role name, replacing any previous
    /// binding for that name.
    pub fn bind(&mut self, role: impl Into<String>, binding: RoleBinding) {
        self.bindings.insert(role.into(), binding);
    }

    /// Returns whether a role is bound.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.bindings.contains_key(role)
    }

    /// Returns the binding for a role, if any.
    #[must_use]
    pub fn get(&self, role: &str) -> Option<&RoleBinding> {
        self.bindings.get(role)
    }

    /// Returns the credential bound under a role, if the role holds one.
    #[must_use]
    pub fn credential(&self, role: &str) -> Option<&ClientCredential> {
        match self.bindings.get(role) {
            Some(RoleBinding::Credential(credential)) => Some(credential),
            _ => None,
        }
    }

    /// Removes and returns the credential bound under a role.
    pub fn take_credential(&mut self, role: &str) -> Option<ClientCredential> {
        match self.bindings.remove(role) {
            Some(RoleBinding::Credential(credential)) => Some(credential),
            Some(other) => {
                // Not a credential; put it back untouched.
                self.bindings.insert(role.to_string(), other);
                None
            }
            None => None,
        }
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// The result shapes an operation can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// A serialized record or list page.
    Payload(String),
    /// A freshly issued identifier.
    Id(String),
    /// A boolean success flag.
    Completed(bool),
}

/// Mutable state carried through all stages of one operation.
#[derive(Debug, Default)]
pub struct OperationContext {
    /// Role bindings populated by the pipeline and the binding stages.
    pub roles: RoleBag,
    result: Option<OperationOutcome>,
    skip_default_action: bool,
}

impl OperationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the result slot.
    ///
    /// Written once per call by convention; the default action is the
    /// last writer unless an extension suppressed it.
    pub fn set_result(&mut self, outcome: OperationOutcome) {
        self.result = Some(outcome);
    }

    /// Returns the result, if one was produced.
    #[must_use]
    pub fn result(&self) -> Option<&OperationOutcome> {
        self.result.as_ref()
    }

    /// Consumes the context, yielding the result slot.
    #[must_use]
    pub fn into_result(self) -> Option<OperationOutcome> {
        self.result
    }

    /// Suppresses the built-in default action; later stages still run.
    pub fn skip_default_action(&mut self) {
        self.skip_default_action = true;
    }

    /// Returns whether the default action is suppressed.
    #[must_use]
    pub fn is_default_action_skipped(&self) -> bool {
        self.skip_default_action
    }
}

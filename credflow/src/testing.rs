//! Test doubles for pipeline collaborators.
//!
//! Used by the crate's own tests and available to embedders writing
//! extension tests of their own.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::authz::{AuthorizationGate, AuthzError, Principal};
use crate::context::{OperationContext, OperationOutcome};
use crate::errors::ExtensionError;
use crate::extensions::{Extension, ExtensionStage};

/// An extension that records every stage invocation and can be
/// configured to fail at a stage or to suppress the default action.
#[derive(Debug)]
pub struct RecordingExtension {
    name: String,
    stages: Vec<ExtensionStage>,
    calls: Mutex<Vec<ExtensionStage>>,
    fail_at: Option<(ExtensionStage, String)>,
    skip_with: Option<Option<OperationOutcome>>,
}

impl RecordingExtension {
    /// Creates a recorder participating in every stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_stages(name, ExtensionStage::ALL.to_vec())
    }

    /// Creates a recorder participating only in the given stages.
    #[must_use]
    pub fn with_stages(name: impl Into<String>, stages: Vec<ExtensionStage>) -> Self {
        Self {
            name: name.into(),
            stages,
            calls: Mutex::new(Vec::new()),
            fail_at: None,
            skip_with: None,
        }
    }

    /// Configures the recorder to fail when the given stage runs.
    #[must_use]
    pub fn failing_at(mut self, stage: ExtensionStage, message: impl Into<String>) -> Self {
        self.fail_at = Some((stage, message.into()));
        self
    }

    /// Configures the recorder to suppress the default action during
    /// BeforeAction, optionally planting a result of its own.
    #[must_use]
    pub fn skipping_default_action(mut self, result: Option<OperationOutcome>) -> Self {
        self.skip_with = Some(result);
        self
    }

    /// Returns the stages this recorder has been invoked for, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ExtensionStage> {
        self.calls.lock().clone()
    }

    /// Clears recorded invocations.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Extension for RecordingExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn stages(&self) -> &[ExtensionStage] {
        &self.stages
    }

    async fn on_stage(
        &self,
        stage: ExtensionStage,
        ctx: &mut OperationContext,
    ) -> Result<(), ExtensionError> {
        self.calls.lock().push(stage);

        if let Some((fail_stage, message)) = &self.fail_at {
            if *fail_stage == stage {
                return Err(ExtensionError::new(message.clone()));
            }
        }

        if stage == ExtensionStage::BeforeAction {
            if let Some(result) = &self.skip_with {
                ctx.skip_default_action();
                if let Some(outcome) = result {
                    ctx.set_result(outcome.clone());
                }
            }
        }

        Ok(())
    }
}

/// A gate that allows any principal with valid identity attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllGate;

#[async_trait]
impl AuthorizationGate for AllowAllGate {
    async fn check(
        &self,
        principal: &Principal,
        _resource: &str,
        _action: &str,
    ) -> Result<(), AuthzError> {
        principal.require_attributes()?;
        Ok(())
    }
}

/// A gate that denies any principal with valid identity attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllGate;

#[async_trait]
impl AuthorizationGate for DenyAllGate {
    async fn check(
        &self,
        principal: &Principal,
        _resource: &str,
        _action: &str,
    ) -> Result<(), AuthzError> {
        principal.require_attributes()?;
        Err(AuthzError::Denied)
    }
}

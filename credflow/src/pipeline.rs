//! Orchestration shared by every resource operation.
//!
//! Each operation is the same deterministic sequence: one cancellation
//! check, the authorization gate, then the ordered extension stages
//! around an operation-specific default action. [`OperationPipeline`]
//! owns the gate and the registry and exposes the three phases the
//! concrete services compose: [`begin`](OperationPipeline::begin),
//! [`stage`](OperationPipeline::stage) and
//! [`finish`](OperationPipeline::finish).

use std::sync::Arc;
use tracing::{debug, warn};

use crate::authz::{AuthorizationGate, Principal};
use crate::cancellation::CancellationToken;
use crate::context::OperationContext;
use crate::errors::PipelineError;
use crate::extensions::{ExtensionRegistry, ExtensionStage};

/// Runs one resource operation as gate + stages + default action.
pub struct OperationPipeline {
    gate: Arc<dyn AuthorizationGate>,
    extensions: ExtensionRegistry,
    resource: String,
}

impl OperationPipeline {
    /// Creates a pipeline for a named resource.
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        gate: Arc<dyn AuthorizationGate>,
        extensions: ExtensionRegistry,
    ) -> Self {
        Self {
            gate,
            extensions,
            resource: resource.into(),
        }
    }

    /// Returns the resource name operations are authorized against.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Opens an operation: the single cancellation check, then the
    /// unconditional authorization gate.
    ///
    /// Cancellation is consulted only here. Once `begin` returns, the
    /// operation runs to completion even if the token fires mid-flight.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cancelled`] when the token already fired;
    /// [`PipelineError::InvalidPrincipal`] or
    /// [`PipelineError::Unauthorized`] from the gate.
    pub async fn begin(
        &self,
        principal: &Principal,
        action: &str,
        cancel: &CancellationToken,
    ) -> Result<OperationContext, PipelineError> {
        if cancel.is_cancelled() {
            let reason = cancel
                .reason()
                .unwrap_or_else(|| "cancellation requested".to_string());
            return Err(PipelineError::Cancelled(reason));
        }

        self.gate.check(principal, &self.resource, action).await?;
        debug!(resource = %self.resource, action, "operation authorized");

        Ok(OperationContext::new())
    }

    /// Runs all extensions registered for one stage, mapping failures by
    /// stage: ValidateInput failures become [`PipelineError::ValidationFailed`],
    /// cleanup-stage failures become [`PipelineError::Cleanup`], all
    /// others [`PipelineError::Extension`].
    ///
    /// # Errors
    ///
    /// The mapped failure of the first failing extension; the stage does
    /// not continue past it.
    pub async fn stage(
        &self,
        stage: ExtensionStage,
        ctx: &mut OperationContext,
    ) -> Result<(), PipelineError> {
        self.extensions
            .run_stage(stage, ctx)
            .await
            .map_err(|(name, err)| match stage {
                ExtensionStage::ValidateInput => PipelineError::ValidationFailed(err.message),
                ExtensionStage::AfterAction | ExtensionStage::ReleaseUnmanagedResources => {
                    warn!(resource = %self.resource, %stage, extension = %name,
                        "cleanup stage failed");
                    PipelineError::Cleanup {
                        stage,
                        message: err.message,
                    }
                }
                _ => PipelineError::Extension {
                    name,
                    stage,
                    message: err.message,
                },
            })
    }

    /// Closes an operation: AfterAction then ReleaseUnmanagedResources.
    ///
    /// Both run even when the default action was skipped. A failure here
    /// is fatal to the call despite any completed default action.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cleanup`] from either stage.
    pub async fn finish(
        &self,
        mut ctx: OperationContext,
    ) -> Result<OperationContext, PipelineError> {
        self.stage(ExtensionStage::AfterAction, &mut ctx).await?;
        self.stage(ExtensionStage::ReleaseUnmanagedResources, &mut ctx)
            .await?;
        Ok(ctx)
    }
}

impl std::fmt::Debug for OperationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationPipeline")
            .field("resource", &self.resource)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

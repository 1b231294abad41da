//! Extension stages and the registry of pluggable behaviors.
//!
//! Every operation runs the same fixed sequence of named stages around
//! its default action. Extensions declare which stages they participate
//! in and are invoked in registration order within each stage; the stage
//! order itself is a protocol invariant that extensions cannot change.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::context::OperationContext;
use crate::errors::ExtensionError;

/// The named extension points of an operation, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionStage {
    /// Transform or inspect raw input before anything else.
    HandleInput,
    /// Enforce schema and business validation; failure fails the call.
    ValidateInput,
    /// Populate role bindings for the resolved record.
    DefineRoles,
    /// Attach further bindings an extension needs downstream.
    Bind,
    /// Last chance to mutate the context or suppress the default action.
    BeforeAction,
    /// Post-processing; runs even when the default action was skipped.
    AfterAction,
    /// Final cleanup; runs unconditionally, failures are fatal.
    ReleaseUnmanagedResources,
}

impl ExtensionStage {
    /// All stages in the order the pipeline runs them.
    pub const ALL: [Self; 7] = [
        Self::HandleInput,
        Self::ValidateInput,
        Self::DefineRoles,
        Self::Bind,
        Self::BeforeAction,
        Self::AfterAction,
        Self::ReleaseUnmanagedResources,
    ];

    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HandleInput => "HandleInput",
            Self::ValidateInput => "ValidateInput",
            Self::DefineRoles => "DefineRoles",
            Self::Bind => "Bind",
            Self::BeforeAction => "BeforeAction",
            Self::AfterAction => "AfterAction",
            Self::ReleaseUnmanagedResources => "ReleaseUnmanagedResources",
        }
    }
}

impl fmt::Display for ExtensionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pluggable behavior injected into operation pipelines.
///
/// Implementations are invoked once per participating stage per
/// operation, strictly sequentially, and observe every context mutation
/// made by earlier stages of the same call.
#[async_trait]
pub trait Extension: Send + Sync + fmt::Debug {
    /// Returns the extension's name, used in error reporting.
    fn name(&self) -> &str;

    /// Returns the stages this extension participates in.
    fn stages(&self) -> &[ExtensionStage];

    /// Executes the extension for one stage of one operation.
    async fn on_stage(
        &self,
        stage: ExtensionStage,
        ctx: &mut OperationContext,
    ) -> Result<(), ExtensionError>;
}

/// An ordered collection of extensions.
///
/// Registration order is invocation order within a stage.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an extension. Later registrations run after earlier ones.
    pub fn register(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with(mut self, extension: Arc<dyn Extension>) -> Self {
        self.register(extension);
        self
    }

    /// Returns the number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true if no extensions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Runs every extension registered for `stage`, in registration
    /// order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the failing extension's name together with its error.
    pub async fn run_stage(
        &self,
        stage: ExtensionStage,
        ctx: &mut OperationContext,
    ) -> Result<(), (String, ExtensionError)> {
        for extension in &self.extensions {
            if extension.stages().contains(&stage) {
                extension
                    .on_stage(stage, ctx)
                    .await
                    .map_err(|e| (extension.name().to_string(), e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingExtension;

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<&str> = ExtensionStage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "HandleInput",
                "ValidateInput",
                "DefineRoles",
                "Bind",
                "BeforeAction",
                "AfterAction",
                "ReleaseUnmanagedResources",
            ]
        );
    }

    #[tokio::test]
    async fn extensions_run_in_registration_order() {
        let first = Arc::new(RecordingExtension::new("first"));
        let second = Arc::new(RecordingExtension::new("second"));
        let registry = ExtensionRegistry::new()
            .with(first.clone())
            .with(second.clone());

        let mut ctx = OperationContext::new();
        registry
            .run_stage(ExtensionStage::HandleInput, &mut ctx)
            .await
            .unwrap();

        assert_eq!(first.calls(), vec![ExtensionStage::HandleInput]);
        assert_eq!(second.calls(), vec![ExtensionStage::HandleInput]);
    }

    #[tokio::test]
    async fn non_participating_extension_is_skipped() {
        let ext = Arc::new(RecordingExtension::with_stages(
            "validator",
            vec![ExtensionStage::ValidateInput],
        ));
        let registry = ExtensionRegistry::new().with(ext.clone());

        let mut ctx = OperationContext::new();
        registry
            .run_stage(ExtensionStage::HandleInput, &mut ctx)
            .await
            .unwrap();

        assert!(ext.calls().is_empty());
    }

    #[tokio::test]
    async fn failure_stops_the_stage() {
        let failing = Arc::new(
            RecordingExtension::new("failing").failing_at(ExtensionStage::HandleInput, "boom"),
        );
        let trailing = Arc::new(RecordingExtension::new("trailing"));
        let registry = ExtensionRegistry::new()
            .with(failing)
            .with(trailing.clone());

        let mut ctx = OperationContext::new();
        let err = registry
            .run_stage(ExtensionStage::HandleInput, &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(err.0, "failing");
        assert!(trailing.calls().is_empty());
    }
}

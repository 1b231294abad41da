//! Pipeline operations over client credentials.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{ClientCredential, ListResponse};
use crate::authz::{AuthorizationGate, Principal};
use crate::cancellation::CancellationToken;
use crate::config::SecretsConfig;
use crate::context::{OperationOutcome, RoleBinding, CREDENTIAL_ROLE};
use crate::digest::{CredentialDigestor, IssuedSecret};
use crate::errors::PipelineError;
use crate::extensions::{ExtensionRegistry, ExtensionStage};
use crate::pipeline::OperationPipeline;
use crate::store::ResourceStore;

/// The resource name operations authorize against.
pub const RESOURCE_NAME: &str = "ClientCredentials";

/// CRUD surface for client credentials, each operation an instance of
/// the extension pipeline.
pub struct ClientCredentials {
    pipeline: OperationPipeline,
    store: Arc<dyn ResourceStore<ClientCredential>>,
    digestor: CredentialDigestor,
}

impl ClientCredentials {
    /// Builds the service from its collaborators.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] when the secret parameters are
    /// malformed; no service is constructed in that case.
    pub fn new(
        gate: Arc<dyn AuthorizationGate>,
        store: Arc<dyn ResourceStore<ClientCredential>>,
        extensions: ExtensionRegistry,
        secrets: &SecretsConfig,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            pipeline: OperationPipeline::new(RESOURCE_NAME, gate, extensions),
            store,
            digestor: CredentialDigestor::new(secrets)?,
        })
    }

    /// Pages the collection.
    ///
    /// `start_index` is 1-based; negative or past-the-end windows clamp
    /// to an empty or truncated page instead of erroring. The envelope
    /// echoes the requested window and carries the total count.
    ///
    /// # Errors
    ///
    /// Gate, stage and serialization failures per the pipeline contract.
    pub async fn query(
        &self,
        principal: &Principal,
        start_index: i64,
        items_per_page: usize,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let mut ctx = self.pipeline.begin(principal, "query", cancel).await?;

        self.pipeline.stage(ExtensionStage::HandleInput, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::ValidateInput, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::DefineRoles, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::Bind, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::BeforeAction, &mut ctx).await?;

        if !ctx.is_default_action_skipped() {
            let records = self.store.list();
            let total_results = records.len();
            let skip = usize::try_from(start_index.saturating_sub(1)).unwrap_or(0);
            let resources: Vec<ClientCredential> = records
                .into_iter()
                .skip(skip)
                .take(items_per_page)
                .collect();

            let page = ListResponse {
                resources,
                start_index,
                items_per_page,
                total_results,
            };
            ctx.set_result(OperationOutcome::Payload(serde_json::to_string(&page)?));
        }

        let ctx = self.pipeline.finish(ctx).await?;
        expect_payload(ctx.into_result())
    }

    /// Returns the record with the given identifier, serialized.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ValidationFailed`] for a blank id,
    /// [`PipelineError::NotFound`] for an unknown one, plus the pipeline
    /// contract failures.
    pub async fn retrieve(
        &self,
        principal: &Principal,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let mut ctx = self.pipeline.begin(principal, "retrieve", cancel).await?;

        self.pipeline.stage(ExtensionStage::HandleInput, &mut ctx).await?;

        let credential = self.lookup(id)?;

        self.pipeline.stage(ExtensionStage::ValidateInput, &mut ctx).await?;

        ctx.roles
            .bind(CREDENTIAL_ROLE, RoleBinding::Credential(credential));
        self.pipeline.stage(ExtensionStage::DefineRoles, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::Bind, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::BeforeAction, &mut ctx).await?;

        if !ctx.is_default_action_skipped() {
            let payload = serde_json::to_string(
                ctx.roles
                    .credential(CREDENTIAL_ROLE)
                    .ok_or(PipelineError::ResultUnset)?,
            )?;
            ctx.set_result(OperationOutcome::Payload(payload));
        }

        let ctx = self.pipeline.finish(ctx).await?;
        expect_payload(ctx.into_result())
    }

    /// Creates a credential from a serialized payload and returns the
    /// new store identifier.
    ///
    /// The secret is issued and digested inside the default action; the
    /// plaintext never leaves it. On any digest failure nothing is
    /// persisted.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Serialization`] for an undecodable payload,
    /// [`PipelineError::Configuration`] for digest failures, plus the
    /// pipeline contract failures.
    pub async fn create(
        &self,
        principal: &Principal,
        json: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let mut ctx = self.pipeline.begin(principal, "create", cancel).await?;

        let credential: ClientCredential = serde_json::from_str(json)?;

        self.pipeline.stage(ExtensionStage::HandleInput, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::ValidateInput, &mut ctx).await?;

        ctx.roles
            .bind(CREDENTIAL_ROLE, RoleBinding::Credential(credential));
        self.pipeline.stage(ExtensionStage::DefineRoles, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::Bind, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::BeforeAction, &mut ctx).await?;

        if !ctx.is_default_action_skipped() {
            let mut credential = ctx
                .roles
                .take_credential(CREDENTIAL_ROLE)
                .ok_or(PipelineError::ResultUnset)?;

            let client_id = Uuid::new_v4().to_string();
            // The plaintext secret is dropped here; callers receive only
            // the identifier. See DESIGN.md.
            let IssuedSecret { digest, .. } = self.digestor.issue(&client_id)?;

            credential.client_id = client_id;
            credential.digest = Some(digest);
            credential.id = Uuid::new_v4().to_string();

            let id = credential.id.clone();
            ctx.roles
                .bind(CREDENTIAL_ROLE, RoleBinding::Credential(credential.clone()));
            self.store.add(credential);
            debug!(id = %id, "client credential created");

            ctx.set_result(OperationOutcome::Id(id));
        }

        let ctx = self.pipeline.finish(ctx).await?;
        expect_id(ctx.into_result())
    }

    /// Update is deliberately unsupported for this resource.
    ///
    /// # Errors
    ///
    /// Always [`PipelineError::NotImplemented`]; no stage runs.
    pub async fn update(
        &self,
        _principal: &Principal,
        _id: &str,
        _json: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        Err(PipelineError::NotImplemented("update"))
    }

    /// Patch is deliberately unsupported for this resource.
    ///
    /// # Errors
    ///
    /// Always [`PipelineError::NotImplemented`]; no stage runs.
    pub async fn patch(
        &self,
        _principal: &Principal,
        _id: &str,
        _json: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        Err(PipelineError::NotImplemented("patch"))
    }

    /// Removes the record with the given identifier.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NotFound`] before any stage mutates state when
    /// the id is unknown, plus the pipeline contract failures.
    pub async fn delete(
        &self,
        principal: &Principal,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, PipelineError> {
        let mut ctx = self.pipeline.begin(principal, "delete", cancel).await?;

        self.pipeline.stage(ExtensionStage::HandleInput, &mut ctx).await?;

        let credential = self.lookup(id)?;

        self.pipeline.stage(ExtensionStage::ValidateInput, &mut ctx).await?;

        ctx.roles
            .bind(CREDENTIAL_ROLE, RoleBinding::Credential(credential));
        self.pipeline.stage(ExtensionStage::DefineRoles, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::Bind, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::BeforeAction, &mut ctx).await?;

        if !ctx.is_default_action_skipped() {
            let removed = ctx
                .roles
                .credential(CREDENTIAL_ROLE)
                .is_some_and(|credential| self.store.remove(credential));
            debug!(id, removed, "client credential delete");
            ctx.set_result(OperationOutcome::Completed(removed));
        }

        let ctx = self.pipeline.finish(ctx).await?;
        expect_completed(ctx.into_result())
    }

    /// Looks up a record by the presented `(client_id, secret)` pair.
    ///
    /// A wrong secret, an unknown client and a malformed secret all
    /// collapse into `Ok(None)`: the caller cannot use this operation as
    /// a credential-enumeration oracle. All stages run either way.
    ///
    /// # Errors
    ///
    /// Only gate and stage failures; a failed lookup is not an error.
    pub async fn retrieve_by_credential(
        &self,
        principal: &Principal,
        client_id: &str,
        secret_b64: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, PipelineError> {
        let mut ctx = self.pipeline.begin(principal, "retrieve", cancel).await?;

        // Digest failures (bad base64, undersized salt) count as a miss.
        let presented = BASE64
            .decode(secret_b64)
            .ok()
            .and_then(|secret| self.digestor.digest(client_id, &secret).ok());
        let matched = presented.as_ref().and_then(|digest| {
            self.store.find(&|record: &ClientCredential| {
                record
                    .digest
                    .as_deref()
                    .is_some_and(|stored| CredentialDigestor::digests_match(digest, stored))
            })
        });

        self.pipeline.stage(ExtensionStage::HandleInput, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::ValidateInput, &mut ctx).await?;

        if let Some(credential) = matched {
            ctx.roles
                .bind(CREDENTIAL_ROLE, RoleBinding::Credential(credential));
        }
        self.pipeline.stage(ExtensionStage::DefineRoles, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::Bind, &mut ctx).await?;
        self.pipeline.stage(ExtensionStage::BeforeAction, &mut ctx).await?;

        if !ctx.is_default_action_skipped() {
            let payload = ctx
                .roles
                .credential(CREDENTIAL_ROLE)
                .map(serde_json::to_string)
                .transpose()?;
            if let Some(payload) = payload {
                ctx.set_result(OperationOutcome::Payload(payload));
            }
        }

        let ctx = self.pipeline.finish(ctx).await?;
        Ok(match ctx.into_result() {
            Some(OperationOutcome::Payload(payload)) => Some(payload),
            _ => None,
        })
    }

    fn lookup(&self, id: &str) -> Result<ClientCredential, PipelineError> {
        if id.trim().is_empty() {
            return Err(PipelineError::ValidationFailed(
                "id must not be blank".to_string(),
            ));
        }
        self.store
            .find_by_id(id)
            .ok_or_else(|| PipelineError::not_found("ClientCredential", id))
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

fn expect_payload(outcome: Option<OperationOutcome>) -> Result<String, PipelineError> {
    match outcome {
        Some(OperationOutcome::Payload(payload)) => Ok(payload),
        _ => Err(PipelineError::ResultUnset),
    }
}

fn expect_id(outcome: Option<OperationOutcome>) -> Result<String, PipelineError> {
    match outcome {
        Some(OperationOutcome::Id(id)) => Ok(id),
        _ => Err(PipelineError::ResultUnset),
    }
}

fn expect_completed(outcome: Option<OperationOutcome>) -> Result<bool, PipelineError> {
    match outcome {
        Some(OperationOutcome::Completed(done)) => Ok(done),
        _ => Err(PipelineError::ResultUnset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::testing::AllowAllGate;
    use pretty_assertions::assert_eq;

    fn service() -> (ClientCredentials, Arc<InMemoryStore<ClientCredential>>) {
        let store = Arc::new(InMemoryStore::new());
        let service = ClientCredentials::new(
            Arc::new(AllowAllGate),
            store.clone(),
            ExtensionRegistry::new(),
            &SecretsConfig::insecure_fast(),
        )
        .unwrap();
        (service, store)
    }

    fn principal() -> Principal {
        Principal::new("bob.rivest@email.com", "looplex")
    }

    #[tokio::test]
    async fn create_assigns_id_client_id_and_digest() {
        let (service, store) = service();

        let id = service
            .create(&principal(), r#"{"displayName": "ci"}"#, &CancellationToken::new())
            .await
            .unwrap();

        let record = store.find_by_id(&id).unwrap();
        assert!(!record.client_id.is_empty());
        assert!(record.digest.is_some());
        assert_eq!(record.display_name.as_deref(), Some("ci"));
    }

    #[tokio::test]
    async fn retrieve_round_trips_created_record() {
        let (service, _) = service();
        let cancel = CancellationToken::new();

        let id = service.create(&principal(), "{}", &cancel).await.unwrap();
        let payload = service.retrieve(&principal(), &id, &cancel).await.unwrap();

        let retrieved: ClientCredential = serde_json::from_str(&payload).unwrap();
        assert_eq!(retrieved.id, id);
        assert!(retrieved.digest.is_none(), "digest must not round-trip");
    }

    #[tokio::test]
    async fn retrieve_blank_id_is_validation_failure() {
        let (service, _) = service();
        let err = service
            .retrieve(&principal(), "  ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn retrieve_unknown_id_is_not_found() {
        let (service, _) = service();
        let err = service
            .retrieve(&principal(), "nope", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_and_patch_are_not_implemented() {
        let (service, _) = service();
        let cancel = CancellationToken::new();

        let err = service
            .update(&principal(), "id", "{}", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotImplemented("update")));

        let err = service
            .patch(&principal(), "id", "{}", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotImplemented("patch")));
    }

    #[tokio::test]
    async fn delete_removes_exactly_the_target() {
        let (service, store) = service();
        let cancel = CancellationToken::new();

        let first = service.create(&principal(), "{}", &cancel).await.unwrap();
        let second = service.create(&principal(), "{}", &cancel).await.unwrap();

        assert!(service.delete(&principal(), &first, &cancel).await.unwrap());
        assert!(store.find_by_id(&first).is_none());
        assert!(store.find_by_id(&second).is_some());
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found_and_mutates_nothing() {
        let (service, store) = service();
        let cancel = CancellationToken::new();
        service.create(&principal(), "{}", &cancel).await.unwrap();

        let err = service
            .delete(&principal(), "missing", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn query_pages_and_clamps() {
        let (service, _) = service();
        let cancel = CancellationToken::new();
        for _ in 0..3 {
            service.create(&principal(), "{}", &cancel).await.unwrap();
        }

        let page: ListResponse<ClientCredential> = serde_json::from_str(
            &service.query(&principal(), 2, 1, &cancel).await.unwrap(),
        )
        .unwrap();
        assert_eq!(page.resources.len(), 1);
        assert_eq!(page.total_results, 3);
        assert_eq!(page.start_index, 2);

        // Negative start clamps to the beginning.
        let page: ListResponse<ClientCredential> = serde_json::from_str(
            &service.query(&principal(), -5, 2, &cancel).await.unwrap(),
        )
        .unwrap();
        assert_eq!(page.resources.len(), 2);

        // Past-the-end start yields an empty page, not an error.
        let page: ListResponse<ClientCredential> = serde_json::from_str(
            &service.query(&principal(), 100, 2, &cancel).await.unwrap(),
        )
        .unwrap();
        assert!(page.resources.is_empty());
        assert_eq!(page.total_results, 3);
    }
}

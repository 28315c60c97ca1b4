//! Provider dispatcher: resolves a [`ProviderSelection`] to a concrete upstream and invokes unary
//! or streaming completion against it.

pub mod http_client;

use std::sync::Arc;

use bytes::Bytes;
use futures_util::Stream;

use gw_common::{GatewayError, GatewayResult, Principal};
use gw_protocol::openai::{ChatCompletionRequest, ChatCompletionResponse};
use gw_registry::ProviderRegistry;
use gw_storage::{ModelProviderRecord, Storage};

use crate::crypto::ProviderKeyCipher;
use http_client::UpstreamHttpClient;

/// Routing hints a completion request may carry. `model` is the only field that's always present;
/// the rest narrow provider selection.
#[derive(Debug, Clone, Default)]
pub struct ProviderSelection {
    pub provider_id: Option<String>,
    pub provider_type: Option<String>,
    pub vendor: Option<String>,
    pub org_id: Option<i64>,
    pub project_id: Option<i64>,
    pub project_ids: Vec<i64>,
    pub model: String,
}

pub struct ResolvedProvider {
    pub base_url: String,
    pub api_key: String,
}

pub struct Dispatcher {
    storage: Arc<dyn Storage>,
    registry: Arc<ProviderRegistry>,
    cipher: ProviderKeyCipher,
    client: UpstreamHttpClient,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<ProviderRegistry>,
        cipher: ProviderKeyCipher,
        client: UpstreamHttpClient,
    ) -> Self {
        Self {
            storage,
            registry,
            cipher,
            client,
        }
    }

    /// Resolution order: explicit `providerID`, else the registry's first-registered endpoint for
    /// `selection.model`, else `modelUnavailable`.
    pub async fn resolve(&self, selection: &ProviderSelection, principal: &Principal) -> GatewayResult<ResolvedProvider> {
        let provider = if let Some(provider_id) = &selection.provider_id {
            let provider = self
                .storage
                .get_model_provider_by_public_id(provider_id)
                .await
                .map_err(GatewayError::internal)?
                .ok_or_else(|| GatewayError::ModelUnavailable(selection.model.clone()))?;
            if !in_scope(&provider, principal) {
                return Err(GatewayError::Forbidden);
            }
            provider
        } else {
            let snapshot = self.registry.snapshot();
            let endpoint = snapshot
                .first_endpoint_for_model(&selection.model)
                .ok_or_else(|| GatewayError::ModelUnavailable(selection.model.clone()))?
                .to_string();
            let provider = self
                .storage
                .get_model_provider_by_public_id(&endpoint)
                .await
                .map_err(GatewayError::internal)?
                .ok_or_else(|| GatewayError::ModelUnavailable(selection.model.clone()))?;
            if !in_scope(&provider, principal) {
                return Err(GatewayError::ModelUnavailable(selection.model.clone()));
            }
            provider
        };

        if !provider.active {
            return Err(GatewayError::ModelUnavailable(selection.model.clone()));
        }

        let api_key = self.cipher.decrypt(&provider.encrypted_api_key)?;
        Ok(ResolvedProvider {
            base_url: provider.base_url,
            api_key,
        })
    }

    pub async fn create_completion(
        &self,
        resolved: &ResolvedProvider,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse> {
        self.client.complete(&resolved.base_url, &resolved.api_key, request).await
    }

    pub async fn create_completion_stream(
        &self,
        resolved: &ResolvedProvider,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<impl Stream<Item = Result<Bytes, GatewayError>> + Send + 'static> {
        self.client
            .stream_completion(&resolved.base_url, &resolved.api_key, request)
            .await
    }
}

/// A global provider (no `org_id`) is visible to everyone; a tenant-scoped one must match the
/// caller's org or one of their projects.
fn in_scope(provider: &ModelProviderRecord, principal: &Principal) -> bool {
    match (provider.org_id, provider.project_id) {
        (None, None) => true,
        (Some(org_id), None) => principal.org_id == Some(org_id),
        (_, Some(project_id)) => principal.has_project(project_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(org_id: Option<i64>, project_id: Option<i64>) -> ModelProviderRecord {
        ModelProviderRecord {
            id: 1,
            public_id: "prov_a".to_string(),
            org_id,
            project_id,
            name: "p".to_string(),
            vendor: "openrouter".to_string(),
            base_url: "https://example.test".to_string(),
            encrypted_api_key: String::new(),
            active: true,
        }
    }

    fn principal(org_id: Option<i64>, project_ids: Vec<i64>) -> Principal {
        Principal {
            user_id: 1,
            user_public_id: "user_a".to_string(),
            org_id,
            project_ids,
            role: None,
            owner_kind: None,
        }
    }

    #[test]
    fn global_provider_is_always_in_scope() {
        assert!(in_scope(&provider(None, None), &principal(None, vec![])));
    }

    #[test]
    fn org_scoped_provider_requires_matching_org() {
        assert!(in_scope(&provider(Some(5), None), &principal(Some(5), vec![])));
        assert!(!in_scope(&provider(Some(5), None), &principal(Some(6), vec![])));
    }

    #[test]
    fn project_scoped_provider_requires_membership() {
        assert!(in_scope(&provider(Some(5), Some(9)), &principal(Some(5), vec![9])));
        assert!(!in_scope(&provider(Some(5), Some(9)), &principal(Some(5), vec![10])));
    }
}

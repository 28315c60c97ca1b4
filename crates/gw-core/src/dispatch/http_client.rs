//! `wreq`-backed upstream client for unary and streaming completion calls, and for the
//! `/v1/models` discovery fetch the registry's background tick drives through
//! [`gw_registry::ModelSource`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use wreq::Client;

use gw_common::{GatewayError, GatewayResult};
use gw_protocol::openai::{ChatCompletionRequest, ChatCompletionResponse, ModelListResponse};
use gw_registry::{ModelDetail, ModelSource};

#[derive(Clone)]
pub struct UpstreamHttpClient {
    client: Client,
}

impl UpstreamHttpClient {
    pub fn new() -> Result<Self, wreq::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .read_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    pub async fn complete(
        &self,
        base_url: &str,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| GatewayError::ProviderUpstreamError(err.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::ProviderUpstreamError(format!("{status}: {body}")));
        }

        resp.json::<ChatCompletionResponse>()
            .await
            .map_err(|err| GatewayError::ProviderUpstreamError(err.to_string()))
    }

    /// Opens the streaming completion and returns the raw byte stream; the orchestrator owns all SSE
    /// framing decisions. On open failure the caller emits `providerUpstreamError` without writing a
    /// body, per contract.
    pub async fn stream_completion(
        &self,
        base_url: &str,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<impl Stream<Item = Result<Bytes, GatewayError>> + Send + 'static> {
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| GatewayError::ProviderUpstreamError(err.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::ProviderUpstreamError(format!("{status}: {body}")));
        }

        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|err| GatewayError::ProviderUpstreamError(err.to_string()))))
    }

    async fn list_models_at(&self, base_url: &str, api_key: Option<&str>) -> Result<Vec<ModelDetail>, anyhow::Error> {
        let url = format!("{}/models", base_url.trim_end_matches('/'));
        let mut builder = self.client.get(&url);
        if let Some(key) = api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?.error_for_status()?;
        let body: ModelListResponse = resp.json().await?;
        Ok(body
            .data
            .into_iter()
            .map(|m| ModelDetail {
                id: m.id,
                object: m.object,
                created: m.created,
                owned_by: m.owned_by,
            })
            .collect())
    }
}

/// Binds a configured upstream (service name, base URL, optional API key) to the registry's
/// transport-agnostic discovery seam.
pub struct UpstreamModelSource {
    pub name: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub client: UpstreamHttpClient,
}

#[async_trait]
impl ModelSource for UpstreamModelSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> Result<Vec<ModelDetail>, anyhow::Error> {
        self.client.list_models_at(&self.base_url, self.api_key.as_deref()).await
    }
}

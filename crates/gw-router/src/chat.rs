//! `POST /v1/chat/completions`: unary or streamed chat completion. Resolves a provider through
//! before a `Response` row is ever written, so `modelUnavailable` never shows a half-created
//! response and never reaches the upstream.

use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::sync::mpsc;

use gw_common::{GatewayError, Principal};
use gw_core::bootstrap::AppState;
use gw_core::dispatch::ProviderSelection;
use gw_core::orchestrator::{drive_stream, StreamTerminal};
use gw_core::scheduler::new_cancel_signal;
use gw_protocol::openai::ChatCompletionRequest;
use gw_storage::Storage;

use crate::error::{ApiError, ApiResult};
use crate::sse;

pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<ChatCompletionRequest>,
) -> ApiResult<Response> {
    if request.messages.is_empty() {
        return Err(GatewayError::InvalidRequest("messages must not be empty".to_string()).into());
    }

    let selection = ProviderSelection {
        provider_id: request.provider_id.clone(),
        model: request.model.clone(),
        org_id: principal.org_id,
        project_ids: principal.project_ids.clone(),
        ..Default::default()
    };

    // Resolve before touching storage: an unresolvable model must never
    // create a `Response` row or reach an upstream.
    let resolved = state.dispatcher.resolve(&selection, &principal).await?;

    let input = serde_json::to_value(&request.messages).map_err(GatewayError::internal)?;
    let params = serde_json::json!({ "stream": request.stream });
    let response_row = state
        .responses
        .create(principal.user_id, &request.model, input, params, None, None)
        .await?;
    state.responses.mark_processing(response_row.id).await?;

    if request.stream {
        let (tx, rx) = mpsc::channel::<Bytes>(32);
        let upstream = state.dispatcher.create_completion_stream(&resolved, &request).await;
        let upstream = match upstream {
            Ok(upstream) => upstream,
            Err(err) => {
                let _ = state.responses.fail(response_row.id, err.to_string()).await;
                return Err(err.into());
            }
        };

        let deadline = state.scheduler.default_deadline();
        let background_state = state.clone();
        let response_id = response_row.id;
        tokio::spawn(async move {
            let outcome = drive_stream(Box::pin(upstream), tx, deadline, new_cancel_signal()).await;
            let result = match outcome.terminal {
                StreamTerminal::Done => {
                    let output = serde_json::json!({ "content": outcome.accumulator.content() });
                    background_state.responses.complete(response_id, output, None).await
                }
                StreamTerminal::TimedOut => {
                    background_state
                        .responses
                        .fail(response_id, GatewayError::ProviderTimeout.to_string())
                        .await
                }
                StreamTerminal::Cancelled => background_state
                    .storage
                    .cancel_response(response_id)
                    .await
                    .map(|_| ())
                    .map_err(GatewayError::internal),
                StreamTerminal::UpstreamError => {
                    background_state
                        .responses
                        .fail(response_id, GatewayError::ProviderUpstreamError("stream read failed".to_string()).to_string())
                        .await
                }
            };
            if let Err(err) = result {
                tracing::warn!(error = %err, "failed to persist terminal response state");
            }
        });

        Ok(sse::streaming_response(rx))
    } else {
        let completion = state.dispatcher.create_completion(&resolved, &request).await;
        match completion {
            Ok(completion) => {
                let output = serde_json::to_value(&completion).map_err(GatewayError::internal)?;
                let usage = completion
                    .usage
                    .as_ref()
                    .map(serde_json::to_value)
                    .transpose()
                    .map_err(GatewayError::internal)?;
                state.responses.complete(response_row.id, output, usage).await?;
                Ok(Json(completion).into_response())
            }
            Err(err) => {
                let _ = state.responses.fail(response_row.id, err.to_string()).await;
                Err(ApiError::from(err))
            }
        }
    }
}

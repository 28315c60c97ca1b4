//! `/v1/responses*` handlers. Unlike `/v1/chat/completions`, a `Response` created here may carry a
//! `conversationID`, so a completed streamed or unary turn appends its assistant (and, if present,
//! function) item back onto that conversation per the orchestrator contract.

use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use bytes::Bytes;
use tokio::sync::mpsc;

use gw_common::{GatewayError, Principal};
use gw_core::bootstrap::AppState;
use gw_core::conversation::NewItemInput;
use gw_core::dispatch::ProviderSelection;
use gw_core::orchestrator::{CompletionAccumulator, StreamTerminal, drive_stream};
use gw_core::scheduler::new_cancel_signal;
use gw_protocol::conversations::ItemInput;
use gw_protocol::openai::{ChatCompletionRequest, ChatMessage};
use gw_protocol::responses::{CreateResponseRequest, InputItemListResponse, ResponseObject};

use crate::convert::{self, ListQuery};
use crate::error::ApiResult;
use crate::sse;

pub async fn create_response(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateResponseRequest>,
) -> ApiResult<axum::response::Response> {
    if request.input.is_empty() {
        return Err(GatewayError::InvalidRequest("input must not be empty".to_string()).into());
    }

    let conversation = match &request.conversation_id {
        Some(public_id) => Some(state.conversations.get(public_id, principal.user_id).await?),
        None => None,
    };
    let previous_response = match &request.previous_response_id {
        Some(public_id) => Some(state.responses.get(public_id, principal.user_id).await?),
        None => None,
    };

    let chat_request = to_chat_request(&request);
    let selection = ProviderSelection {
        model: request.model.clone(),
        org_id: principal.org_id,
        project_ids: principal.project_ids.clone(),
        ..Default::default()
    };
    let resolved = state.dispatcher.resolve(&selection, &principal).await?;

    let input_json = serde_json::to_value(&request.input).map_err(GatewayError::internal)?;
    let params = serde_json::json!({
        "background": request.background,
        "stream": request.stream,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "top_p": request.top_p,
    });
    let response_row = state
        .responses
        .create(
            principal.user_id,
            &request.model,
            input_json,
            params,
            conversation.as_ref().map(|c| c.id),
            previous_response.as_ref().map(|r| r.id),
        )
        .await?;
    state.responses.mark_processing(response_row.id).await?;

    let conversation_public_id = conversation.as_ref().map(|c| c.public_id.clone());
    let previous_response_public_id = previous_response.as_ref().map(|r| r.public_id.clone());

    if request.background {
        let response_id = response_row.id;
        let conv_public_id = conversation.as_ref().map(|c| c.public_id.clone());
        let fut = run_completion(state.clone(), resolved, chat_request, response_id, conv_public_id);
        state.scheduler.spawn_background(fut);
        return Ok(
            Json(convert::response_to_object(&response_row, conversation_public_id, previous_response_public_id)?)
                .into_response_with_status(),
        );
    }

    if request.stream {
        let (tx, rx) = mpsc::channel::<Bytes>(32);
        let upstream = state.dispatcher.create_completion_stream(&resolved, &chat_request).await;
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
            finish_response(&background_state, response_id, conversation_public_id, outcome.terminal, outcome.accumulator).await;
        });

        return Ok(sse::streaming_response(rx));
    }

    let completion = state.dispatcher.create_completion(&resolved, &chat_request).await;
    match completion {
        Ok(completion) => {
            let content = completion
                .choices
                .first()
                .and_then(|choice| choice.message.content_as_text())
                .unwrap_or_default();
            persist_assistant_item(&state, &conversation_public_id, response_row.id, &content, None).await;

            let output = serde_json::json!({ "content": content });
            let usage = completion
                .usage
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(GatewayError::internal)?;
            state.responses.complete(response_row.id, output, usage).await?;
            let updated = state.responses.get(&response_row.public_id, principal.user_id).await?;
            Ok(
                Json(convert::response_to_object(&updated, conversation_public_id, previous_response_public_id)?)
                    .into_response_with_status(),
            )
        }
        Err(err) => {
            let _ = state.responses.fail(response_row.id, err.to_string()).await;
            Err(err.into())
        }
    }
}

pub async fn get_response(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResponseObject>> {
    let response = state.responses.get(&id, principal.user_id).await?;
    let conversation_public_id = conversation_public_id_of(&state, response.conversation_id).await?;
    let previous_response_public_id = previous_response_public_id_of(&state, response.previous_response_id).await?;
    Ok(Json(convert::response_to_object(&response, conversation_public_id, previous_response_public_id)?))
}

pub async fn cancel_response(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResponseObject>> {
    let response = state.responses.cancel(&id, principal.user_id).await?;
    let conversation_public_id = conversation_public_id_of(&state, response.conversation_id).await?;
    let previous_response_public_id = previous_response_public_id_of(&state, response.previous_response_id).await?;
    Ok(Json(convert::response_to_object(&response, conversation_public_id, previous_response_public_id)?))
}

async fn conversation_public_id_of(state: &Arc<AppState>, conversation_id: Option<i64>) -> Result<Option<String>, GatewayError> {
    use gw_storage::Storage;
    let Some(conversation_id) = conversation_id else {
        return Ok(None);
    };
    let conversation = state.storage.get_conversation_by_id(conversation_id).await.map_err(GatewayError::internal)?;
    Ok(conversation.map(|c| c.public_id))
}

async fn previous_response_public_id_of(state: &Arc<AppState>, previous_response_id: Option<i64>) -> Result<Option<String>, GatewayError> {
    use gw_storage::Storage;
    let Some(previous_response_id) = previous_response_id else {
        return Ok(None);
    };
    let response = state.storage.get_response_by_id(previous_response_id).await.map_err(GatewayError::internal)?;
    Ok(response.map(|r| r.public_id))
}

pub async fn list_input_items(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<InputItemListResponse>> {
    let (after_id, _descending, order) = convert::resolve_list_params(&query);
    let limit = gw_protocol::pagination::clamp_limit(query.limit);
    let page = state.responses.list_input_items(&id, principal.user_id, after_id, limit).await?;

    let next_cursor = convert::next_cursor(&page, order);
    let data = page
        .items
        .iter()
        .map(|item| convert::item_to_object(item, &id))
        .collect::<Result<Vec<_>, GatewayError>>()?;

    Ok(Json(InputItemListResponse {
        object: "list".to_string(),
        data,
        has_more: page.has_more,
        next_cursor,
    }))
}

fn to_chat_request(request: &CreateResponseRequest) -> ChatCompletionRequest {
    let messages = request
        .input
        .iter()
        .map(item_input_to_message)
        .collect();
    ChatCompletionRequest {
        model: request.model.clone(),
        messages,
        stream: request.stream,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_tokens,
        tools: None,
        tool_choice: None,
        provider_id: None,
        extra: serde_json::Map::new(),
    }
}

fn item_input_to_message(item: &ItemInput) -> ChatMessage {
    let role = convert::item_role_str(item.role).unwrap_or("user").to_string();
    let text: String = item
        .content
        .iter()
        .filter_map(|content| match content {
            gw_protocol::conversations::Content::Text { text } => Some(text.clone()),
            gw_protocol::conversations::Content::InputText { text } => Some(text.clone()),
            gw_protocol::conversations::Content::OutputText { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("");

    ChatMessage {
        role,
        content: Some(serde_json::Value::String(text)),
        name: None,
        tool_calls: None,
        extra: serde_json::Map::new(),
    }
}

async fn run_completion(
    state: Arc<AppState>,
    resolved: gw_core::dispatch::ResolvedProvider,
    request: ChatCompletionRequest,
    response_id: i64,
    conversation_public_id: Option<String>,
) {
    if request.stream {
        // Background responses have no client waiting on the SSE frames
        // themselves, only on the accumulated result, so the tee side of
        // `drive_stream` is drained into nothing rather than left to fill
        // the bounded channel and stall the sender.
        let (tx, mut rx) = mpsc::channel::<Bytes>(32);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let upstream = state.dispatcher.create_completion_stream(&resolved, &request).await;
        match upstream {
            Ok(upstream) => {
                let deadline = state.scheduler.default_deadline();
                let outcome = drive_stream(Box::pin(upstream), tx, deadline, new_cancel_signal()).await;
                finish_response(&state, response_id, conversation_public_id, outcome.terminal, outcome.accumulator).await;
            }
            Err(err) => {
                let _ = state.responses.fail(response_id, err.to_string()).await;
            }
        }
        return;
    }

    match state.dispatcher.create_completion(&resolved, &request).await {
        Ok(completion) => {
            let content = completion
                .choices
                .first()
                .and_then(|choice| choice.message.content_as_text())
                .unwrap_or_default();
            persist_assistant_item(&state, &conversation_public_id, response_id, &content, None).await;
            let output = serde_json::json!({ "content": content });
            let usage = completion.usage.as_ref().and_then(|u| serde_json::to_value(u).ok());
            let _ = state.responses.complete(response_id, output, usage).await;
        }
        Err(err) => {
            let _ = state.responses.fail(response_id, err.to_string()).await;
        }
    }
}

async fn finish_response(
    state: &Arc<AppState>,
    response_id: i64,
    conversation_public_id: Option<String>,
    terminal: StreamTerminal,
    accumulator: CompletionAccumulator,
) {
    let tool_call = accumulator.completed_tool_call();
    if !accumulator.content().is_empty() || tool_call.is_some() {
        persist_assistant_item(state, &conversation_public_id, response_id, accumulator.content(), tool_call.clone()).await;
    }

    let result = match terminal {
        StreamTerminal::Done => {
            let output = serde_json::json!({ "content": accumulator.content() });
            state.responses.complete(response_id, output, None).await
        }
        StreamTerminal::TimedOut => state.responses.fail(response_id, GatewayError::ProviderTimeout.to_string()).await,
        StreamTerminal::Cancelled => {
            use gw_storage::Storage;
            state.storage.cancel_response(response_id).await.map(|_| ()).map_err(GatewayError::internal)
        }
        StreamTerminal::UpstreamError => {
            state
                .responses
                .fail(response_id, GatewayError::ProviderUpstreamError("stream read failed".to_string()).to_string())
                .await
        }
    };
    if let Err(err) = result {
        tracing::warn!(error = %err, "failed to persist terminal response state");
    }
}

/// Best-effort per "Persistence of the assistant item is best-effort; if it fails, the completion
/// itself is still a success to the client."
async fn persist_assistant_item(
    state: &Arc<AppState>,
    conversation_public_id: &Option<String>,
    response_id: i64,
    content: &str,
    tool_call: Option<(String, String)>,
) {
    let Some(conversation_public_id) = conversation_public_id else {
        return;
    };

    // `add_item` re-authorizes against the owning user; a background task
    // racing a conversation delete is expected to fail this, silently.
    let Ok(conversation) = state.storage.get_conversation_by_public_id(conversation_public_id).await else {
        return;
    };
    let Some(conversation) = conversation else { return };

    if !content.is_empty() {
        let _ = state
            .conversations
            .add_item(
                conversation_public_id,
                conversation.user_id,
                "message",
                Some("assistant"),
                serde_json::json!([{ "type": "output_text", "text": content, "annotations": [] }]),
                Some(response_id),
            )
            .await;
    }

    if let Some((name, arguments)) = tool_call {
        let _ = state
            .conversations
            .add_item(
                conversation_public_id,
                conversation.user_id,
                "function",
                None,
                serde_json::json!({ "name": name, "arguments": arguments }),
                Some(response_id),
            )
            .await;
    }
}

trait IntoResponseWithStatus {
    fn into_response_with_status(self) -> axum::response::Response;
}

impl IntoResponseWithStatus for Json<ResponseObject> {
    fn into_response_with_status(self) -> axum::response::Response {
        use axum::response::IntoResponse;
        (axum::http::StatusCode::CREATED, self).into_response()
    }
}

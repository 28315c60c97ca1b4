//! `/v1/conversations*` handlers.

use std::sync::Arc;

use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};

use gw_common::{GatewayError, Principal};
use gw_core::bootstrap::AppState;
use gw_core::conversation::NewItemInput;
use gw_protocol::conversations::{
    AddItemsRequest, ConversationObject, CreateConversationRequest, ItemListResponse, ItemObject, UpdateConversationRequest,
    MAX_ITEMS_PER_BATCH,
};

use crate::convert::{self, ListQuery};
use crate::error::ApiResult;

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateConversationRequest>,
) -> ApiResult<Json<ConversationObject>> {
    let conversation = state
        .conversations
        .create(principal.user_id, request.metadata, request.is_private)
        .await?;

    if !request.items.is_empty() {
        let items = request
            .items
            .into_iter()
            .map(|item| {
                Ok(NewItemInput {
                    item_type: convert::item_type_str(item.item_type).to_string(),
                    role: convert::item_role_str(item.role).map(str::to_string),
                    content: convert::content_to_json(&item.content)?,
                    response_id: None,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;
        state
            .conversations
            .add_multiple_items(&conversation.public_id, principal.user_id, items)
            .await?;
    }

    Ok(Json(convert::conversation_to_object(&conversation)))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationObject>> {
    let conversation = state.conversations.get(&id, principal.user_id).await?;
    Ok(Json(convert::conversation_to_object(&conversation)))
}

pub async fn update_conversation(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateConversationRequest>,
) -> ApiResult<Json<ConversationObject>> {
    let conversation = state
        .conversations
        .update_metadata(&id, principal.user_id, request.title, request.metadata.unwrap_or_default())
        .await?;
    Ok(Json(convert::conversation_to_object(&conversation)))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.conversations.delete(&id, principal.user_id).await?;
    Ok(Json(serde_json::json!({ "id": id, "object": "conversation", "deleted": true })))
}

pub async fn add_items(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<AddItemsRequest>,
) -> ApiResult<Json<ItemListResponse>> {
    if request.items.len() > MAX_ITEMS_PER_BATCH {
        return Err(GatewayError::InvalidRequest(format!(
            "at most {MAX_ITEMS_PER_BATCH} items may be added per call"
        ))
        .into());
    }

    let items = request
        .items
        .into_iter()
        .map(|item| {
            Ok(NewItemInput {
                item_type: convert::item_type_str(item.item_type).to_string(),
                role: convert::item_role_str(item.role).map(str::to_string),
                content: convert::content_to_json(&item.content)?,
                response_id: None,
            })
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;

    let inserted = state.conversations.add_multiple_items(&id, principal.user_id, items).await?;
    let data = inserted
        .iter()
        .map(|item| convert::item_to_object(item, &id))
        .collect::<Result<Vec<_>, GatewayError>>()?;

    Ok(Json(ItemListResponse {
        object: "list".to_string(),
        data,
        has_more: false,
        next_cursor: None,
    }))
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ItemListResponse>> {
    let (after_id, descending, order) = convert::resolve_list_params(&query);
    let limit = gw_protocol::pagination::clamp_limit(query.limit);
    let page = state
        .conversations
        .list_items(&id, principal.user_id, after_id, limit, descending)
        .await?;

    let next_cursor = convert::next_cursor(&page, order);
    let data = page
        .items
        .iter()
        .map(|item| convert::item_to_object(item, &id))
        .collect::<Result<Vec<_>, GatewayError>>()?;

    Ok(Json(ItemListResponse {
        object: "list".to_string(),
        data,
        has_more: page.has_more,
        next_cursor,
    }))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<ItemObject>> {
    let item = state.conversations.get_item(&id, &item_id, principal.user_id).await?;
    Ok(Json(convert::item_to_object(&item, &id)?))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<ConversationObject>> {
    let conversation = state.conversations.delete_item(&id, &item_id, principal.user_id).await?;
    Ok(Json(convert::conversation_to_object(&conversation)))
}

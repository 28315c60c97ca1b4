//! Wire/storage conversions shared by the conversation and response handlers: record -> wire
//! object, and cursor-query resolution.

use gw_common::{GatewayError, GatewayResult};
use gw_protocol::conversations::{Content, ConversationObject, ItemObject, ItemRole, ItemType};
use gw_protocol::pagination::{SortOrder, decode_cursor, encode_cursor};
use gw_protocol::responses::{ResponseObject, ResponseStatus};
use gw_storage::{ConversationRecord, ItemPage, ItemRecord, ResponseRecord};
use serde::Deserialize;

pub fn item_type_str(kind: ItemType) -> &'static str {
    match kind {
        ItemType::Message => "message",
        ItemType::Function => "function",
        ItemType::ToolResult => "tool_result",
    }
}

pub fn item_type_from_str(s: &str) -> GatewayResult<ItemType> {
    match s {
        "message" => Ok(ItemType::Message),
        "function" => Ok(ItemType::Function),
        "tool_result" => Ok(ItemType::ToolResult),
        other => Err(GatewayError::internal(anyhow::anyhow!("unknown item type {other}"))),
    }
}

pub fn item_role_str(role: Option<ItemRole>) -> Option<&'static str> {
    role.map(|role| match role {
        ItemRole::System => "system",
        ItemRole::User => "user",
        ItemRole::Assistant => "assistant",
    })
}

pub fn item_role_from_str(s: &str) -> GatewayResult<ItemRole> {
    match s {
        "system" => Ok(ItemRole::System),
        "user" => Ok(ItemRole::User),
        "assistant" => Ok(ItemRole::Assistant),
        other => Err(GatewayError::internal(anyhow::anyhow!("unknown item role {other}"))),
    }
}

pub fn content_to_json(content: &[Content]) -> GatewayResult<serde_json::Value> {
    serde_json::to_value(content).map_err(GatewayError::internal)
}

fn json_to_content(value: &serde_json::Value) -> GatewayResult<Vec<Content>> {
    serde_json::from_value(value.clone()).map_err(GatewayError::internal)
}

pub fn conversation_to_object(record: &ConversationRecord) -> ConversationObject {
    ConversationObject {
        id: record.public_id.clone(),
        object: "conversation".to_string(),
        title: record.title.clone(),
        status: record.status.clone(),
        metadata: record.metadata.clone(),
        is_private: record.is_private,
        created_at: record.created_at,
    }
}

pub fn item_to_object(record: &ItemRecord, conversation_public_id: &str) -> GatewayResult<ItemObject> {
    Ok(ItemObject {
        id: record.public_id.clone(),
        object: "item".to_string(),
        conversation_id: conversation_public_id.to_string(),
        item_type: item_type_from_str(&record.item_type)?,
        role: record.role.as_deref().map(item_role_from_str).transpose()?,
        content: json_to_content(&record.content)?,
        status: record.status.clone(),
        created_at: record.created_at,
    })
}

pub fn response_to_object(
    record: &ResponseRecord,
    conversation_public_id: Option<String>,
    previous_response_public_id: Option<String>,
) -> GatewayResult<ResponseObject> {
    let status = match record.status.as_str() {
        "pending" => ResponseStatus::Pending,
        "processing" => ResponseStatus::Processing,
        "completed" => ResponseStatus::Completed,
        "failed" => ResponseStatus::Failed,
        "cancelled" => ResponseStatus::Cancelled,
        other => return Err(GatewayError::internal(anyhow::anyhow!("unknown response status {other}"))),
    };
    let usage = record
        .usage
        .as_ref()
        .map(|u| serde_json::from_value(u.clone()))
        .transpose()
        .map_err(GatewayError::internal)?;

    Ok(ResponseObject {
        id: record.public_id.clone(),
        object: "response".to_string(),
        model: record.model.clone(),
        status,
        conversation_id: conversation_public_id,
        previous_response_id: previous_response_public_id,
        output: record.output.clone(),
        usage,
        error: record.error.clone(),
        created_at: record.created_at,
        completed_at: record.completed_at,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub after: Option<String>,
    pub limit: Option<u64>,
    pub order: Option<String>,
}

/// Resolves `(after_id, descending, order)` from a list query: a cursor already carries the order
/// it was issued under, so a client cannot silently flip direction mid-pagination; `order` only
/// picks the starting direction for the first page.
pub fn resolve_list_params(query: &ListQuery) -> (Option<i64>, bool, SortOrder) {
    if let Some(cursor) = query.after.as_deref() {
        if let Some((id, order)) = decode_cursor(cursor) {
            return (Some(id), order == SortOrder::Desc, order);
        }
    }
    let order = match query.order.as_deref() {
        Some("desc") => SortOrder::Desc,
        _ => SortOrder::Asc,
    };
    (None, order == SortOrder::Desc, order)
}

pub fn next_cursor(page: &ItemPage, order: SortOrder) -> Option<String> {
    if !page.has_more {
        return None;
    }
    page.items.last().map(|item| encode_cursor(item.id, order))
}

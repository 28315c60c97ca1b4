use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use time::OffsetDateTime;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("db error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub public_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub public_id: String,
    pub email: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct OrganizationRecord {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub owner_user_id: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct MembershipRecord {
    pub org_id: i64,
    pub user_id: i64,
    pub role: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub id: i64,
    pub public_id: String,
    pub org_id: i64,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct ProjectMembershipRecord {
    pub project_id: i64,
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub public_id: String,
    pub key_hash: String,
    pub plaintext_hint: String,
    pub description: Option<String>,
    pub owner_kind: String,
    pub owner_user_id: Option<i64>,
    pub org_id: Option<i64>,
    pub permissions: JsonValue,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub id: i64,
    pub public_id: String,
    pub owner_kind: String,
    pub owner_user_id: Option<i64>,
    pub org_id: Option<i64>,
    pub enabled: bool,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewModelProvider {
    pub public_id: String,
    pub org_id: Option<i64>,
    pub project_id: Option<i64>,
    pub name: String,
    pub provider_type: String,
    pub vendor: String,
    pub base_url: String,
    pub encrypted_api_key: String,
    pub api_key_hint: String,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone)]
pub struct ModelProviderRecord {
    pub id: i64,
    pub public_id: String,
    pub org_id: Option<i64>,
    pub project_id: Option<i64>,
    pub name: String,
    pub vendor: String,
    pub base_url: String,
    pub encrypted_api_key: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub public_id: String,
    pub user_id: i64,
    pub metadata: HashMap<String, String>,
    pub is_private: bool,
}

#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub id: i64,
    pub public_id: String,
    pub user_id: i64,
    pub title: Option<String>,
    pub status: String,
    pub metadata: HashMap<String, String>,
    pub is_private: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub public_id: String,
    pub item_type: String,
    pub role: Option<String>,
    pub content: JsonValue,
    pub response_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub id: i64,
    pub public_id: String,
    pub conversation_id: i64,
    pub response_id: Option<i64>,
    pub item_type: String,
    pub role: Option<String>,
    pub content: JsonValue,
    pub status: Option<String>,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<ItemRecord>,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct NewResponse {
    pub public_id: String,
    pub user_id: i64,
    pub conversation_id: Option<i64>,
    pub previous_response_id: Option<i64>,
    pub model: String,
    pub input: JsonValue,
    pub params: JsonValue,
}

#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub id: i64,
    pub public_id: String,
    pub user_id: i64,
    pub conversation_id: Option<i64>,
    pub previous_response_id: Option<i64>,
    pub model: String,
    pub status: String,
    pub input: JsonValue,
    pub output: Option<JsonValue>,
    pub usage: Option<JsonValue>,
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub failed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct GlobalConfigRecord {
    pub config: JsonValue,
    pub updated_at: OffsetDateTime,
}

/// `ListInputItems`: the original input messages are never written back into the conversation's
/// item table (only the assistant/function output is), so this decodes the paginated view straight
/// out of the `Response.input` JSON the request was created with rather than querying `items`.
/// Shared by every `Storage` impl so the pagination semantics (cursor, `has_more`) stay identical.
pub fn input_items_page(response: &ResponseRecord, after_id: Option<i64>, limit: u64) -> ItemPage {
    let elements: &[JsonValue] = match &response.input {
        JsonValue::Array(items) => items,
        _ => &[],
    };

    let mut rows: Vec<ItemRecord> = elements
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let id = (idx + 1) as i64;
            let item_type = value
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("message")
                .to_string();
            let role = value.get("role").and_then(|v| v.as_str()).map(str::to_string);
            let content = value.get("content").cloned().unwrap_or_else(|| JsonValue::Array(Vec::new()));
            ItemRecord {
                id,
                public_id: format!("msg_{}_{}", response.public_id.trim_start_matches("resp_"), id),
                conversation_id: response.conversation_id.unwrap_or(0),
                response_id: Some(response.id),
                item_type,
                role,
                content,
                status: None,
                completed_at: None,
                created_at: response.created_at,
            }
        })
        .filter(|item| after_id.is_none_or(|after| item.id > after))
        .collect();

    rows.sort_by_key(|item| item.id);
    let has_more = rows.len() as u64 > limit;
    rows.truncate(limit as usize);
    ItemPage { items: rows, has_more }
}

/// Repository seam. Implementations may use any persistence technology; the wire format and tenant
/// checks are the contract, not the SQL underneath. Runtime model-routing and tenant-membership
/// reads go through in-memory snapshots; this trait is the write path plus the cold-load path
/// that populates those snapshots at boot and after admin mutations.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn sync(&self) -> StorageResult<()>;

    // --- Boot configuration -----------------------------------
    async fn load_global_config(&self) -> StorageResult<Option<GlobalConfigRecord>>;
    async fn upsert_global_config(&self, config: &JsonValue) -> StorageResult<()>;

    // --- Users & tenant graph -----------------------------------
    async fn create_user(&self, new_user: NewUser) -> StorageResult<UserRecord>;
    async fn get_user_by_public_id(&self, public_id: &str) -> StorageResult<Option<UserRecord>>;
    async fn get_user(&self, id: i64) -> StorageResult<Option<UserRecord>>;
    async fn find_org_by_owner(&self, user_id: i64) -> StorageResult<Option<OrganizationRecord>>;
    async fn find_membership(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> StorageResult<Option<MembershipRecord>>;
    async fn list_projects_for_user(&self, user_id: i64) -> StorageResult<Vec<ProjectRecord>>;
    async fn load_tenant_snapshot(&self) -> StorageResult<crate::snapshot::TenantSnapshot>;

    // --- API keys -------------------------------------------------
    async fn insert_api_key(&self, new_key: NewApiKey) -> StorageResult<ApiKeyRecord>;
    async fn find_api_key_by_hash(&self, key_hash: &str) -> StorageResult<Option<ApiKeyRecord>>;

    // --- Model providers ---------------------------------------
    async fn upsert_model_provider(
        &self,
        provider: NewModelProvider,
    ) -> StorageResult<ModelProviderRecord>;
    async fn get_model_provider_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ModelProviderRecord>>;
    async fn list_active_model_providers(&self) -> StorageResult<Vec<ModelProviderRecord>>;

    // --- Conversations & items -------------------------------------
    async fn create_conversation(
        &self,
        new_conversation: NewConversation,
    ) -> StorageResult<ConversationRecord>;
    async fn get_conversation_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ConversationRecord>>;
    async fn get_conversation_by_id(&self, conversation_id: i64) -> StorageResult<Option<ConversationRecord>>;
    async fn update_conversation_metadata(
        &self,
        conversation_id: i64,
        title: Option<String>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<ConversationRecord>;
    async fn delete_conversation(&self, conversation_id: i64) -> StorageResult<()>;
    async fn add_item(&self, conversation_id: i64, item: NewItem) -> StorageResult<ItemRecord>;
    async fn add_multiple_items(
        &self,
        conversation_id: i64,
        items: Vec<NewItem>,
    ) -> StorageResult<Vec<ItemRecord>>;
    async fn delete_item_by_public_id(
        &self,
        conversation_id: i64,
        item_public_id: &str,
    ) -> StorageResult<()>;
    async fn get_item_by_public_id(
        &self,
        conversation_id: i64,
        item_public_id: &str,
    ) -> StorageResult<Option<ItemRecord>>;
    async fn list_items(
        &self,
        conversation_id: i64,
        after_id: Option<i64>,
        limit: u64,
        descending: bool,
    ) -> StorageResult<ItemPage>;

    // --- Responses --------------------------------------------------
    async fn create_response(&self, new_response: NewResponse) -> StorageResult<ResponseRecord>;
    async fn get_response_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ResponseRecord>>;
    async fn get_response_by_id(&self, response_id: i64) -> StorageResult<Option<ResponseRecord>>;
    async fn mark_response_processing(&self, response_id: i64) -> StorageResult<()>;
    async fn complete_response(
        &self,
        response_id: i64,
        output: JsonValue,
        usage: Option<JsonValue>,
    ) -> StorageResult<()>;
    async fn fail_response(&self, response_id: i64, error: String) -> StorageResult<()>;
    async fn cancel_response(&self, response_id: i64) -> StorageResult<bool>;
    async fn list_response_input_items(
        &self,
        response_id: i64,
        after_id: Option<i64>,
        limit: u64,
    ) -> StorageResult<ItemPage>;
}

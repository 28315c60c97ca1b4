//! Conversation store: append-mostly conversation/item service with per-user isolation, batched
//! item insertion, and cursor pagination. Thin over [`gw_storage::Storage`] — the authorization
//! check (`conversation.user_id == caller`) lives here rather than in the repository, matching
//! convention of keeping tenant checks in the service layer and leaving the repository
//! tenant-agnostic.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use gw_common::{GatewayError, GatewayResult, IdKind, ids};
use gw_storage::{ConversationRecord, ItemPage, ItemRecord, NewConversation, NewItem, Storage};

/// "Batch append items (cap 20 per call)"; S6.
pub const MAX_ITEMS_PER_BATCH: usize = 20;

pub struct ConversationStore {
    storage: Arc<dyn Storage>,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn create(
        &self,
        user_id: i64,
        metadata: HashMap<String, String>,
        is_private: bool,
    ) -> GatewayResult<ConversationRecord> {
        self.storage
            .create_conversation(NewConversation {
                public_id: ids::generate(IdKind::Conversation),
                user_id,
                metadata,
                is_private,
            })
            .await
            .map_err(GatewayError::internal)
    }

    /// `GetByPublicID`: returns only if the conversation belongs to `user_id`; cross-tenant reads fail
    /// with `PrivateConversation`, not `NotFound`.
    pub async fn get(&self, public_id: &str, user_id: i64) -> GatewayResult<ConversationRecord> {
        let conversation = self
            .storage
            .get_conversation_by_public_id(public_id)
            .await
            .map_err(GatewayError::internal)?
            .ok_or(GatewayError::NotFound)?;
        self.authorize(&conversation, user_id)?;
        Ok(conversation)
    }

    fn authorize(&self, conversation: &ConversationRecord, user_id: i64) -> GatewayResult<()> {
        if conversation.user_id != user_id {
            return Err(GatewayError::PrivateConversation);
        }
        Ok(())
    }

    pub async fn update_metadata(
        &self,
        public_id: &str,
        user_id: i64,
        title: Option<String>,
        metadata: HashMap<String, String>,
    ) -> GatewayResult<ConversationRecord> {
        let conversation = self.get(public_id, user_id).await?;
        self.storage
            .update_conversation_metadata(conversation.id, title, metadata)
            .await
            .map_err(GatewayError::internal)
    }

    pub async fn delete(&self, public_id: &str, user_id: i64) -> GatewayResult<()> {
        let conversation = self.get(public_id, user_id).await?;
        self.storage
            .delete_conversation(conversation.id)
            .await
            .map_err(GatewayError::internal)
    }

    pub async fn add_item(
        &self,
        public_id: &str,
        user_id: i64,
        item_type: &str,
        role: Option<&str>,
        content: JsonValue,
        response_id: Option<i64>,
    ) -> GatewayResult<ItemRecord> {
        let conversation = self.get(public_id, user_id).await?;
        self.storage
            .add_item(
                conversation.id,
                NewItem {
                    public_id: ids::generate(IdKind::Item),
                    item_type: item_type.to_string(),
                    role: role.map(str::to_string),
                    content,
                    response_id,
                },
            )
            .await
            .map_err(GatewayError::internal)
    }

    /// `AddMultipleItems`: all-or-nothing batch append, cap 20, persisted in the given array order.
    pub async fn add_multiple_items(
        &self,
        public_id: &str,
        user_id: i64,
        items: Vec<NewItemInput>,
    ) -> GatewayResult<Vec<ItemRecord>> {
        if items.is_empty() {
            return Err(GatewayError::InvalidRequest("items must not be empty".to_string()));
        }
        if items.len() > MAX_ITEMS_PER_BATCH {
            return Err(GatewayError::InvalidRequest(format!(
                "at most {MAX_ITEMS_PER_BATCH} items may be added per call"
            )));
        }

        let conversation = self.get(public_id, user_id).await?;
        let new_items = items
            .into_iter()
            .map(|item| NewItem {
                public_id: ids::generate(IdKind::Item),
                item_type: item.item_type,
                role: item.role,
                content: item.content,
                response_id: item.response_id,
            })
            .collect();

        self.storage
            .add_multiple_items(conversation.id, new_items)
            .await
            .map_err(GatewayError::internal)
    }

    pub async fn get_item(&self, conv_public_id: &str, item_public_id: &str, user_id: i64) -> GatewayResult<ItemRecord> {
        let conversation = self.get(conv_public_id, user_id).await?;
        self.storage
            .get_item_by_public_id(conversation.id, item_public_id)
            .await
            .map_err(GatewayError::internal)?
            .ok_or(GatewayError::NotFound)
    }

    pub async fn delete_item(&self, conv_public_id: &str, item_public_id: &str, user_id: i64) -> GatewayResult<ConversationRecord> {
        let conversation = self.get(conv_public_id, user_id).await?;
        self.storage
            .delete_item_by_public_id(conversation.id, item_public_id)
            .await
            .map_err(GatewayError::internal)?;
        self.get(conv_public_id, user_id).await.map(|_| conversation)
    }

    /// `List`: cursor-paginated items, `limit` already clamped by the caller via
    /// [`gw_protocol::pagination::clamp_limit`].
    pub async fn list_items(
        &self,
        public_id: &str,
        user_id: i64,
        after_id: Option<i64>,
        limit: u64,
        descending: bool,
    ) -> GatewayResult<ItemPage> {
        let conversation = self.get(public_id, user_id).await?;
        self.storage
            .list_items(conversation.id, after_id, limit, descending)
            .await
            .map_err(GatewayError::internal)
    }
}

pub struct NewItemInput {
    pub item_type: String,
    pub role: Option<String>,
    pub content: JsonValue,
    pub response_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_storage::test_support::InMemoryStorage;

    #[tokio::test]
    async fn cross_tenant_read_is_private_not_not_found() {
        let storage = Arc::new(InMemoryStorage::default());
        let store = ConversationStore::new(storage.clone());
        let owner = storage.seed_user("owner@example.com").await;
        let intruder = storage.seed_user("intruder@example.com").await;

        let conversation = store.create(owner, HashMap::new(), false).await.unwrap();

        let ok = store.get(&conversation.public_id, owner).await;
        assert!(ok.is_ok());

        let err = store.get(&conversation.public_id, intruder).await;
        assert!(matches!(err, Err(GatewayError::PrivateConversation)));
    }

    #[tokio::test]
    async fn batch_above_cap_is_rejected_and_exact_cap_persists_in_order() {
        let storage = Arc::new(InMemoryStorage::default());
        let store = ConversationStore::new(storage.clone());
        let user = storage.seed_user("u@example.com").await;
        let conversation = store.create(user, HashMap::new(), false).await.unwrap();

        let too_many: Vec<NewItemInput> = (0..21)
            .map(|i| NewItemInput {
                item_type: "message".to_string(),
                role: Some("user".to_string()),
                content: serde_json::json!({ "i": i }),
                response_id: None,
            })
            .collect();
        let err = store.add_multiple_items(&conversation.public_id, user, too_many).await;
        assert!(matches!(err, Err(GatewayError::InvalidRequest(_))));

        let exactly_twenty: Vec<NewItemInput> = (0..20)
            .map(|i| NewItemInput {
                item_type: "message".to_string(),
                role: Some("user".to_string()),
                content: serde_json::json!({ "i": i }),
                response_id: None,
            })
            .collect();
        let inserted = store
            .add_multiple_items(&conversation.public_id, user, exactly_twenty)
            .await
            .unwrap();
        assert_eq!(inserted.len(), 20);
        for (idx, item) in inserted.iter().enumerate() {
            assert_eq!(item.content["i"], idx);
        }
    }
}

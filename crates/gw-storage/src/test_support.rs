//! In-memory [`Storage`] implementation shared across `gw-core`'s test modules, gated behind the
//! `test-support` feature so it never ships in a production build. Generalizes the hand-rolled
//! `FakeStorage` fixtures that used to live inline in `credential.rs`/`tenant.rs` into one place
//! other service tests (conversation store, response lifecycle) can reuse.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::snapshot::TenantSnapshot;
use crate::storage::{
    ApiKeyRecord, ConversationRecord, GlobalConfigRecord, ItemPage, ItemRecord, MembershipRecord,
    ModelProviderRecord, NewApiKey, NewConversation, NewItem, NewModelProvider, NewResponse,
    NewUser, OrganizationRecord, ProjectMembershipRecord, ProjectRecord, ResponseRecord, Storage,
    StorageError, StorageResult, UserRecord, input_items_page,
};

#[derive(Default)]
struct Sequences {
    user: AtomicI64,
    org: AtomicI64,
    conversation: AtomicI64,
    item: AtomicI64,
    response: AtomicI64,
    api_key: AtomicI64,
    provider: AtomicI64,
}

impl Sequences {
    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Everything lives behind one `Mutex` — this is test-only and request volume never warrants
/// finer-grained locking here.
#[derive(Default)]
struct Tables {
    users: HashMap<i64, UserRecord>,
    organizations: HashMap<i64, OrganizationRecord>,
    memberships: Vec<MembershipRecord>,
    projects: HashMap<i64, ProjectRecord>,
    project_memberships: Vec<ProjectMembershipRecord>,
    api_keys: HashMap<i64, ApiKeyRecord>,
    api_key_hashes: HashMap<String, i64>,
    providers: HashMap<i64, ModelProviderRecord>,
    conversations: HashMap<i64, ConversationRecord>,
    items: HashMap<i64, ItemRecord>,
    responses: HashMap<i64, ResponseRecord>,
    global_config: Option<GlobalConfigRecord>,
}

#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
    seq: Sequences,
}

impl InMemoryStorage {
    /// Test convenience: creates a user plus its default organization (per "a default organization,
    /// owned by the new user, in the same transaction"), returning the new user's internal id.
    pub async fn seed_user(&self, email: &str) -> i64 {
        let user = self
            .create_user(NewUser {
                public_id: gw_common::ids::generate(gw_common::IdKind::User),
                email: email.to_string(),
                name: email.to_string(),
            })
            .await
            .expect("seed_user never fails in-memory");
        user.id
    }

    /// Test convenience: creates a project under `org_id` and binds `user_id` to it with `role`,
    /// returning the new project's internal id. There is no admin HTTP surface in scope to exercise
    /// this path end-to-end, so tests that need a populated tenant snapshot seed it directly.
    pub fn seed_project(&self, org_id: i64, user_id: i64, role: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        let project_id = Sequences::next(&self.seq.project);
        tables.projects.insert(
            project_id,
            ProjectRecord {
                id: project_id,
                public_id: gw_common::ids::generate(gw_common::IdKind::Project),
                org_id,
                name: "p".to_string(),
                status: "active".to_string(),
            },
        );
        tables.project_memberships.push(ProjectMembershipRecord {
            project_id,
            user_id,
            role: role.to_string(),
        });
        project_id
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "completed" | "failed" | "cancelled")
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn sync(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn load_global_config(&self) -> StorageResult<Option<GlobalConfigRecord>> {
        Ok(self.tables.lock().unwrap().global_config.clone())
    }

    async fn upsert_global_config(&self, config: &JsonValue) -> StorageResult<()> {
        self.tables.lock().unwrap().global_config = Some(GlobalConfigRecord {
            config: config.clone(),
            updated_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> StorageResult<UserRecord> {
        let mut tables = self.tables.lock().unwrap();
        let id = Sequences::next(&self.seq.user);
        let record = UserRecord {
            id,
            public_id: new_user.public_id,
            email: new_user.email,
            name: new_user.name,
            enabled: true,
        };
        tables.users.insert(id, record.clone());

        let org_id = Sequences::next(&self.seq.org);
        let org = OrganizationRecord {
            id: org_id,
            public_id: gw_common::ids::generate(gw_common::IdKind::Organization),
            name: "Default".to_string(),
            owner_user_id: id,
            enabled: true,
        };
        tables.organizations.insert(org_id, org);
        tables.memberships.push(MembershipRecord {
            org_id,
            user_id: id,
            role: "owner".to_string(),
            is_primary: true,
        });

        Ok(record)
    }

    async fn get_user_by_public_id(&self, public_id: &str) -> StorageResult<Option<UserRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.public_id == public_id)
            .cloned())
    }

    async fn get_user(&self, id: i64) -> StorageResult<Option<UserRecord>> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn find_org_by_owner(&self, user_id: i64) -> StorageResult<Option<OrganizationRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .organizations
            .values()
            .find(|o| o.owner_user_id == user_id)
            .cloned())
    }

    async fn find_membership(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> StorageResult<Option<MembershipRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .memberships
            .iter()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_projects_for_user(&self, user_id: i64) -> StorageResult<Vec<ProjectRecord>> {
        let tables = self.tables.lock().unwrap();
        let project_ids: Vec<i64> = tables
            .project_memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.project_id)
            .collect();
        Ok(tables
            .projects
            .values()
            .filter(|p| project_ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn load_tenant_snapshot(&self) -> StorageResult<TenantSnapshot> {
        let tables = self.tables.lock().unwrap();
        Ok(TenantSnapshot {
            organizations: tables.organizations.values().cloned().collect(),
            memberships: tables.memberships.clone(),
            projects: tables.projects.values().cloned().collect(),
            project_memberships: tables.project_memberships.clone(),
        })
    }

    async fn insert_api_key(&self, new_key: NewApiKey) -> StorageResult<ApiKeyRecord> {
        let mut tables = self.tables.lock().unwrap();
        let id = Sequences::next(&self.seq.api_key);
        let record = ApiKeyRecord {
            id,
            public_id: new_key.public_id,
            owner_kind: new_key.owner_kind,
            owner_user_id: new_key.owner_user_id,
            org_id: new_key.org_id,
            enabled: true,
            expires_at: new_key.expires_at,
        };
        tables.api_key_hashes.insert(new_key.key_hash, id);
        tables.api_keys.insert(id, record.clone());
        Ok(record)
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> StorageResult<Option<ApiKeyRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .api_key_hashes
            .get(key_hash)
            .and_then(|id| tables.api_keys.get(id))
            .cloned())
    }

    async fn upsert_model_provider(
        &self,
        provider: NewModelProvider,
    ) -> StorageResult<ModelProviderRecord> {
        let mut tables = self.tables.lock().unwrap();
        let clashes = tables.providers.values().any(|existing| {
            existing.vendor == provider.vendor
                && existing.org_id == provider.org_id
                && existing.project_id == provider.project_id
        });
        if clashes {
            return Err(StorageError::Conflict(format!(
                "vendor {} already configured for this tenant scope",
                provider.vendor
            )));
        }

        let id = Sequences::next(&self.seq.provider);
        let record = ModelProviderRecord {
            id,
            public_id: provider.public_id,
            org_id: provider.org_id,
            project_id: provider.project_id,
            name: provider.name,
            vendor: provider.vendor,
            base_url: provider.base_url,
            encrypted_api_key: provider.encrypted_api_key,
            active: true,
        };
        tables.providers.insert(id, record.clone());
        Ok(record)
    }

    async fn get_model_provider_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ModelProviderRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .providers
            .values()
            .find(|p| p.public_id == public_id)
            .cloned())
    }

    async fn list_active_model_providers(&self) -> StorageResult<Vec<ModelProviderRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .providers
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }

    async fn create_conversation(
        &self,
        new_conversation: NewConversation,
    ) -> StorageResult<ConversationRecord> {
        let mut tables = self.tables.lock().unwrap();
        let id = Sequences::next(&self.seq.conversation);
        let now = OffsetDateTime::now_utc();
        let record = ConversationRecord {
            id,
            public_id: new_conversation.public_id,
            user_id: new_conversation.user_id,
            title: None,
            status: "active".to_string(),
            metadata: new_conversation.metadata,
            is_private: new_conversation.is_private,
            created_at: now,
            updated_at: now,
        };
        tables.conversations.insert(id, record.clone());
        Ok(record)
    }

    async fn get_conversation_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ConversationRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .conversations
            .values()
            .find(|c| c.public_id == public_id)
            .cloned())
    }

    async fn get_conversation_by_id(&self, conversation_id: i64) -> StorageResult<Option<ConversationRecord>> {
        Ok(self.tables.lock().unwrap().conversations.get(&conversation_id).cloned())
    }

    async fn update_conversation_metadata(
        &self,
        conversation_id: i64,
        title: Option<String>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<ConversationRecord> {
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .conversations
            .get_mut(&conversation_id)
            .ok_or(StorageError::NotFound)?;
        if title.is_some() {
            record.title = title;
        }
        record.metadata.extend(metadata);
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_conversation(&self, conversation_id: i64) -> StorageResult<()> {
        self.tables.lock().unwrap().conversations.remove(&conversation_id);
        Ok(())
    }

    async fn add_item(&self, conversation_id: i64, item: NewItem) -> StorageResult<ItemRecord> {
        let mut tables = self.tables.lock().unwrap();
        let id = Sequences::next(&self.seq.item);
        let record = ItemRecord {
            id,
            public_id: item.public_id,
            conversation_id,
            response_id: item.response_id,
            item_type: item.item_type,
            role: item.role,
            content: item.content,
            status: None,
            completed_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.items.insert(id, record.clone());
        Ok(record)
    }

    async fn add_multiple_items(
        &self,
        conversation_id: i64,
        items: Vec<NewItem>,
    ) -> StorageResult<Vec<ItemRecord>> {
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            inserted.push(self.add_item(conversation_id, item).await?);
        }
        Ok(inserted)
    }

    async fn delete_item_by_public_id(
        &self,
        conversation_id: i64,
        item_public_id: &str,
    ) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let target = tables
            .items
            .values()
            .find(|i| i.conversation_id == conversation_id && i.public_id == item_public_id)
            .map(|i| i.id);
        if let Some(id) = target {
            tables.items.remove(&id);
        }
        Ok(())
    }

    async fn get_item_by_public_id(
        &self,
        conversation_id: i64,
        item_public_id: &str,
    ) -> StorageResult<Option<ItemRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .items
            .values()
            .find(|i| i.conversation_id == conversation_id && i.public_id == item_public_id)
            .cloned())
    }

    async fn list_items(
        &self,
        conversation_id: i64,
        after_id: Option<i64>,
        limit: u64,
        descending: bool,
    ) -> StorageResult<ItemPage> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<ItemRecord> = tables
            .items
            .values()
            .filter(|i| i.conversation_id == conversation_id)
            .filter(|i| match after_id {
                Some(after) if descending => i.id < after,
                Some(after) => i.id > after,
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.id);
        if descending {
            rows.reverse();
        }
        let has_more = rows.len() as u64 > limit;
        rows.truncate(limit as usize);
        Ok(ItemPage { items: rows, has_more })
    }

    async fn create_response(&self, new_response: NewResponse) -> StorageResult<ResponseRecord> {
        let mut tables = self.tables.lock().unwrap();
        let id = Sequences::next(&self.seq.response);
        let now = OffsetDateTime::now_utc();
        let record = ResponseRecord {
            id,
            public_id: new_response.public_id,
            user_id: new_response.user_id,
            conversation_id: new_response.conversation_id,
            previous_response_id: new_response.previous_response_id,
            model: new_response.model,
            status: "pending".to_string(),
            input: new_response.input,
            output: None,
            usage: None,
            error: None,
            created_at: now,
            completed_at: None,
            cancelled_at: None,
            failed_at: None,
        };
        tables.responses.insert(id, record.clone());
        Ok(record)
    }

    async fn get_response_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ResponseRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .responses
            .values()
            .find(|r| r.public_id == public_id)
            .cloned())
    }

    async fn get_response_by_id(&self, response_id: i64) -> StorageResult<Option<ResponseRecord>> {
        Ok(self.tables.lock().unwrap().responses.get(&response_id).cloned())
    }

    async fn mark_response_processing(&self, response_id: i64) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .responses
            .get_mut(&response_id)
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&record.status) {
            return Ok(());
        }
        record.status = "processing".to_string();
        Ok(())
    }

    async fn complete_response(
        &self,
        response_id: i64,
        output: JsonValue,
        usage: Option<JsonValue>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .responses
            .get_mut(&response_id)
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&record.status) {
            return Ok(());
        }
        record.status = "completed".to_string();
        record.output = Some(output);
        record.usage = usage;
        record.completed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    async fn fail_response(&self, response_id: i64, error: String) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .responses
            .get_mut(&response_id)
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&record.status) {
            return Ok(());
        }
        record.status = "failed".to_string();
        record.error = Some(error);
        record.failed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    async fn cancel_response(&self, response_id: i64) -> StorageResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .responses
            .get_mut(&response_id)
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&record.status) {
            return Ok(false);
        }
        record.status = "cancelled".to_string();
        record.cancelled_at = Some(OffsetDateTime::now_utc());
        Ok(true)
    }

    async fn list_response_input_items(
        &self,
        response_id: i64,
        after_id: Option<i64>,
        limit: u64,
    ) -> StorageResult<ItemPage> {
        let tables = self.tables.lock().unwrap();
        let response = tables.responses.get(&response_id).ok_or(StorageError::NotFound)?;
        Ok(input_items_page(response, after_id, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_user_creates_a_default_organization() {
        let storage = InMemoryStorage::default();
        let user_id = storage.seed_user("owner@example.com").await;
        let org = storage.find_org_by_owner(user_id).await.unwrap();
        assert!(org.is_some());
        assert_eq!(org.unwrap().name, "Default");
    }

    #[tokio::test]
    async fn response_status_is_sticky_once_terminal() {
        let storage = InMemoryStorage::default();
        let response = storage
            .create_response(NewResponse {
                public_id: "resp_x".to_string(),
                user_id: 1,
                conversation_id: None,
                previous_response_id: None,
                model: "gpt-test".to_string(),
                input: JsonValue::Null,
                params: JsonValue::Null,
            })
            .await
            .unwrap();

        storage.fail_response(response.id, "boom".to_string()).await.unwrap();
        storage
            .complete_response(response.id, JsonValue::Null, None)
            .await
            .unwrap();

        let reloaded = storage
            .get_response_by_public_id(&response.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, "failed");
    }
}

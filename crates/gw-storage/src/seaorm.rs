use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema, TransactionTrait,
};
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::entities;
use crate::snapshot::TenantSnapshot;
use crate::storage::{
    ApiKeyRecord, ConversationRecord, GlobalConfigRecord, ItemPage, ItemRecord, MembershipRecord,
    ModelProviderRecord, NewApiKey, NewConversation, NewItem, NewModelProvider, NewResponse,
    NewUser, OrganizationRecord, ProjectMembershipRecord, ProjectRecord, ResponseRecord, Storage,
    StorageError, StorageResult, UserRecord, input_items_page,
};

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
}

impl SeaOrmStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(dsn: &str) -> StorageResult<Self> {
        let db = crate::db::connect(dsn).await?;
        if db.get_database_backend() == DatabaseBackend::Sqlite {
            db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
        }
        Ok(Self { db })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn metadata_to_json(metadata: &HashMap<String, String>) -> JsonValue {
    serde_json::to_value(metadata).unwrap_or(JsonValue::Object(Default::default()))
}

fn metadata_from_json(value: JsonValue) -> HashMap<String, String> {
    serde_json::from_value(value).unwrap_or_default()
}

fn conversation_record(model: entities::conversations::Model) -> ConversationRecord {
    ConversationRecord {
        id: model.id,
        public_id: model.public_id,
        user_id: model.user_id,
        title: model.title,
        status: model.status,
        metadata: metadata_from_json(model.metadata),
        is_private: model.is_private,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn item_record(model: entities::items::Model) -> ItemRecord {
    ItemRecord {
        id: model.id,
        public_id: model.public_id,
        conversation_id: model.conversation_id,
        response_id: model.response_id,
        item_type: model.item_type,
        role: model.role,
        content: model.content,
        status: model.status,
        completed_at: model.completed_at,
        created_at: model.created_at,
    }
}

fn response_record(model: entities::responses::Model) -> ResponseRecord {
    ResponseRecord {
        id: model.id,
        public_id: model.public_id,
        user_id: model.user_id,
        conversation_id: model.conversation_id,
        previous_response_id: model.previous_response_id,
        model: model.model,
        status: model.status,
        input: model.input,
        output: model.output,
        usage: model.usage,
        error: model.error,
        created_at: model.created_at,
        completed_at: model.completed_at,
        cancelled_at: model.cancelled_at,
        failed_at: model.failed_at,
    }
}

fn model_provider_record(model: entities::model_providers::Model) -> ModelProviderRecord {
    ModelProviderRecord {
        id: model.id,
        public_id: model.public_id,
        org_id: model.org_id,
        project_id: model.project_id,
        name: model.name,
        vendor: model.vendor,
        base_url: model.base_url,
        encrypted_api_key: model.encrypted_api_key,
        active: model.active,
    }
}

#[async_trait::async_trait]
impl Storage for SeaOrmStorage {
    async fn sync(&self) -> StorageResult<()> {
        Schema::new(self.db.get_database_backend())
            .builder()
            .register(entities::Users)
            .register(entities::Organizations)
            .register(entities::OrganizationMembers)
            .register(entities::Projects)
            .register(entities::ProjectMembers)
            .register(entities::ApiKeys)
            .register(entities::ModelProviders)
            .register(entities::Conversations)
            .register(entities::Items)
            .register(entities::Responses)
            .register(entities::GlobalConfigRows)
            .sync(&self.db)
            .await?;
        Ok(())
    }

    async fn load_global_config(&self) -> StorageResult<Option<GlobalConfigRecord>> {
        let found = entities::GlobalConfigRows::find_by_id(0i64).one(&self.db).await?;
        Ok(found.map(|row| GlobalConfigRecord {
            config: row.config_json,
            updated_at: row.updated_at,
        }))
    }

    async fn upsert_global_config(&self, config: &JsonValue) -> StorageResult<()> {
        let now = OffsetDateTime::now_utc();
        let existing = entities::GlobalConfigRows::find_by_id(0i64).one(&self.db).await?;
        match existing {
            Some(row) => {
                let mut active: entities::global_config::ActiveModel = row.into();
                active.config_json = ActiveValue::set(config.clone());
                active.updated_at = ActiveValue::set(now);
                active.update(&self.db).await?;
            }
            None => {
                entities::global_config::ActiveModel {
                    id: ActiveValue::set(0),
                    config_json: ActiveValue::set(config.clone()),
                    updated_at: ActiveValue::set(now),
                }
                .insert(&self.db)
                .await?;
            }
        }
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> StorageResult<UserRecord> {
        let now = OffsetDateTime::now_utc();
        let txn = self.db.begin().await?;

        let user = entities::users::ActiveModel {
            public_id: ActiveValue::set(new_user.public_id),
            email: ActiveValue::set(new_user.email),
            name: ActiveValue::set(new_user.name.clone()),
            enabled: ActiveValue::set(true),
            created_at: ActiveValue::set(now),
            updated_at: ActiveValue::set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // Default organization, owned by the new user, created in the same
        // transaction.
        entities::organizations::ActiveModel {
            public_id: ActiveValue::set(gw_common::ids::generate(gw_common::IdKind::Organization)),
            name: ActiveValue::set("Default".to_string()),
            owner_user_id: ActiveValue::set(user.id),
            enabled: ActiveValue::set(true),
            created_at: ActiveValue::set(now),
            updated_at: ActiveValue::set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(UserRecord {
            id: user.id,
            public_id: user.public_id,
            email: user.email,
            name: user.name,
            enabled: user.enabled,
        })
    }

    async fn get_user_by_public_id(&self, public_id: &str) -> StorageResult<Option<UserRecord>> {
        let found = entities::Users::find()
            .filter(entities::users::Column::PublicId.eq(public_id))
            .one(&self.db)
            .await?;
        Ok(found.map(|u| UserRecord {
            id: u.id,
            public_id: u.public_id,
            email: u.email,
            name: u.name,
            enabled: u.enabled,
        }))
    }

    async fn get_user(&self, id: i64) -> StorageResult<Option<UserRecord>> {
        let found = entities::Users::find_by_id(id).one(&self.db).await?;
        Ok(found.map(|u| UserRecord {
            id: u.id,
            public_id: u.public_id,
            email: u.email,
            name: u.name,
            enabled: u.enabled,
        }))
    }

    async fn find_org_by_owner(&self, user_id: i64) -> StorageResult<Option<OrganizationRecord>> {
        let found = entities::Organizations::find()
            .filter(entities::organizations::Column::OwnerUserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(found.map(|o| OrganizationRecord {
            id: o.id,
            public_id: o.public_id,
            name: o.name,
            owner_user_id: o.owner_user_id,
            enabled: o.enabled,
        }))
    }

    async fn find_membership(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> StorageResult<Option<MembershipRecord>> {
        let found = entities::OrganizationMembers::find()
            .filter(
                Condition::all()
                    .add(entities::organization_members::Column::OrgId.eq(org_id))
                    .add(entities::organization_members::Column::UserId.eq(user_id)),
            )
            .one(&self.db)
            .await?;
        Ok(found.map(|m| MembershipRecord {
            org_id: m.org_id,
            user_id: m.user_id,
            role: m.role,
            is_primary: m.is_primary,
        }))
    }

    async fn list_projects_for_user(&self, user_id: i64) -> StorageResult<Vec<ProjectRecord>> {
        let member_rows = entities::ProjectMembers::find()
            .filter(entities::project_members::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        let project_ids: Vec<i64> = member_rows.iter().map(|m| m.project_id).collect();
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }
        let projects = entities::Projects::find()
            .filter(entities::projects::Column::Id.is_in(project_ids))
            .all(&self.db)
            .await?;
        Ok(projects
            .into_iter()
            .map(|p| ProjectRecord {
                id: p.id,
                public_id: p.public_id,
                org_id: p.org_id,
                name: p.name,
                status: p.status,
            })
            .collect())
    }

    async fn load_tenant_snapshot(&self) -> StorageResult<TenantSnapshot> {
        let organizations = entities::Organizations::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|o| OrganizationRecord {
                id: o.id,
                public_id: o.public_id,
                name: o.name,
                owner_user_id: o.owner_user_id,
                enabled: o.enabled,
            })
            .collect();

        let memberships = entities::OrganizationMembers::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| MembershipRecord {
                org_id: m.org_id,
                user_id: m.user_id,
                role: m.role,
                is_primary: m.is_primary,
            })
            .collect();

        let projects = entities::Projects::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| ProjectRecord {
                id: p.id,
                public_id: p.public_id,
                org_id: p.org_id,
                name: p.name,
                status: p.status,
            })
            .collect();

        let project_memberships = entities::ProjectMembers::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| ProjectMembershipRecord {
                project_id: m.project_id,
                user_id: m.user_id,
                role: m.role,
            })
            .collect();

        Ok(TenantSnapshot {
            organizations,
            memberships,
            projects,
            project_memberships,
        })
    }

    async fn insert_api_key(&self, new_key: NewApiKey) -> StorageResult<ApiKeyRecord> {
        let now = OffsetDateTime::now_utc();
        let model = entities::api_keys::ActiveModel {
            public_id: ActiveValue::set(new_key.public_id),
            key_hash: ActiveValue::set(new_key.key_hash),
            plaintext_hint: ActiveValue::set(new_key.plaintext_hint),
            description: ActiveValue::set(new_key.description),
            enabled: ActiveValue::set(true),
            owner_kind: ActiveValue::set(new_key.owner_kind),
            owner_user_id: ActiveValue::set(new_key.owner_user_id),
            org_id: ActiveValue::set(new_key.org_id),
            permissions: ActiveValue::set(new_key.permissions),
            expires_at: ActiveValue::set(new_key.expires_at),
            created_at: ActiveValue::set(now),
            updated_at: ActiveValue::set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(ApiKeyRecord {
            id: model.id,
            public_id: model.public_id,
            owner_kind: model.owner_kind,
            owner_user_id: model.owner_user_id,
            org_id: model.org_id,
            enabled: model.enabled,
            expires_at: model.expires_at,
        })
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> StorageResult<Option<ApiKeyRecord>> {
        let found = entities::ApiKeys::find()
            .filter(entities::api_keys::Column::KeyHash.eq(key_hash))
            .one(&self.db)
            .await?;
        Ok(found.map(|k| ApiKeyRecord {
            id: k.id,
            public_id: k.public_id,
            owner_kind: k.owner_kind,
            owner_user_id: k.owner_user_id,
            org_id: k.org_id,
            enabled: k.enabled,
            expires_at: k.expires_at,
        }))
    }

    async fn upsert_model_provider(
        &self,
        provider: NewModelProvider,
    ) -> StorageResult<ModelProviderRecord> {
        // Vendor uniqueness within (org_id, project_id).
        let existing = entities::ModelProviders::find()
            .filter(
                Condition::all()
                    .add(entities::model_providers::Column::Vendor.eq(provider.vendor.clone()))
                    .add(match provider.org_id {
                        Some(id) => entities::model_providers::Column::OrgId.eq(id),
                        None => entities::model_providers::Column::OrgId.is_null(),
                    })
                    .add(match provider.project_id {
                        Some(id) => entities::model_providers::Column::ProjectId.eq(id),
                        None => entities::model_providers::Column::ProjectId.is_null(),
                    }),
            )
            .one(&self.db)
            .await?;

        if let Some(existing) = existing {
            return Err(StorageError::Conflict(format!(
                "vendor {} already configured for this tenant scope (provider {})",
                provider.vendor, existing.public_id
            )));
        }

        let now = OffsetDateTime::now_utc();
        let model = entities::model_providers::ActiveModel {
            public_id: ActiveValue::set(provider.public_id),
            org_id: ActiveValue::set(provider.org_id),
            project_id: ActiveValue::set(provider.project_id),
            name: ActiveValue::set(provider.name),
            provider_type: ActiveValue::set(provider.provider_type),
            vendor: ActiveValue::set(provider.vendor),
            base_url: ActiveValue::set(provider.base_url),
            encrypted_api_key: ActiveValue::set(provider.encrypted_api_key),
            api_key_hint: ActiveValue::set(provider.api_key_hint),
            active: ActiveValue::set(true),
            metadata: ActiveValue::set(provider.metadata),
            last_synced_at: ActiveValue::set(None),
            created_at: ActiveValue::set(now),
            updated_at: ActiveValue::set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(model_provider_record(model))
    }

    async fn get_model_provider_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ModelProviderRecord>> {
        let found = entities::ModelProviders::find()
            .filter(entities::model_providers::Column::PublicId.eq(public_id))
            .one(&self.db)
            .await?;
        Ok(found.map(model_provider_record))
    }

    async fn list_active_model_providers(&self) -> StorageResult<Vec<ModelProviderRecord>> {
        let rows = entities::ModelProviders::find()
            .filter(entities::model_providers::Column::Active.eq(true))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(model_provider_record).collect())
    }

    async fn create_conversation(
        &self,
        new_conversation: NewConversation,
    ) -> StorageResult<ConversationRecord> {
        let now = OffsetDateTime::now_utc();
        let model = entities::conversations::ActiveModel {
            public_id: ActiveValue::set(new_conversation.public_id),
            user_id: ActiveValue::set(new_conversation.user_id),
            title: ActiveValue::set(None),
            status: ActiveValue::set("active".to_string()),
            metadata: ActiveValue::set(metadata_to_json(&new_conversation.metadata)),
            is_private: ActiveValue::set(new_conversation.is_private),
            created_at: ActiveValue::set(now),
            updated_at: ActiveValue::set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(conversation_record(model))
    }

    async fn get_conversation_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ConversationRecord>> {
        let found = entities::Conversations::find()
            .filter(entities::conversations::Column::PublicId.eq(public_id))
            .one(&self.db)
            .await?;
        Ok(found.map(conversation_record))
    }

    async fn get_conversation_by_id(&self, conversation_id: i64) -> StorageResult<Option<ConversationRecord>> {
        let found = entities::Conversations::find_by_id(conversation_id).one(&self.db).await?;
        Ok(found.map(conversation_record))
    }

    async fn update_conversation_metadata(
        &self,
        conversation_id: i64,
        title: Option<String>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<ConversationRecord> {
        let existing = entities::Conversations::find_by_id(conversation_id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;

        let mut merged = metadata_from_json(existing.metadata.clone());
        merged.extend(metadata);

        let mut active: entities::conversations::ActiveModel = existing.into();
        if title.is_some() {
            active.title = ActiveValue::set(title);
        }
        active.metadata = ActiveValue::set(metadata_to_json(&merged));
        active.updated_at = ActiveValue::set(OffsetDateTime::now_utc());
        let model = active.update(&self.db).await?;
        Ok(conversation_record(model))
    }

    async fn delete_conversation(&self, conversation_id: i64) -> StorageResult<()> {
        entities::Conversations::delete_by_id(conversation_id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn add_item(&self, conversation_id: i64, item: NewItem) -> StorageResult<ItemRecord> {
        let now = OffsetDateTime::now_utc();
        let model = entities::items::ActiveModel {
            public_id: ActiveValue::set(item.public_id),
            conversation_id: ActiveValue::set(conversation_id),
            response_id: ActiveValue::set(item.response_id),
            item_type: ActiveValue::set(item.item_type),
            role: ActiveValue::set(item.role),
            content: ActiveValue::set(item.content),
            status: ActiveValue::set(None),
            incomplete_at: ActiveValue::set(None),
            incomplete_details: ActiveValue::set(None),
            completed_at: ActiveValue::set(None),
            created_at: ActiveValue::set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(item_record(model))
    }

    async fn add_multiple_items(
        &self,
        conversation_id: i64,
        items: Vec<NewItem>,
    ) -> StorageResult<Vec<ItemRecord>> {
        // All-or-nothing, in the given array order.
        let txn = self.db.begin().await?;
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let now = OffsetDateTime::now_utc();
            let model = entities::items::ActiveModel {
                public_id: ActiveValue::set(item.public_id),
                conversation_id: ActiveValue::set(conversation_id),
                response_id: ActiveValue::set(item.response_id),
                item_type: ActiveValue::set(item.item_type),
                role: ActiveValue::set(item.role),
                content: ActiveValue::set(item.content),
                status: ActiveValue::set(None),
                incomplete_at: ActiveValue::set(None),
                incomplete_details: ActiveValue::set(None),
                completed_at: ActiveValue::set(None),
                created_at: ActiveValue::set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            inserted.push(item_record(model));
        }
        txn.commit().await?;
        Ok(inserted)
    }

    async fn delete_item_by_public_id(
        &self,
        conversation_id: i64,
        item_public_id: &str,
    ) -> StorageResult<()> {
        entities::Items::delete_many()
            .filter(
                Condition::all()
                    .add(entities::items::Column::ConversationId.eq(conversation_id))
                    .add(entities::items::Column::PublicId.eq(item_public_id)),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn get_item_by_public_id(
        &self,
        conversation_id: i64,
        item_public_id: &str,
    ) -> StorageResult<Option<ItemRecord>> {
        let found = entities::Items::find()
            .filter(
                Condition::all()
                    .add(entities::items::Column::ConversationId.eq(conversation_id))
                    .add(entities::items::Column::PublicId.eq(item_public_id)),
            )
            .one(&self.db)
            .await?;
        Ok(found.map(item_record))
    }

    async fn list_items(
        &self,
        conversation_id: i64,
        after_id: Option<i64>,
        limit: u64,
        descending: bool,
    ) -> StorageResult<ItemPage> {
        let mut query =
            entities::Items::find().filter(entities::items::Column::ConversationId.eq(conversation_id));

        if let Some(after_id) = after_id {
            query = if descending {
                query.filter(entities::items::Column::Id.lt(after_id))
            } else {
                query.filter(entities::items::Column::Id.gt(after_id))
            };
        }

        query = if descending {
            query.order_by_desc(entities::items::Column::Id)
        } else {
            query.order_by_asc(entities::items::Column::Id)
        };

        let mut rows = query.limit(limit + 1).all(&self.db).await?;
        let has_more = rows.len() as u64 > limit;
        rows.truncate(limit as usize);

        Ok(ItemPage {
            items: rows.into_iter().map(item_record).collect(),
            has_more,
        })
    }

    async fn create_response(&self, new_response: NewResponse) -> StorageResult<ResponseRecord> {
        let now = OffsetDateTime::now_utc();
        let model = entities::responses::ActiveModel {
            public_id: ActiveValue::set(new_response.public_id),
            user_id: ActiveValue::set(new_response.user_id),
            conversation_id: ActiveValue::set(new_response.conversation_id),
            previous_response_id: ActiveValue::set(new_response.previous_response_id),
            model: ActiveValue::set(new_response.model),
            status: ActiveValue::set("pending".to_string()),
            input: ActiveValue::set(new_response.input),
            output: ActiveValue::set(None),
            params: ActiveValue::set(new_response.params),
            usage: ActiveValue::set(None),
            error: ActiveValue::set(None),
            created_at: ActiveValue::set(now),
            updated_at: ActiveValue::set(now),
            completed_at: ActiveValue::set(None),
            cancelled_at: ActiveValue::set(None),
            failed_at: ActiveValue::set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(response_record(model))
    }

    async fn get_response_by_public_id(
        &self,
        public_id: &str,
    ) -> StorageResult<Option<ResponseRecord>> {
        let found = entities::Responses::find()
            .filter(entities::responses::Column::PublicId.eq(public_id))
            .one(&self.db)
            .await?;
        Ok(found.map(response_record))
    }

    async fn get_response_by_id(&self, response_id: i64) -> StorageResult<Option<ResponseRecord>> {
        let found = entities::Responses::find_by_id(response_id).one(&self.db).await?;
        Ok(found.map(response_record))
    }

    async fn mark_response_processing(&self, response_id: i64) -> StorageResult<()> {
        let existing = entities::Responses::find_by_id(response_id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;
        // Terminal states are sticky.
        if is_terminal(&existing.status) {
            return Ok(());
        }
        let mut active: entities::responses::ActiveModel = existing.into();
        active.status = ActiveValue::set("processing".to_string());
        active.updated_at = ActiveValue::set(OffsetDateTime::now_utc());
        active.update(&self.db).await?;
        Ok(())
    }

    async fn complete_response(
        &self,
        response_id: i64,
        output: JsonValue,
        usage: Option<JsonValue>,
    ) -> StorageResult<()> {
        let existing = entities::Responses::find_by_id(response_id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&existing.status) {
            return Ok(());
        }
        let now = OffsetDateTime::now_utc();
        let mut active: entities::responses::ActiveModel = existing.into();
        active.status = ActiveValue::set("completed".to_string());
        active.output = ActiveValue::set(Some(output));
        active.usage = ActiveValue::set(usage);
        active.completed_at = ActiveValue::set(Some(now));
        active.updated_at = ActiveValue::set(now);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn fail_response(&self, response_id: i64, error: String) -> StorageResult<()> {
        let existing = entities::Responses::find_by_id(response_id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&existing.status) {
            return Ok(());
        }
        let now = OffsetDateTime::now_utc();
        let mut active: entities::responses::ActiveModel = existing.into();
        active.status = ActiveValue::set("failed".to_string());
        active.error = ActiveValue::set(Some(error));
        active.failed_at = ActiveValue::set(Some(now));
        active.updated_at = ActiveValue::set(now);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn cancel_response(&self, response_id: i64) -> StorageResult<bool> {
        let existing = entities::Responses::find_by_id(response_id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;
        if is_terminal(&existing.status) {
            return Ok(false);
        }
        let now = OffsetDateTime::now_utc();
        let mut active: entities::responses::ActiveModel = existing.into();
        active.status = ActiveValue::set("cancelled".to_string());
        active.cancelled_at = ActiveValue::set(Some(now));
        active.updated_at = ActiveValue::set(now);
        active.update(&self.db).await?;
        Ok(true)
    }

    async fn list_response_input_items(
        &self,
        response_id: i64,
        after_id: Option<i64>,
        limit: u64,
    ) -> StorageResult<ItemPage> {
        let response = entities::Responses::find_by_id(response_id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(input_items_page(&response_record(response), after_id, limit))
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "completed" | "failed" | "cancelled")
}

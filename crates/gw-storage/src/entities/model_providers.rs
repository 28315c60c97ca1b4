use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "model_providers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "provider_public_id")]
    pub public_id: String,
    pub org_id: Option<i64>,
    pub project_id: Option<i64>,
    pub name: String,
    /// "jan" | "organization".
    pub provider_type: String,
    /// "jan" | "openrouter" | "gemini" |....
    pub vendor: String,
    pub base_url: String,
    /// Encrypted with `MODEL_PROVIDER_SECRET` (AES-GCM); decrypted only at dispatch time.
    pub encrypted_api_key: String,
    pub api_key_hint: String,
    pub active: bool,
    pub metadata: Json,
    pub last_synced_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}

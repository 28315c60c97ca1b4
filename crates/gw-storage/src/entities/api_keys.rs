use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "api_key_public_id")]
    pub public_id: String,
    #[sea_orm(unique_key = "api_key_hash")]
    pub key_hash: String,
    /// Last few characters of the plaintext key, for display only (`***abcd`); the plaintext itself is
    /// never persisted.
    pub plaintext_hint: String,
    pub description: Option<String>,
    pub enabled: bool,
    /// "user" | "admin" | "project" | "ephemeral".
    pub owner_kind: String,
    pub owner_user_id: Option<i64>,
    pub org_id: Option<i64>,
    pub permissions: Json,
    pub expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}

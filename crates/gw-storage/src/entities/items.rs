use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "item_public_id")]
    pub public_id: String,
    pub conversation_id: i64,
    pub response_id: Option<i64>,
    /// "message" | "function" | "tool_result".
    pub item_type: String,
    /// "system" | "user" | "assistant", only set for `message` items.
    pub role: Option<String>,
    pub content: Json,
    pub status: Option<String>,
    pub incomplete_at: Option<OffsetDateTime>,
    pub incomplete_details: Option<String>,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    #[sea_orm(belongs_to, from = "conversation_id", to = "id", on_delete = "Cascade")]
    pub conversation: HasOne<super::conversations::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

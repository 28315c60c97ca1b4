use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "response_public_id")]
    pub public_id: String,
    pub user_id: i64,
    pub conversation_id: Option<i64>,
    pub previous_response_id: Option<i64>,
    pub model: String,
    /// "pending" | "processing" | "completed" | "failed" | "cancelled".
    pub status: String,
    pub input: Json,
    pub output: Option<Json>,
    pub params: Json,
    pub usage: Option<Json>,
    pub error: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub failed_at: Option<OffsetDateTime>,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub user: HasOne<super::users::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "conversation_public_id")]
    pub public_id: String,
    pub user_id: i64,
    pub title: Option<String>,
    /// "active" | "archived".
    pub status: String,
    pub metadata: Json,
    pub is_private: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub user: HasOne<super::users::Entity>,
    #[sea_orm(has_many)]
    pub items: HasMany<super::items::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "project_public_id")]
    pub public_id: String,
    pub org_id: i64,
    pub name: String,
    /// "active" | "archived".
    pub status: String,
    pub archived_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[sea_orm(belongs_to, from = "org_id", to = "id", on_delete = "Cascade")]
    pub organization: HasOne<super::organizations::Entity>,
    #[sea_orm(has_many)]
    pub members: HasMany<super::project_members::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

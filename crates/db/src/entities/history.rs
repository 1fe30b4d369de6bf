use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub when: DateTimeUtc,
    pub model_name: String,
    /// Loose reference by (model_name, object_id); no enforced foreign key.
    pub object_id: Option<Uuid>,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub user_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

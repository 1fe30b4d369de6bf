use sea_orm::entity::prelude::*;

use crate::types::Urgency;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub item_id: Option<i64>,
    pub location_id: Option<i64>,
    pub short_description: String,
    pub long_description: Option<String>,
    pub urgency: Urgency,
    pub submitted_at: DateTimeUtc,
    pub submitted_by_id: Option<i64>,
    pub technician_id: Option<i64>,
    pub is_resolved: bool,
    pub resolution_notes: Option<String>,
    pub recipient_emails: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{item, location, technician, ticket, user};

pub async fn user_id_by_uuid<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<i64>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .filter(user::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn user_uuid_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Uuid>, DbErr> {
    user::Entity::find()
        .select_only()
        .column(user::Column::Uuid)
        .filter(user::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn location_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    location::Entity::find()
        .select_only()
        .column(location::Column::Id)
        .filter(location::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn location_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    location::Entity::find()
        .select_only()
        .column(location::Column::Uuid)
        .filter(location::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn item_id_by_uuid<C: ConnectionTrait>(db: &C, uuid: Uuid) -> Result<Option<i64>, DbErr> {
    item::Entity::find()
        .select_only()
        .column(item::Column::Id)
        .filter(item::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn item_uuid_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Uuid>, DbErr> {
    item::Entity::find()
        .select_only()
        .column(item::Column::Uuid)
        .filter(item::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn technician_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    technician::Entity::find()
        .select_only()
        .column(technician::Column::Id)
        .filter(technician::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn technician_uuid_by_id<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Uuid>, DbErr> {
    technician::Entity::find()
        .select_only()
        .column(technician::Column::Uuid)
        .filter(technician::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

pub async fn ticket_id_by_uuid<C: ConnectionTrait>(
    db: &C,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    ticket::Entity::find()
        .select_only()
        .column(ticket::Column::Id)
        .filter(ticket::Column::Uuid.eq(uuid))
        .into_tuple()
        .one(db)
        .await
}

pub async fn ticket_uuid_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Uuid>, DbErr> {
    ticket::Entity::find()
        .select_only()
        .column(ticket::Column::Uuid)
        .filter(ticket::Column::Id.eq(id))
        .into_tuple()
        .one(db)
        .await
}

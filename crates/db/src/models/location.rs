use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::location;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
}

impl Location {
    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = location::Entity::find()
            .order_by_asc(location::Column::Name)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| Location {
                id: model.uuid,
                name: model.name,
            })
            .collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = location::Entity::find()
            .filter(location::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(|model| Location {
            id: model.uuid,
            name: model.name,
        }))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        name: &str,
        location_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = location::ActiveModel {
            uuid: Set(location_id),
            name: Set(name.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Location {
            id: model.uuid,
            name: model.name,
        })
    }
}

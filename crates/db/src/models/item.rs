use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::{item, location, mmodel},
    models::ids,
};

/// An inventoried item from the catalog collaborator; consumed read-only as
/// a foreign-key target and dropdown source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub serial_number: Option<String>,
    pub location_id: Option<Uuid>,
    pub mmodel_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItem {
    pub name: String,
    pub serial_number: Option<String>,
    pub location_id: Option<Uuid>,
    pub mmodel_id: Option<Uuid>,
}

/// One selectable item plus the auxiliary display data the ticket form's
/// item selector attaches to each option so clients can filter and decorate
/// without extra round trips. Cosmetic only; carries no validation weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOption {
    pub id: Uuid,
    pub name: String,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub mmodel_name: Option<String>,
    pub search_text: String,
}

async fn from_model<C: ConnectionTrait>(db: &C, model: item::Model) -> Result<Item, DbErr> {
    let location_id = match model.location_id {
        Some(id) => ids::location_uuid_by_id(db, id).await?,
        None => None,
    };
    let mmodel_id = match model.mmodel_id {
        Some(id) => mmodel::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|m| m.uuid),
        None => None,
    };
    Ok(Item {
        id: model.uuid,
        name: model.name,
        serial_number: model.serial_number,
        location_id,
        mmodel_id,
    })
}

impl Item {
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = item::Entity::find()
            .filter(item::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_options<C: ConnectionTrait>(db: &C) -> Result<Vec<ItemOption>, DbErr> {
        let locations: HashMap<i64, (Uuid, String)> = location::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, (model.uuid, model.name)))
            .collect();
        let mmodels: HashMap<i64, String> = mmodel::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, model.name))
            .collect();

        let models = item::Entity::find()
            .order_by_asc(item::Column::Name)
            .all(db)
            .await?;

        let mut options = Vec::with_capacity(models.len());
        for model in models {
            let location = model.location_id.and_then(|id| locations.get(&id));
            let mmodel_name = model.mmodel_id.and_then(|id| mmodels.get(&id)).cloned();
            let mut search_parts = vec![model.name.clone()];
            if let Some(serial) = &model.serial_number {
                search_parts.push(serial.clone());
            }
            if let Some((_, name)) = location {
                search_parts.push(name.clone());
            }
            if let Some(name) = &mmodel_name {
                search_parts.push(name.clone());
            }
            options.push(ItemOption {
                id: model.uuid,
                name: model.name,
                location_id: location.map(|(uuid, _)| *uuid),
                location_name: location.map(|(_, name)| name.clone()),
                mmodel_name,
                search_text: search_parts.join(" ").to_lowercase(),
            });
        }
        Ok(options)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateItem,
        item_id: Uuid,
    ) -> Result<Self, DbErr> {
        let location_row_id = match data.location_id {
            Some(id) => ids::location_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Location not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let mmodel_row_id = match data.mmodel_id {
            Some(id) => mmodel::Entity::find()
                .filter(mmodel::Column::Uuid.eq(id))
                .one(db)
                .await?
                .map(|m| m.id)
                .ok_or(DbErr::RecordNotFound("Mmodel not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let now = Utc::now();
        let active = item::ActiveModel {
            uuid: Set(item_id),
            name: Set(data.name.clone()),
            serial_number: Set(data.serial_number.clone()),
            location_id: Set(location_row_id),
            mmodel_id: Set(mmodel_row_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        from_model(db, model).await
    }

    /// Catalog-side removal; ticket references are nulled by the schema.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = item::Entity::delete_many()
            .filter(item::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

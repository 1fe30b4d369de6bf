use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::{technician, user},
    models::ids,
};

/// Staff member eligible for ticket assignment. May exist without a linked
/// user account (e.g. a placeholder for an external contractor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    pub id: Uuid,
    pub name: String,
    pub user_id: Option<Uuid>,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTechnician {
    pub name: String,
    pub user_id: Option<Uuid>,
    #[serde(default = "default_is_current")]
    pub is_current: bool,
}

fn default_is_current() -> bool {
    true
}

async fn from_model<C: ConnectionTrait>(
    db: &C,
    model: technician::Model,
) -> Result<Technician, DbErr> {
    let user_id = match model.user_id {
        Some(id) => ids::user_uuid_by_id(db, id).await?,
        None => None,
    };
    Ok(Technician {
        id: model.uuid,
        name: model.name,
        user_id,
        is_current: model.is_current,
    })
}

impl Technician {
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = technician::Entity::find()
            .filter(technician::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = technician::Entity::find()
            .order_by_asc(technician::Column::Name)
            .all(db)
            .await?;
        let mut technicians = Vec::with_capacity(models.len());
        for model in models {
            technicians.push(from_model(db, model).await?);
        }
        Ok(technicians)
    }

    /// Email addresses of all current technicians with a linked user
    /// account; the source for a new ticket's default recipient list.
    pub async fn current_emails<C: ConnectionTrait>(db: &C) -> Result<Vec<String>, DbErr> {
        let user_ids: Vec<i64> = technician::Entity::find()
            .filter(technician::Column::IsCurrent.eq(true))
            .filter(technician::Column::UserId.is_not_null())
            .all(db)
            .await?
            .into_iter()
            .filter_map(|model| model.user_id)
            .collect();

        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let emails = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.email)
            .collect();
        Ok(emails)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTechnician,
        technician_id: Uuid,
    ) -> Result<Self, DbErr> {
        let user_row_id = match data.user_id {
            Some(id) => ids::user_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let now = Utc::now();
        let active = technician::ActiveModel {
            uuid: Set(technician_id),
            name: Set(data.name.clone()),
            user_id: Set(user_row_id),
            is_current: Set(data.is_current),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        from_model(db, model).await
    }
}

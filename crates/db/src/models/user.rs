use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user;

/// An account from the identity collaborator. Consumed read-only by the
/// ticket module apart from test/seed creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub permissions: Vec<String>,
}

fn from_model(model: user::Model) -> Result<User, DbErr> {
    let permissions: Vec<String> = serde_json::from_value(model.permissions)
        .map_err(|err| DbErr::Custom(format!("malformed permissions for user: {err}")))?;
    Ok(User {
        id: model.uuid,
        username: model.username,
        email: model.email,
        is_active: model.is_active,
        permissions,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    })
}

impl User {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        record.map(from_model).transpose()
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, DbErr> {
        let permissions = serde_json::to_value(&data.permissions)
            .map_err(|err| DbErr::Custom(err.to_string()))?;
        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            username: Set(data.username.clone()),
            email: Set(data.email.clone()),
            is_active: Set(true),
            permissions: Set(permissions),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        from_model(model)
    }
}

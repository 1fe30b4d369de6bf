use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::saved_view,
    models::ids,
    types::{FilterClause, SortSpec, TicketListShape},
};

pub const TICKET_MODEL_NAME: &str = "Ticket";

const PAYLOAD_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SavedViewError {
    /// The stored payload no longer decodes against the current shape
    /// vocabulary, typically because a field it names was renamed or
    /// removed. The view is unusable and gets discarded.
    #[error("saved view payload is stale: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Versioned JSON document stored per view. Decoding is strict: an
/// unrecognized filter field, op or sort key fails the whole payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPayload {
    pub version: u32,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page_size() -> u64 {
    25
}

impl StoredPayload {
    pub fn from_shape(shape: &TicketListShape) -> Self {
        StoredPayload {
            version: PAYLOAD_VERSION,
            filters: shape.filters.clone(),
            sorts: shape.sorts.clone(),
            search: shape.search.clone(),
            page_size: shape.page_size,
        }
    }

    pub fn into_shape(self) -> TicketListShape {
        TicketListShape {
            filters: self.filters,
            sorts: self.sorts,
            search: self.search,
            page_size: self.page_size,
        }
        .clamped()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub model_name: String,
    pub name: String,
    pub shape: TicketListShape,
    pub is_default: bool,
}

fn decode_payload(raw: &serde_json::Value) -> Result<StoredPayload, SavedViewError> {
    let payload: StoredPayload = serde_json::from_value(raw.clone())
        .map_err(|e| SavedViewError::Corrupt(e.to_string()))?;
    if payload.version != PAYLOAD_VERSION {
        return Err(SavedViewError::Corrupt(format!(
            "unsupported payload version {}",
            payload.version
        )));
    }
    Ok(payload)
}

async fn from_model<C: ConnectionTrait>(
    db: &C,
    model: saved_view::Model,
) -> Result<SavedView, SavedViewError> {
    let user_id = ids::user_uuid_by_id(db, model.user_id)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
    let payload = decode_payload(&model.payload)?;
    Ok(SavedView {
        id: model.uuid,
        user_id,
        model_name: model.model_name,
        name: model.name,
        shape: payload.into_shape(),
        is_default: model.is_default,
    })
}

impl SavedView {
    /// Creates or replaces the view keyed by (user, model, name).
    pub async fn upsert<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        model_name: &str,
        name: &str,
        shape: &TicketListShape,
    ) -> Result<Self, SavedViewError> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let payload = serde_json::to_value(StoredPayload::from_shape(shape))
            .map_err(|e| DbErr::Custom(e.to_string()))?;

        let existing = saved_view::Entity::find()
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .filter(saved_view::Column::Name.eq(name))
            .one(db)
            .await?;

        let model = match existing {
            Some(record) => {
                let mut active: saved_view::ActiveModel = record.into();
                active.payload = Set(payload);
                active.updated_at = Set(Utc::now().into());
                active.update(db).await?
            }
            None => {
                let now = Utc::now();
                let active = saved_view::ActiveModel {
                    uuid: Set(Uuid::new_v4()),
                    user_id: Set(user_row_id),
                    model_name: Set(model_name.to_string()),
                    name: Set(name.to_string()),
                    payload: Set(payload),
                    is_default: Set(false),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                    ..Default::default()
                };
                active.insert(db).await?
            }
        };
        from_model(db, model).await
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        model_name: &str,
        name: &str,
    ) -> Result<Option<Self>, SavedViewError> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(None),
        };
        let record = saved_view::Entity::find()
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .filter(saved_view::Column::Name.eq(name))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_default<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        model_name: &str,
    ) -> Result<Option<Self>, SavedViewError> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(None),
        };
        let record = saved_view::Entity::find()
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .filter(saved_view::Column::IsDefault.eq(true))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Lists a user's views for one model without decoding payloads, so a
    /// single stale view cannot hide the rest.
    pub async fn list_names<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        model_name: &str,
    ) -> Result<Vec<(String, bool)>, DbErr> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let models = saved_view::Entity::find()
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .order_by_asc(saved_view::Column::Name)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| (model.name, model.is_default))
            .collect())
    }

    /// Marks one view as the user's default for a model, clearing any
    /// previous default.
    pub async fn set_default<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        model_name: &str,
        name: &str,
    ) -> Result<bool, DbErr> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(false),
        };
        saved_view::Entity::update_many()
            .col_expr(saved_view::Column::IsDefault, Expr::value(false))
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .exec(db)
            .await?;
        let result = saved_view::Entity::update_many()
            .col_expr(saved_view::Column::IsDefault, Expr::value(true))
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .filter(saved_view::Column::Name.eq(name))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn delete_by_name<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        model_name: &str,
        name: &str,
    ) -> Result<u64, DbErr> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(0),
        };
        let result = saved_view::Entity::delete_many()
            .filter(saved_view::Column::UserId.eq(user_row_id))
            .filter(saved_view::Column::ModelName.eq(model_name))
            .filter(saved_view::Column::Name.eq(name))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{CreateUser, User};
    use crate::types::{FilterField, FilterOp, SortDirection, SortField};
    use crate::DBService;

    async fn seed_user(db: &DBService) -> Uuid {
        let id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                username: "mjones".to_string(),
                email: "mjones@example.edu".to_string(),
                permissions: vec!["ticket.view".to_string()],
            },
            id,
        )
        .await
        .unwrap();
        id
    }

    fn sample_shape() -> TicketListShape {
        TicketListShape {
            filters: vec![FilterClause {
                field: FilterField::IsResolved,
                op: FilterOp::Eq,
                value: serde_json::json!(false),
            }],
            sorts: vec![SortSpec {
                field: SortField::Urgency,
                direction: SortDirection::Desc,
            }],
            search: None,
            page_size: 50,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_payload_for_same_name() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db).await;

        SavedView::upsert(&db.pool, user_id, TICKET_MODEL_NAME, "mine", &sample_shape())
            .await
            .unwrap();
        let mut revised = sample_shape();
        revised.page_size = 10;
        SavedView::upsert(&db.pool, user_id, TICKET_MODEL_NAME, "mine", &revised)
            .await
            .unwrap();

        let names = SavedView::list_names(&db.pool, user_id, TICKET_MODEL_NAME)
            .await
            .unwrap();
        assert_eq!(names.len(), 1);

        let view = SavedView::find_by_name(&db.pool, user_id, TICKET_MODEL_NAME, "mine")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.shape.page_size, 10);
        assert_eq!(view.shape.sorts[0].field, SortField::Urgency);
    }

    #[tokio::test]
    async fn default_flag_moves_between_views() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        SavedView::upsert(&db.pool, user_id, TICKET_MODEL_NAME, "a", &sample_shape())
            .await
            .unwrap();
        SavedView::upsert(&db.pool, user_id, TICKET_MODEL_NAME, "b", &sample_shape())
            .await
            .unwrap();

        assert!(SavedView::set_default(&db.pool, user_id, TICKET_MODEL_NAME, "a")
            .await
            .unwrap());
        assert!(SavedView::set_default(&db.pool, user_id, TICKET_MODEL_NAME, "b")
            .await
            .unwrap());

        let default = SavedView::find_default(&db.pool, user_id, TICKET_MODEL_NAME)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(default.name, "b");
    }

    #[tokio::test]
    async fn stale_payload_surfaces_as_corrupt() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = seed_user(&db).await;
        let view = SavedView::upsert(&db.pool, user_id, TICKET_MODEL_NAME, "old", &sample_shape())
            .await
            .unwrap();

        // Simulate a payload written before a field was renamed away.
        let stale = serde_json::json!({
            "version": 1,
            "filters": [{"field": "assigned_group", "op": "eq", "value": 3}],
            "sorts": [],
            "search": null,
            "page_size": 25
        });
        saved_view::Entity::update_many()
            .col_expr(saved_view::Column::Payload, Expr::value(stale))
            .filter(saved_view::Column::Uuid.eq(view.id))
            .exec(&db.pool)
            .await
            .unwrap();

        let err = SavedView::find_by_name(&db.pool, user_id, TICKET_MODEL_NAME, "old")
            .await
            .unwrap_err();
        assert!(matches!(err, SavedViewError::Corrupt(_)));

        // Name listing still works; only decoding fails.
        let names = SavedView::list_names(&db.pool, user_id, TICKET_MODEL_NAME)
            .await
            .unwrap();
        assert_eq!(names.len(), 1);
    }
}

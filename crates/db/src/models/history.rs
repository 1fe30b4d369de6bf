use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::history, models::ids};

/// Append-only audit row. One row per changed field per save; creations log
/// every populated field with no old value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub id: Uuid,
    pub when: DateTime<Utc>,
    pub model_name: String,
    pub object_id: Option<Uuid>,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub user_id: Option<Uuid>,
}

/// A single field transition computed by diffing the record before and
/// after a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: String,
}

impl FieldChange {
    pub fn created(field: impl Into<String>, new: impl Into<String>) -> Self {
        FieldChange {
            field: field.into(),
            old: None,
            new: new.into(),
        }
    }

    pub fn changed(
        field: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        FieldChange {
            field: field.into(),
            old: Some(old.into()),
            new: new.into(),
        }
    }
}

async fn from_model<C: ConnectionTrait>(db: &C, model: history::Model) -> Result<History, DbErr> {
    let user_id = match model.user_id {
        Some(id) => ids::user_uuid_by_id(db, id).await?,
        None => None,
    };
    Ok(History {
        id: model.uuid,
        when: model.when.into(),
        model_name: model.model_name,
        object_id: model.object_id,
        field_name: model.field_name,
        old_value: model.old_value,
        new_value: model.new_value,
        user_id,
    })
}

impl History {
    /// Writes one row per change, all stamped with the same instant. Runs on
    /// whatever connection the caller provides so it can join the save's
    /// transaction.
    pub async fn record_changes<C: ConnectionTrait>(
        db: &C,
        model_name: &str,
        object_id: Uuid,
        changes: &[FieldChange],
        acting_user: Option<Uuid>,
    ) -> Result<usize, DbErr> {
        let user_row_id = match acting_user {
            Some(id) => ids::user_id_by_uuid(db, id).await?,
            None => None,
        };
        let now = Utc::now();
        for change in changes {
            let active = history::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                when: Set(now.into()),
                model_name: Set(model_name.to_string()),
                object_id: Set(Some(object_id)),
                field_name: Set(change.field.clone()),
                old_value: Set(change.old.clone()),
                new_value: Set(change.new.clone()),
                user_id: Set(user_row_id),
                ..Default::default()
            };
            active.insert(db).await?;
        }
        Ok(changes.len())
    }

    /// Full trail for one object, newest first.
    pub async fn find_for_object<C: ConnectionTrait>(
        db: &C,
        model_name: &str,
        object_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let models = history::Entity::find()
            .filter(history::Column::ModelName.eq(model_name))
            .filter(history::Column::ObjectId.eq(object_id))
            .order_by_desc(history::Column::When)
            .order_by_desc(history::Column::Id)
            .all(db)
            .await?;
        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(from_model(db, model).await?);
        }
        Ok(entries)
    }

    pub async fn find_recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Self>, DbErr> {
        let models = history::Entity::find()
            .order_by_desc(history::Column::When)
            .order_by_desc(history::Column::Id)
            .limit(limit)
            .all(db)
            .await?;
        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(from_model(db, model).await?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn one_row_per_change_sharing_a_timestamp() {
        let db = DBService::new_in_memory().await.unwrap();
        let object_id = Uuid::new_v4();
        let changes = vec![
            FieldChange::changed("urgency", "3", "5"),
            FieldChange::changed("is_resolved", "false", "true"),
            FieldChange::created("resolution_notes", "rebooted the switch"),
        ];

        let written = History::record_changes(&db.pool, "Ticket", object_id, &changes, None)
            .await
            .unwrap();
        assert_eq!(written, 3);

        let trail = History::find_for_object(&db.pool, "Ticket", object_id)
            .await
            .unwrap();
        assert_eq!(trail.len(), 3);
        assert!(trail.iter().all(|entry| entry.when == trail[0].when));
        assert!(trail
            .iter()
            .any(|entry| entry.field_name == "resolution_notes" && entry.old_value.is_none()));
    }

    #[tokio::test]
    async fn trail_is_scoped_by_model_and_object() {
        let db = DBService::new_in_memory().await.unwrap();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        History::record_changes(
            &db.pool,
            "Ticket",
            first,
            &[FieldChange::created("short_description", "a")],
            None,
        )
        .await
        .unwrap();
        History::record_changes(
            &db.pool,
            "Ticket",
            second,
            &[FieldChange::created("short_description", "b")],
            None,
        )
        .await
        .unwrap();

        let trail = History::find_for_object(&db.pool, "Ticket", first)
            .await
            .unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].new_value, "a");
    }

    #[tokio::test]
    async fn empty_change_set_writes_nothing() {
        let db = DBService::new_in_memory().await.unwrap();
        let object_id = Uuid::new_v4();
        let written = History::record_changes(&db.pool, "Ticket", object_id, &[], None)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(History::find_recent(&db.pool, 10).await.unwrap().is_empty());
    }
}

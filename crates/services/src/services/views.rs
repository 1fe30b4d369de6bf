use std::collections::HashMap;
use std::sync::Mutex;

use db::{
    models::saved_view::{SavedView, SavedViewError, TICKET_MODEL_NAME},
    types::TicketListShape,
    DBService, DbErr,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ViewServiceError {
    #[error("Saved view not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type Result<T> = std::result::Result<T, ViewServiceError>;

/// One-shot holding area for a query shape a client just submitted, so the
/// follow-up list fetch can pick it up without the client resending it.
/// Entries are consumed on first read.
#[derive(Default)]
pub struct QueryStash {
    entries: Mutex<HashMap<Uuid, TicketListShape>>,
}

impl QueryStash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, user_id: Uuid, shape: TicketListShape) {
        self.entries.lock().unwrap().insert(user_id, shape);
    }

    pub fn take(&self, user_id: Uuid) -> Option<TicketListShape> {
        self.entries.lock().unwrap().remove(&user_id)
    }
}

/// Where a resolved list shape came from, surfaced to clients so they can
/// show which view is active.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ShapeSource {
    Stash,
    Submitted,
    NamedView(String),
    UserDefault(String),
    SystemDefault,
}

#[derive(Debug, Clone)]
pub struct ResolvedShape {
    pub shape: TicketListShape,
    pub source: ShapeSource,
}

#[derive(Clone, Default)]
pub struct ViewService;

impl ViewService {
    pub fn new() -> Self {
        Self
    }

    /// Resolution ladder for a list request: stashed shape, then a shape
    /// submitted inline, then an explicitly named view, then the user's
    /// default view, then the system default. A stored view that no longer
    /// decodes is discarded with a warning and the ladder continues.
    pub async fn resolve_shape(
        &self,
        db: &DBService,
        stash: &QueryStash,
        user_id: Uuid,
        submitted: Option<TicketListShape>,
        view_name: Option<&str>,
    ) -> Result<ResolvedShape> {
        if let Some(shape) = stash.take(user_id) {
            return Ok(ResolvedShape {
                shape: shape.clamped(),
                source: ShapeSource::Stash,
            });
        }

        if let Some(shape) = submitted {
            return Ok(ResolvedShape {
                shape: shape.clamped(),
                source: ShapeSource::Submitted,
            });
        }

        if let Some(name) = view_name {
            match SavedView::find_by_name(&db.pool, user_id, TICKET_MODEL_NAME, name).await {
                Ok(Some(view)) => {
                    return Ok(ResolvedShape {
                        shape: view.shape,
                        source: ShapeSource::NamedView(view.name),
                    });
                }
                Ok(None) => return Err(ViewServiceError::NotFound),
                Err(SavedViewError::Corrupt(reason)) => {
                    self.discard_stale(db, user_id, name, &reason).await?;
                }
                Err(SavedViewError::Database(err)) => return Err(err.into()),
            }
        }

        match SavedView::find_default(&db.pool, user_id, TICKET_MODEL_NAME).await {
            Ok(Some(view)) => {
                return Ok(ResolvedShape {
                    shape: view.shape,
                    source: ShapeSource::UserDefault(view.name),
                });
            }
            Ok(None) => {}
            Err(SavedViewError::Corrupt(reason)) => {
                // find_default only errors after loading the flagged row, so
                // listing names to locate it is safe.
                let names =
                    SavedView::list_names(&db.pool, user_id, TICKET_MODEL_NAME).await?;
                if let Some((name, _)) = names.iter().find(|(_, is_default)| *is_default) {
                    self.discard_stale(db, user_id, name, &reason).await?;
                }
            }
            Err(SavedViewError::Database(err)) => return Err(err.into()),
        }

        Ok(ResolvedShape {
            shape: TicketListShape::default(),
            source: ShapeSource::SystemDefault,
        })
    }

    async fn discard_stale(
        &self,
        db: &DBService,
        user_id: Uuid,
        name: &str,
        reason: &str,
    ) -> Result<()> {
        tracing::warn!(
            user_id = %user_id,
            view = name,
            "Discarding stale saved view: {}",
            reason
        );
        SavedView::delete_by_name(&db.pool, user_id, TICKET_MODEL_NAME, name).await?;
        Ok(())
    }

    /// Direct retrieval of one view. A stored payload that no longer
    /// decodes is discarded here too, reported as missing.
    pub async fn get(&self, db: &DBService, user_id: Uuid, name: &str) -> Result<SavedView> {
        match SavedView::find_by_name(&db.pool, user_id, TICKET_MODEL_NAME, name).await {
            Ok(Some(view)) => Ok(view),
            Ok(None) => Err(ViewServiceError::NotFound),
            Err(SavedViewError::Corrupt(reason)) => {
                self.discard_stale(db, user_id, name, &reason).await?;
                Err(ViewServiceError::NotFound)
            }
            Err(SavedViewError::Database(err)) => Err(err.into()),
        }
    }

    pub async fn save(
        &self,
        db: &DBService,
        user_id: Uuid,
        name: &str,
        shape: &TicketListShape,
    ) -> Result<SavedView> {
        match SavedView::upsert(&db.pool, user_id, TICKET_MODEL_NAME, name, shape).await {
            Ok(view) => Ok(view),
            // The freshly written payload always decodes; Corrupt here
            // means the row predated this save and raced us.
            Err(SavedViewError::Corrupt(_)) => Err(ViewServiceError::NotFound),
            Err(SavedViewError::Database(err)) => Err(err.into()),
        }
    }

    pub async fn list(&self, db: &DBService, user_id: Uuid) -> Result<Vec<(String, bool)>> {
        Ok(SavedView::list_names(&db.pool, user_id, TICKET_MODEL_NAME).await?)
    }

    pub async fn set_default(&self, db: &DBService, user_id: Uuid, name: &str) -> Result<()> {
        if SavedView::set_default(&db.pool, user_id, TICKET_MODEL_NAME, name).await? {
            Ok(())
        } else {
            Err(ViewServiceError::NotFound)
        }
    }

    pub async fn delete(&self, db: &DBService, user_id: Uuid, name: &str) -> Result<()> {
        if SavedView::delete_by_name(&db.pool, user_id, TICKET_MODEL_NAME, name).await? > 0 {
            Ok(())
        } else {
            Err(ViewServiceError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use db::entities::saved_view;
    use db::models::user::{CreateUser, User};
    use db::types::{SortDirection, SortField, SortSpec};
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    use super::*;

    async fn seed_user(db: &DBService) -> Uuid {
        User::create(
            &db.pool,
            &CreateUser {
                username: "viewer".to_string(),
                email: "viewer@example.edu".to_string(),
                permissions: vec!["ticket.view".to_string()],
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
        .id
    }

    fn custom_shape() -> TicketListShape {
        TicketListShape {
            filters: vec![],
            sorts: vec![SortSpec {
                field: SortField::Urgency,
                direction: SortDirection::Asc,
            }],
            search: None,
            page_size: 10,
        }
    }

    #[tokio::test]
    async fn stash_wins_and_is_consumed() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = ViewService::new();
        let stash = QueryStash::new();
        let user_id = seed_user(&db).await;

        stash.put(user_id, custom_shape());
        let first = service
            .resolve_shape(&db, &stash, user_id, None, None)
            .await
            .unwrap();
        assert_eq!(first.source, ShapeSource::Stash);
        assert_eq!(first.shape.page_size, 10);

        let second = service
            .resolve_shape(&db, &stash, user_id, None, None)
            .await
            .unwrap();
        assert_eq!(second.source, ShapeSource::SystemDefault);
    }

    #[tokio::test]
    async fn named_view_beats_user_default() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = ViewService::new();
        let stash = QueryStash::new();
        let user_id = seed_user(&db).await;

        service.save(&db, user_id, "mine", &custom_shape()).await.unwrap();
        service
            .save(&db, user_id, "other", &TicketListShape::default())
            .await
            .unwrap();
        service.set_default(&db, user_id, "other").await.unwrap();

        let resolved = service
            .resolve_shape(&db, &stash, user_id, None, Some("mine"))
            .await
            .unwrap();
        assert_eq!(resolved.source, ShapeSource::NamedView("mine".to_string()));

        let fallback = service
            .resolve_shape(&db, &stash, user_id, None, None)
            .await
            .unwrap();
        assert_eq!(
            fallback.source,
            ShapeSource::UserDefault("other".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_named_view_is_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = ViewService::new();
        let stash = QueryStash::new();
        let user_id = seed_user(&db).await;

        let err = service
            .resolve_shape(&db, &stash, user_id, None, Some("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewServiceError::NotFound));
    }

    #[tokio::test]
    async fn stale_default_view_is_discarded_and_system_default_used() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = ViewService::new();
        let stash = QueryStash::new();
        let user_id = seed_user(&db).await;

        let view = service.save(&db, user_id, "old", &custom_shape()).await.unwrap();
        service.set_default(&db, user_id, "old").await.unwrap();

        let stale = serde_json::json!({
            "version": 1,
            "filters": [{"field": "priority_band", "op": "eq", "value": 2}],
            "sorts": []
        });
        saved_view::Entity::update_many()
            .col_expr(saved_view::Column::Payload, Expr::value(stale))
            .filter(saved_view::Column::Uuid.eq(view.id))
            .exec(&db.pool)
            .await
            .unwrap();

        let resolved = service
            .resolve_shape(&db, &stash, user_id, None, None)
            .await
            .unwrap();
        assert_eq!(resolved.source, ShapeSource::SystemDefault);

        // The unusable view is gone.
        assert!(service.list(&db, user_id).await.unwrap().is_empty());
    }
}

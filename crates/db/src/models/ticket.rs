use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveModelTrait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::types::{
    FilterClause, FilterField, FilterOp, SortDirection, SortField, SortSpec, TicketListShape,
    Urgency,
};

use crate::{
    entities::{item, technician, ticket},
    models::ids,
};

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("filter value for '{field}' is invalid")]
    InvalidFilterValue { field: FilterField },
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub short_description: String,
    pub long_description: Option<String>,
    pub urgency: Urgency,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub is_resolved: bool,
    pub resolution_notes: Option<String>,
    pub recipient_emails: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cleaned values for a new ticket, as produced by the validation layer.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub short_description: String,
    pub long_description: Option<String>,
    pub urgency: Urgency,
    pub technician_id: Option<Uuid>,
    pub recipient_emails: Option<String>,
    pub submitted_by: Option<Uuid>,
}

/// Cleaned full-replacement values for an existing ticket. Tickets are only
/// ever mutated through a whole form submission, never patched field-wise.
#[derive(Debug, Clone)]
pub struct UpdateTicket {
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub short_description: String,
    pub long_description: Option<String>,
    pub urgency: Urgency,
    pub technician_id: Option<Uuid>,
    pub recipient_emails: Option<String>,
    pub is_resolved: bool,
    pub resolution_notes: Option<String>,
}

async fn from_model<C: ConnectionTrait>(db: &C, model: ticket::Model) -> Result<Ticket, DbErr> {
    let item_id = match model.item_id {
        Some(id) => ids::item_uuid_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Item not found".to_string()))
            .map(Some)?,
        None => None,
    };
    let location_id = match model.location_id {
        Some(id) => ids::location_uuid_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Location not found".to_string()))
            .map(Some)?,
        None => None,
    };
    let submitted_by = match model.submitted_by_id {
        Some(id) => ids::user_uuid_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))
            .map(Some)?,
        None => None,
    };
    let technician_id = match model.technician_id {
        Some(id) => ids::technician_uuid_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Technician not found".to_string()))
            .map(Some)?,
        None => None,
    };

    Ok(Ticket {
        id: model.uuid,
        item_id,
        location_id,
        short_description: model.short_description,
        long_description: model.long_description,
        urgency: model.urgency,
        submitted_at: model.submitted_at.into(),
        submitted_by,
        technician_id,
        is_resolved: model.is_resolved,
        resolution_notes: model.resolution_notes,
        recipient_emails: model.recipient_emails,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    })
}

fn ref_column(field: FilterField) -> ticket::Column {
    match field {
        FilterField::Technician => ticket::Column::TechnicianId,
        FilterField::Item => ticket::Column::ItemId,
        FilterField::Location => ticket::Column::LocationId,
        FilterField::SubmittedBy => ticket::Column::SubmittedById,
        // Callers only pass reference fields here.
        FilterField::Urgency | FilterField::IsResolved => unreachable!(),
    }
}

async fn ref_row_id<C: ConnectionTrait>(
    db: &C,
    field: FilterField,
    uuid: Uuid,
) -> Result<Option<i64>, DbErr> {
    match field {
        FilterField::Technician => ids::technician_id_by_uuid(db, uuid).await,
        FilterField::Item => ids::item_id_by_uuid(db, uuid).await,
        FilterField::Location => ids::location_id_by_uuid(db, uuid).await,
        FilterField::SubmittedBy => ids::user_id_by_uuid(db, uuid).await,
        FilterField::Urgency | FilterField::IsResolved => Ok(None),
    }
}

fn parse_uuid(value: &serde_json::Value) -> Option<Uuid> {
    value.as_str().and_then(|raw| raw.parse().ok())
}

async fn clause_condition<C: ConnectionTrait>(
    db: &C,
    clause: &FilterClause,
) -> Result<sea_orm::sea_query::SimpleExpr, ShapeError> {
    let invalid = || ShapeError::InvalidFilterValue {
        field: clause.field,
    };

    match clause.field {
        FilterField::Urgency => match clause.op {
            FilterOp::Eq => {
                let level = clause.value.as_i64().ok_or_else(invalid)?;
                let urgency =
                    Urgency::try_from(i16::try_from(level).map_err(|_| invalid())?)
                        .map_err(|_| invalid())?;
                Ok(ticket::Column::Urgency.eq(urgency))
            }
            FilterOp::In => {
                let values = clause.value.as_array().ok_or_else(invalid)?;
                let mut urgencies = Vec::with_capacity(values.len());
                for value in values {
                    let level = value.as_i64().ok_or_else(invalid)?;
                    urgencies.push(
                        Urgency::try_from(i16::try_from(level).map_err(|_| invalid())?)
                            .map_err(|_| invalid())?,
                    );
                }
                Ok(ticket::Column::Urgency.is_in(urgencies))
            }
            FilterOp::IsNull => Err(invalid()),
        },
        FilterField::IsResolved => match clause.op {
            FilterOp::Eq => {
                let resolved = clause.value.as_bool().ok_or_else(invalid)?;
                Ok(ticket::Column::IsResolved.eq(resolved))
            }
            FilterOp::In | FilterOp::IsNull => Err(invalid()),
        },
        FilterField::Technician
        | FilterField::Item
        | FilterField::Location
        | FilterField::SubmittedBy => {
            let column = ref_column(clause.field);
            match clause.op {
                FilterOp::Eq => {
                    let uuid = parse_uuid(&clause.value).ok_or_else(invalid)?;
                    match ref_row_id(db, clause.field, uuid).await? {
                        Some(row_id) => Ok(column.eq(row_id)),
                        // Filter for a row that no longer exists matches nothing.
                        None => Ok(column.eq(-1i64)),
                    }
                }
                FilterOp::In => {
                    let values = clause.value.as_array().ok_or_else(invalid)?;
                    let mut row_ids = Vec::with_capacity(values.len());
                    for value in values {
                        let uuid = parse_uuid(value).ok_or_else(invalid)?;
                        if let Some(row_id) = ref_row_id(db, clause.field, uuid).await? {
                            row_ids.push(row_id);
                        }
                    }
                    if row_ids.is_empty() {
                        Ok(column.eq(-1i64))
                    } else {
                        Ok(column.is_in(row_ids))
                    }
                }
                FilterOp::IsNull => Ok(column.is_null()),
            }
        }
    }
}

/// Free-text search across the ticket's own text fields plus the names of
/// related items and technicians.
fn search_condition(term: &str) -> Condition {
    // Scoped so ExprTrait::max does not shadow Ord::max elsewhere.
    use sea_orm::sea_query::ExprTrait;

    let pattern = format!("%{term}%");

    let item_sub = Query::select()
        .column(item::Column::Id)
        .from(item::Entity)
        .and_where(Expr::col(item::Column::Name).like(pattern.clone()))
        .to_owned();
    let technician_sub = Query::select()
        .column(technician::Column::Id)
        .from(technician::Entity)
        .and_where(Expr::col(technician::Column::Name).like(pattern.clone()))
        .to_owned();

    Condition::any()
        .add(ticket::Column::ShortDescription.contains(term))
        .add(ticket::Column::LongDescription.contains(term))
        .add(ticket::Column::ResolutionNotes.contains(term))
        .add(ticket::Column::ItemId.in_subquery(item_sub))
        .add(ticket::Column::TechnicianId.in_subquery(technician_sub))
}

fn sort_column(field: SortField) -> ticket::Column {
    match field {
        SortField::SubmittedAt => ticket::Column::SubmittedAt,
        SortField::Urgency => ticket::Column::Urgency,
        SortField::ShortDescription => ticket::Column::ShortDescription,
        SortField::Item => ticket::Column::ItemId,
    }
}

impl Ticket {
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = ticket::Entity::find()
            .filter(ticket::Column::Uuid.eq(id))
            .filter(ticket::Column::IsDeleted.eq(false))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Applies a resolved list shape. Soft-deleted tickets are always
    /// excluded. Pages are 1-based.
    pub async fn list<C: ConnectionTrait>(
        db: &C,
        shape: &TicketListShape,
        page: u64,
    ) -> Result<Vec<Self>, ShapeError> {
        let shape = shape.clone().clamped();

        let mut query = ticket::Entity::find().filter(ticket::Column::IsDeleted.eq(false));
        for clause in &shape.filters {
            query = query.filter(clause_condition(db, clause).await?);
        }
        if let Some(term) = &shape.search {
            query = query.filter(search_condition(term));
        }
        for sort in &shape.sorts {
            let order = match sort.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query = query.order_by(sort_column(sort.field), order);
        }
        // Deterministic tiebreak for stable pagination.
        query = query.order_by_desc(ticket::Column::Id);

        let page = page.max(1);
        let models = query
            .offset((page - 1) * shape.page_size)
            .limit(shape.page_size)
            .all(db)
            .await?;

        let mut tickets = Vec::with_capacity(models.len());
        for model in models {
            tickets.push(from_model(db, model).await?);
        }
        Ok(tickets)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTicket,
        ticket_id: Uuid,
    ) -> Result<Self, DbErr> {
        let item_row_id = match data.item_id {
            Some(id) => ids::item_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Item not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let location_row_id = match data.location_id {
            Some(id) => ids::location_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Location not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let technician_row_id = match data.technician_id {
            Some(id) => ids::technician_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Technician not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let submitted_by_row_id = match data.submitted_by {
            Some(id) => ids::user_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let now = Utc::now();
        let active = ticket::ActiveModel {
            uuid: Set(ticket_id),
            item_id: Set(item_row_id),
            location_id: Set(location_row_id),
            short_description: Set(data.short_description.clone()),
            long_description: Set(data.long_description.clone()),
            urgency: Set(data.urgency),
            submitted_at: Set(now.into()),
            submitted_by_id: Set(submitted_by_row_id),
            technician_id: Set(technician_row_id),
            is_resolved: Set(false),
            resolution_notes: Set(None),
            recipient_emails: Set(data.recipient_emails.clone()),
            is_deleted: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTicket,
    ) -> Result<Self, DbErr> {
        let record = ticket::Entity::find()
            .filter(ticket::Column::Uuid.eq(id))
            .filter(ticket::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Ticket not found".to_string()))?;

        let item_row_id = match data.item_id {
            Some(id) => ids::item_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Item not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let location_row_id = match data.location_id {
            Some(id) => ids::location_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Location not found".to_string()))
                .map(Some)?,
            None => None,
        };
        let technician_row_id = match data.technician_id {
            Some(id) => ids::technician_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("Technician not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let mut active: ticket::ActiveModel = record.into();
        active.item_id = Set(item_row_id);
        active.location_id = Set(location_row_id);
        active.short_description = Set(data.short_description.clone());
        active.long_description = Set(data.long_description.clone());
        active.urgency = Set(data.urgency);
        active.technician_id = Set(technician_row_id);
        active.recipient_emails = Set(data.recipient_emails.clone());
        active.is_resolved = Set(data.is_resolved);
        active.resolution_notes = Set(data.resolution_notes.clone());
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        from_model(db, updated).await
    }

    pub async fn set_recipient_emails<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        recipients: &str,
    ) -> Result<(), DbErr> {
        let record = ticket::Entity::find()
            .filter(ticket::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Ticket not found".to_string()))?;
        let mut active: ticket::ActiveModel = record.into();
        active.recipient_emails = Set(Some(recipients.to_string()));
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }

    /// Tickets are never hard-deleted through the API; this flags the row
    /// and the list/detail queries skip it from then on.
    pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = ticket::Entity::update_many()
            .col_expr(ticket::Column::IsDeleted, Expr::value(true))
            .col_expr(
                ticket::Column::UpdatedAt,
                Expr::value(sea_orm::Value::from(Utc::now())),
            )
            .filter(ticket::Column::Uuid.eq(id))
            .filter(ticket::Column::IsDeleted.eq(false))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::{CreateItem, Item};
    use crate::DBService;

    fn minimal_create(short_description: &str) -> CreateTicket {
        CreateTicket {
            item_id: None,
            location_id: None,
            short_description: short_description.to_string(),
            long_description: None,
            urgency: Urgency::Important,
            technician_id: None,
            recipient_emails: None,
            submitted_by: None,
        }
    }

    #[tokio::test]
    async fn create_without_technician_succeeds() {
        let db = DBService::new_in_memory().await.unwrap();
        let ticket = Ticket::create(&db.pool, &minimal_create("printer jam"), Uuid::new_v4())
            .await
            .unwrap();
        assert!(ticket.technician_id.is_none());
        assert!(!ticket.is_resolved);
        assert_eq!(ticket.urgency, Urgency::Important);
    }

    #[tokio::test]
    async fn deleting_item_nulls_ticket_reference() {
        let db = DBService::new_in_memory().await.unwrap();
        let item_id = Uuid::new_v4();
        Item::create(
            &db.pool,
            &CreateItem {
                name: "projector".to_string(),
                serial_number: None,
                location_id: None,
                mmodel_id: None,
            },
            item_id,
        )
        .await
        .unwrap();

        let mut data = minimal_create("no signal");
        data.item_id = Some(item_id);
        let ticket = Ticket::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();
        assert_eq!(ticket.item_id, Some(item_id));

        assert_eq!(Item::delete(&db.pool, item_id).await.unwrap(), 1);

        let reloaded = Ticket::find_by_id(&db.pool, ticket.id)
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.item_id.is_none());
    }

    #[tokio::test]
    async fn default_shape_excludes_resolved_tickets() {
        let db = DBService::new_in_memory().await.unwrap();
        let open = Ticket::create(&db.pool, &minimal_create("open"), Uuid::new_v4())
            .await
            .unwrap();
        let other = Ticket::create(&db.pool, &minimal_create("resolved"), Uuid::new_v4())
            .await
            .unwrap();
        Ticket::update(
            &db.pool,
            other.id,
            &UpdateTicket {
                item_id: None,
                location_id: None,
                short_description: "resolved".to_string(),
                long_description: None,
                urgency: Urgency::Important,
                technician_id: None,
                recipient_emails: None,
                is_resolved: true,
                resolution_notes: Some("replaced cable".to_string()),
            },
        )
        .await
        .unwrap();

        let listed = Ticket::list(&db.pool, &TicketListShape::default(), 1)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
    }

    #[tokio::test]
    async fn soft_deleted_tickets_disappear_from_list_and_detail() {
        let db = DBService::new_in_memory().await.unwrap();
        let ticket = Ticket::create(&db.pool, &minimal_create("gone soon"), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(Ticket::soft_delete(&db.pool, ticket.id).await.unwrap(), 1);
        // Second delete is a no-op.
        assert_eq!(Ticket::soft_delete(&db.pool, ticket.id).await.unwrap(), 0);

        assert!(Ticket::find_by_id(&db.pool, ticket.id).await.unwrap().is_none());
        let listed = Ticket::list(&db.pool, &TicketListShape::default(), 1)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn search_matches_related_item_name() {
        let db = DBService::new_in_memory().await.unwrap();
        let item_id = Uuid::new_v4();
        Item::create(
            &db.pool,
            &CreateItem {
                name: "Smartboard 7000".to_string(),
                serial_number: None,
                location_id: None,
                mmodel_id: None,
            },
            item_id,
        )
        .await
        .unwrap();

        let mut with_item = minimal_create("screen flickers");
        with_item.item_id = Some(item_id);
        let matching = Ticket::create(&db.pool, &with_item, Uuid::new_v4())
            .await
            .unwrap();
        Ticket::create(&db.pool, &minimal_create("unrelated"), Uuid::new_v4())
            .await
            .unwrap();

        let shape = TicketListShape {
            filters: vec![],
            sorts: vec![],
            search: Some("Smartboard".to_string()),
            page_size: 25,
        };
        let listed = Ticket::list(&db.pool, &shape, 1).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, matching.id);
    }

    #[tokio::test]
    async fn invalid_filter_value_is_a_shape_error() {
        let db = DBService::new_in_memory().await.unwrap();
        let shape = TicketListShape {
            filters: vec![FilterClause {
                field: FilterField::Urgency,
                op: FilterOp::Eq,
                value: serde_json::json!("very urgent"),
            }],
            sorts: vec![],
            search: None,
            page_size: 25,
        };
        let err = Ticket::list(&db.pool, &shape, 1).await.unwrap_err();
        assert!(matches!(
            err,
            ShapeError::InvalidFilterValue {
                field: FilterField::Urgency
            }
        ));
    }
}

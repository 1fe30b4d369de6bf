use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::ticket_note, models::ids};

/// Dated work-log entry attached to a ticket. Notes ride along with the
/// ticket form: one submission can create, edit and remove several at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketNote {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub when: NaiveDate,
    pub text: String,
    pub submitted_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTicketNote {
    pub when: NaiveDate,
    pub text: String,
    pub submitted_by: Option<Uuid>,
}

async fn from_model<C: ConnectionTrait>(
    db: &C,
    model: ticket_note::Model,
) -> Result<TicketNote, DbErr> {
    let ticket_id = ids::ticket_uuid_by_id(db, model.ticket_id)
        .await?
        .ok_or(DbErr::RecordNotFound("Ticket not found".to_string()))?;
    let submitted_by = match model.submitted_by_id {
        Some(id) => ids::user_uuid_by_id(db, id).await?,
        None => None,
    };
    Ok(TicketNote {
        id: model.uuid,
        ticket_id,
        when: model.when,
        text: model.text,
        submitted_by,
    })
}

impl TicketNote {
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = ticket_note::Entity::find()
            .filter(ticket_note::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Newest effective date first; insertion order breaks ties.
    pub async fn find_for_ticket<C: ConnectionTrait>(
        db: &C,
        ticket_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let ticket_row_id = match ids::ticket_id_by_uuid(db, ticket_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let models = ticket_note::Entity::find()
            .filter(ticket_note::Column::TicketId.eq(ticket_row_id))
            .order_by_desc(ticket_note::Column::When)
            .order_by_desc(ticket_note::Column::Id)
            .all(db)
            .await?;
        let mut notes = Vec::with_capacity(models.len());
        for model in models {
            notes.push(from_model(db, model).await?);
        }
        Ok(notes)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        ticket_id: Uuid,
        data: &CreateTicketNote,
        note_id: Uuid,
    ) -> Result<Self, DbErr> {
        let ticket_row_id = ids::ticket_id_by_uuid(db, ticket_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Ticket not found".to_string()))?;
        let submitted_by_row_id = match data.submitted_by {
            Some(id) => ids::user_id_by_uuid(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                .map(Some)?,
            None => None,
        };

        let now = Utc::now();
        let active = ticket_note::ActiveModel {
            uuid: Set(note_id),
            ticket_id: Set(ticket_row_id),
            when: Set(data.when),
            text: Set(data.text.clone()),
            submitted_by_id: Set(submitted_by_row_id),
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
        when: NaiveDate,
        text: &str,
    ) -> Result<Self, DbErr> {
        let record = ticket_note::Entity::find()
            .filter(ticket_note::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("TicketNote not found".to_string()))?;
        let mut active: ticket_note::ActiveModel = record.into();
        active.when = Set(when);
        active.text = Set(text.to_string());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        from_model(db, updated).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = ticket_note::Entity::delete_many()
            .filter(ticket_note::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{CreateTicket, Ticket};
    use crate::types::Urgency;
    use crate::DBService;

    async fn seed_ticket(db: &DBService) -> Ticket {
        Ticket::create(
            &db.pool,
            &CreateTicket {
                item_id: None,
                location_id: None,
                short_description: "laptop will not boot".to_string(),
                long_description: None,
                urgency: Urgency::Important,
                technician_id: None,
                recipient_emails: None,
                submitted_by: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn notes_list_newest_first_by_effective_date() {
        let db = DBService::new_in_memory().await.unwrap();
        let ticket = seed_ticket(&db).await;

        let older = CreateTicketNote {
            when: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            text: "ordered replacement drive".to_string(),
            submitted_by: None,
        };
        let newer = CreateTicketNote {
            when: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            text: "drive installed".to_string(),
            submitted_by: None,
        };
        TicketNote::create(&db.pool, ticket.id, &older, Uuid::new_v4())
            .await
            .unwrap();
        TicketNote::create(&db.pool, ticket.id, &newer, Uuid::new_v4())
            .await
            .unwrap();

        let notes = TicketNote::find_for_ticket(&db.pool, ticket.id)
            .await
            .unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "drive installed");
        assert_eq!(notes[1].text, "ordered replacement drive");
    }

    #[tokio::test]
    async fn update_and_delete_round_out_the_lifecycle() {
        let db = DBService::new_in_memory().await.unwrap();
        let ticket = seed_ticket(&db).await;
        let note = TicketNote::create(
            &db.pool,
            ticket.id,
            &CreateTicketNote {
                when: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                text: "first draft".to_string(),
                submitted_by: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let updated = TicketNote::update(
            &db.pool,
            note.id,
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
            "second draft",
        )
        .await
        .unwrap();
        assert_eq!(updated.text, "second draft");

        assert_eq!(TicketNote::delete(&db.pool, note.id).await.unwrap(), 1);
        assert!(TicketNote::find_by_id(&db.pool, note.id)
            .await
            .unwrap()
            .is_none());
    }
}

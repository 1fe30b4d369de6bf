use chrono::NaiveDate;
use db::{
    models::{
        history::{FieldChange, History},
        ids,
        item::Item,
        technician::Technician,
        ticket::{CreateTicket, ShapeError, Ticket, UpdateTicket},
        ticket_note::{CreateTicketNote, TicketNote},
        user::User,
    },
    types::TicketListShape,
    DBService, DbErr, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use super::{
    forms::{CleanedTicket, FieldErrors, NoteOp, TicketForm},
    notify::NotifyContext,
};

pub const TICKET_MODEL: &str = "Ticket";
pub const TICKET_NOTE_MODEL: &str = "TicketNote";

#[derive(Debug, Error)]
pub enum TicketServiceError {
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("Ticket not found")]
    NotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<FieldErrors> for TicketServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<ShapeError> for TicketServiceError {
    fn from(err: ShapeError) -> Self {
        match err {
            ShapeError::InvalidFilterValue { field } => {
                let mut errors = FieldErrors::default();
                errors.push("filters", format!("invalid value for '{field}'"));
                Self::Validation(errors)
            }
            ShapeError::Database(err) => Self::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, TicketServiceError>;

/// Result of a committed save, including what the dispatcher should tell
/// people about it.
#[derive(Debug)]
pub struct TicketSaved {
    pub ticket: Ticket,
    pub notes: Vec<TicketNote>,
    pub created: bool,
    pub history_written: usize,
    pub notification: NotifyContext,
}

#[derive(Debug)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub notes: Vec<TicketNote>,
}

fn field_snapshot(ticket: &Ticket) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("item", ticket.item_id.map(|id| id.to_string())),
        ("location", ticket.location_id.map(|id| id.to_string())),
        (
            "short_description",
            Some(ticket.short_description.clone()),
        ),
        ("long_description", ticket.long_description.clone()),
        ("urgency", Some(ticket.urgency.level().to_string())),
        ("technician", ticket.technician_id.map(|id| id.to_string())),
        ("is_resolved", Some(ticket.is_resolved.to_string())),
        ("resolution_notes", ticket.resolution_notes.clone()),
        ("recipient_emails", ticket.recipient_emails.clone()),
    ]
}

/// One change per populated field on creation, one per differing field on
/// update. A cleared field shows up with an empty new value.
fn ticket_changes(before: Option<&Ticket>, after: &Ticket) -> Vec<FieldChange> {
    match before {
        None => field_snapshot(after)
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| FieldChange::created(field, v)))
            .collect(),
        Some(before) => {
            let old = field_snapshot(before);
            field_snapshot(after)
                .into_iter()
                .zip(old)
                .filter(|(new, old)| new.1 != old.1)
                .map(|((field, new), (_, old))| FieldChange {
                    field: field.to_string(),
                    old,
                    new: new.unwrap_or_default(),
                })
                .collect()
        }
    }
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

fn notification_for(
    ticket: &Ticket,
    created: bool,
    item_name: Option<String>,
    technician_name: Option<String>,
    note_lines: Vec<String>,
) -> NotifyContext {
    NotifyContext {
        ticket_id: ticket.id,
        short_description: ticket.short_description.clone(),
        urgency_label: ticket.urgency.label().to_string(),
        item_name,
        technician_name,
        created,
        is_resolved: ticket.is_resolved,
        notes: note_lines,
        recipients: ticket
            .recipient_emails
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Checks the form's references against live rows so a stale dropdown
/// surfaces as a field error instead of a foreign-key failure.
async fn check_references<C: db::ConnectionTrait>(
    txn: &C,
    cleaned: &CleanedTicket,
) -> Result<()> {
    let mut errors = FieldErrors::default();
    if let Some(id) = cleaned.item_id {
        if ids::item_id_by_uuid(txn, id).await?.is_none() {
            errors.push("item_id", "Unknown item");
        }
    }
    if let Some(id) = cleaned.location_id {
        if ids::location_id_by_uuid(txn, id).await?.is_none() {
            errors.push("location_id", "Unknown location");
        }
    }
    if let Some(id) = cleaned.technician_id {
        if ids::technician_id_by_uuid(txn, id).await?.is_none() {
            errors.push("technician_id", "Unknown technician");
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

async fn item_name<C: db::ConnectionTrait>(
    txn: &C,
    item_id: Option<Uuid>,
) -> std::result::Result<Option<String>, DbErr> {
    match item_id {
        Some(id) => Ok(Item::find_by_id(txn, id).await?.map(|item| item.name)),
        None => Ok(None),
    }
}

async fn technician_name<C: db::ConnectionTrait>(
    txn: &C,
    technician_id: Option<Uuid>,
) -> std::result::Result<Option<String>, DbErr> {
    match technician_id {
        Some(id) => Ok(Technician::find_by_id(txn, id).await?.map(|tech| tech.name)),
        None => Ok(None),
    }
}

/// Formats the mail's note list oldest-first with each author's username.
/// `find_for_ticket` returns newest-first, so the order is reversed here.
async fn note_lines<C: db::ConnectionTrait>(
    txn: &C,
    notes: &[TicketNote],
) -> std::result::Result<Vec<String>, DbErr> {
    let mut authors: std::collections::HashMap<Uuid, Option<String>> =
        std::collections::HashMap::new();
    let mut lines = Vec::with_capacity(notes.len());
    for note in notes.iter().rev() {
        let author = match note.submitted_by {
            Some(id) => match authors.get(&id) {
                Some(cached) => cached.clone(),
                None => {
                    let name = User::find_by_id(txn, id).await?.map(|user| user.username);
                    authors.insert(id, name.clone());
                    name
                }
            },
            None => None,
        };
        lines.push(match author {
            Some(author) => format!("{} ({}): {}", note.when, author, note.text),
            None => format!("{}: {}", note.when, note.text),
        });
    }
    Ok(lines)
}

#[derive(Clone, Default)]
pub struct TicketService;

impl TicketService {
    pub fn new() -> Self {
        Self
    }

    /// Validates and saves a new ticket with its notes in one transaction,
    /// writing the audit trail before the commit. When the form leaves
    /// recipients blank they default to every current technician's account
    /// email plus the submitter's.
    pub async fn create(
        &self,
        db: &DBService,
        form: &TicketForm,
        acting_user: Option<&User>,
    ) -> Result<TicketSaved> {
        let cleaned = form.validate()?;
        let txn = db.pool.begin().await?;
        check_references(&txn, &cleaned).await?;

        let recipient_emails = match cleaned.recipient_emails.clone() {
            Some(recipients) => Some(recipients),
            None => {
                let mut defaults = Technician::current_emails(&txn).await?;
                if let Some(user) = acting_user {
                    defaults.push(user.email.clone());
                }
                let defaults = dedup_preserving_order(defaults);
                if defaults.is_empty() {
                    None
                } else {
                    Some(defaults.join(", "))
                }
            }
        };

        let ticket = Ticket::create(
            &txn,
            &CreateTicket {
                item_id: cleaned.item_id,
                location_id: cleaned.location_id,
                short_description: cleaned.short_description.clone(),
                long_description: cleaned.long_description.clone(),
                urgency: cleaned.urgency,
                technician_id: cleaned.technician_id,
                recipient_emails,
                submitted_by: acting_user.map(|u| u.id),
            },
            Uuid::new_v4(),
        )
        .await?;

        let mut history_written = History::record_changes(
            &txn,
            TICKET_MODEL,
            ticket.id,
            &ticket_changes(None, &ticket),
            acting_user.map(|u| u.id),
        )
        .await?;
        history_written +=
            apply_note_ops(&txn, &ticket, &cleaned, acting_user).await?;

        let notes = TicketNote::find_for_ticket(&txn, ticket.id).await?;
        let item = item_name(&txn, ticket.item_id).await?;
        let technician = technician_name(&txn, ticket.technician_id).await?;
        let lines = note_lines(&txn, &notes).await?;
        txn.commit().await?;

        let notification = notification_for(&ticket, true, item, technician, lines);
        Ok(TicketSaved {
            ticket,
            notes,
            created: true,
            history_written,
            notification,
        })
    }

    /// Full-replacement update. The note sub-forms are applied in the same
    /// transaction; any failure rolls back the whole submission.
    pub async fn update(
        &self,
        db: &DBService,
        ticket_id: Uuid,
        form: &TicketForm,
        acting_user: Option<&User>,
    ) -> Result<TicketSaved> {
        let cleaned = form.validate()?;
        let txn = db.pool.begin().await?;

        let before = Ticket::find_by_id(&txn, ticket_id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;
        check_references(&txn, &cleaned).await?;

        let ticket = Ticket::update(
            &txn,
            ticket_id,
            &UpdateTicket {
                item_id: cleaned.item_id,
                location_id: cleaned.location_id,
                short_description: cleaned.short_description.clone(),
                long_description: cleaned.long_description.clone(),
                urgency: cleaned.urgency,
                technician_id: cleaned.technician_id,
                recipient_emails: cleaned
                    .recipient_emails
                    .clone()
                    .or_else(|| before.recipient_emails.clone()),
                is_resolved: cleaned.is_resolved,
                resolution_notes: cleaned.resolution_notes.clone(),
            },
        )
        .await?;

        let mut history_written = History::record_changes(
            &txn,
            TICKET_MODEL,
            ticket.id,
            &ticket_changes(Some(&before), &ticket),
            acting_user.map(|u| u.id),
        )
        .await?;
        history_written +=
            apply_note_ops(&txn, &ticket, &cleaned, acting_user).await?;

        let notes = TicketNote::find_for_ticket(&txn, ticket.id).await?;
        let item = item_name(&txn, ticket.item_id).await?;
        let technician = technician_name(&txn, ticket.technician_id).await?;
        let lines = note_lines(&txn, &notes).await?;
        txn.commit().await?;

        let notification = notification_for(&ticket, false, item, technician, lines);
        Ok(TicketSaved {
            ticket,
            notes,
            created: false,
            history_written,
            notification,
        })
    }

    pub async fn get(&self, db: &DBService, ticket_id: Uuid) -> Result<TicketDetail> {
        let ticket = Ticket::find_by_id(&db.pool, ticket_id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;
        let notes = TicketNote::find_for_ticket(&db.pool, ticket_id).await?;
        Ok(TicketDetail { ticket, notes })
    }

    pub async fn list(
        &self,
        db: &DBService,
        shape: &TicketListShape,
        page: u64,
    ) -> Result<Vec<Ticket>> {
        Ok(Ticket::list(&db.pool, shape, page).await?)
    }

    pub async fn delete(
        &self,
        db: &DBService,
        ticket_id: Uuid,
        acting_user: Option<&User>,
    ) -> Result<()> {
        let txn = db.pool.begin().await?;
        if Ticket::soft_delete(&txn, ticket_id).await? == 0 {
            return Err(TicketServiceError::NotFound);
        }
        History::record_changes(
            &txn,
            TICKET_MODEL,
            ticket_id,
            &[FieldChange::changed("is_deleted", "false", "true")],
            acting_user.map(|u| u.id),
        )
        .await?;
        txn.commit().await?;
        Ok(())
    }

    /// Appends a single note outside the full-form flow, with its own
    /// audit rows. The ticket must be visible.
    pub async fn add_note(
        &self,
        db: &DBService,
        ticket_id: Uuid,
        when: NaiveDate,
        text: &str,
        acting_user: Option<&User>,
    ) -> Result<TicketNote> {
        let text = text.trim();
        if text.is_empty() {
            let mut errors = FieldErrors::default();
            errors.push("text", "This field is required");
            return Err(errors.into());
        }

        let txn = db.pool.begin().await?;
        Ticket::find_by_id(&txn, ticket_id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;
        let note = TicketNote::create(
            &txn,
            ticket_id,
            &CreateTicketNote {
                when,
                text: text.to_string(),
                submitted_by: acting_user.map(|u| u.id),
            },
            Uuid::new_v4(),
        )
        .await?;
        History::record_changes(
            &txn,
            TICKET_NOTE_MODEL,
            note.id,
            &[
                FieldChange::created("when", when.to_string()),
                FieldChange::created("text", text),
            ],
            acting_user.map(|u| u.id),
        )
        .await?;
        txn.commit().await?;
        Ok(note)
    }

    pub async fn history(&self, db: &DBService, ticket_id: Uuid) -> Result<Vec<History>> {
        // The trail survives soft deletion, but the endpoint is scoped to
        // visible tickets.
        Ticket::find_by_id(&db.pool, ticket_id)
            .await?
            .ok_or(TicketServiceError::NotFound)?;
        Ok(History::find_for_object(&db.pool, TICKET_MODEL, ticket_id).await?)
    }
}

async fn apply_note_ops<C: db::ConnectionTrait>(
    txn: &C,
    ticket: &Ticket,
    cleaned: &CleanedTicket,
    acting_user: Option<&User>,
) -> Result<usize> {
    let acting_id = acting_user.map(|u| u.id);
    let mut written = 0;
    for op in &cleaned.notes {
        match op {
            NoteOp::Create { when, text } => {
                let note = TicketNote::create(
                    txn,
                    ticket.id,
                    &CreateTicketNote {
                        when: *when,
                        text: text.clone(),
                        submitted_by: acting_id,
                    },
                    Uuid::new_v4(),
                )
                .await?;
                written += History::record_changes(
                    txn,
                    TICKET_NOTE_MODEL,
                    note.id,
                    &[
                        FieldChange::created("when", when.to_string()),
                        FieldChange::created("text", text.clone()),
                    ],
                    acting_id,
                )
                .await?;
            }
            NoteOp::Update { id, when, text } => {
                let existing = TicketNote::find_by_id(txn, *id)
                    .await?
                    .filter(|note| note.ticket_id == ticket.id)
                    .ok_or(TicketServiceError::NotFound)?;
                let mut changes = Vec::new();
                if existing.when != *when {
                    changes.push(FieldChange::changed(
                        "when",
                        existing.when.to_string(),
                        when.to_string(),
                    ));
                }
                if existing.text != *text {
                    changes.push(FieldChange::changed("text", existing.text.clone(), text.clone()));
                }
                if !changes.is_empty() {
                    TicketNote::update(txn, *id, *when, text).await?;
                    written +=
                        History::record_changes(txn, TICKET_NOTE_MODEL, *id, &changes, acting_id)
                            .await?;
                }
            }
            NoteOp::Delete { id } => {
                let existing = TicketNote::find_by_id(txn, *id)
                    .await?
                    .filter(|note| note.ticket_id == ticket.id)
                    .ok_or(TicketServiceError::NotFound)?;
                TicketNote::delete(txn, *id).await?;
                written += History::record_changes(
                    txn,
                    TICKET_NOTE_MODEL,
                    *id,
                    &[FieldChange {
                        field: "deleted".to_string(),
                        old: Some(existing.text),
                        new: "true".to_string(),
                    }],
                    acting_id,
                )
                .await?;
            }
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::models::{
        technician::CreateTechnician,
        user::CreateUser,
    };
    use db::types::Urgency;

    use super::*;
    use crate::services::forms::NoteInput;

    fn base_form(short: &str) -> TicketForm {
        TicketForm {
            item_id: None,
            location_id: None,
            short_description: short.to_string(),
            long_description: None,
            urgency: 3,
            technician_id: None,
            recipient_emails: None,
            is_resolved: false,
            resolution_notes: None,
            notes: vec![],
            suppress_notification: false,
        }
    }

    async fn seed_user(db: &DBService, username: &str, email: &str) -> User {
        User::create(
            &db.pool,
            &CreateUser {
                username: username.to_string(),
                email: email.to_string(),
                permissions: vec![
                    "ticket.add".to_string(),
                    "ticket.change".to_string(),
                    "ticket.view".to_string(),
                ],
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_defaults_recipients_to_technicians_and_submitter() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let tech_user = seed_user(&db, "tech1", "tech1@example.edu").await;
        Technician::create(
            &db.pool,
            &CreateTechnician {
                name: "Pat".to_string(),
                user_id: Some(tech_user.id),
                is_current: true,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let submitter = seed_user(&db, "sam", "sam@example.edu").await;

        let saved = service
            .create(&db, &base_form("no sound in lab"), Some(&submitter))
            .await
            .unwrap();
        assert_eq!(
            saved.ticket.recipient_emails.as_deref(),
            Some("tech1@example.edu, sam@example.edu")
        );
        assert_eq!(
            saved.notification.recipients,
            ["tech1@example.edu", "sam@example.edu"]
        );
        assert!(saved.created);
    }

    #[tokio::test]
    async fn creation_logs_populated_fields_only() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let saved = service
            .create(&db, &base_form("frozen screen"), None)
            .await
            .unwrap();

        let trail = service.history(&db, saved.ticket.id).await.unwrap();
        let fields: Vec<&str> = trail.iter().map(|h| h.field_name.as_str()).collect();
        assert!(fields.contains(&"short_description"));
        assert!(fields.contains(&"urgency"));
        assert!(fields.contains(&"is_resolved"));
        assert!(!fields.contains(&"long_description"));
        assert!(trail.iter().all(|h| h.old_value.is_none()));
    }

    #[tokio::test]
    async fn update_writes_one_history_row_per_changed_field() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let saved = service
            .create(&db, &base_form("printer offline"), None)
            .await
            .unwrap();
        let baseline = service.history(&db, saved.ticket.id).await.unwrap().len();

        let mut form = base_form("printer offline");
        form.urgency = 5;
        form.is_resolved = true;
        form.resolution_notes = Some("power cycled".to_string());
        let updated = service
            .update(&db, saved.ticket.id, &form, None)
            .await
            .unwrap();
        assert_eq!(updated.ticket.urgency, Urgency::Minor);

        let trail = service.history(&db, saved.ticket.id).await.unwrap();
        // urgency, is_resolved, resolution_notes changed.
        assert_eq!(trail.len() - baseline, 3);
        let urgency_row = trail
            .iter()
            .find(|h| h.field_name == "urgency" && h.old_value.is_some())
            .unwrap();
        assert_eq!(urgency_row.old_value.as_deref(), Some("3"));
        assert_eq!(urgency_row.new_value, "5");
    }

    #[tokio::test]
    async fn invalid_note_rolls_back_everything() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let mut form = base_form("flaky dock");
        form.notes = vec![NoteInput {
            id: None,
            when: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            text: "  ".to_string(),
            remove: false,
        }];

        let err = service.create(&db, &form, None).await.unwrap_err();
        assert!(matches!(err, TicketServiceError::Validation(_)));

        let listed = service
            .list(&db, &TicketListShape::default(), 1)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn note_lifecycle_rides_the_ticket_form() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let mut form = base_form("loose hinge");
        form.notes = vec![NoteInput {
            id: None,
            when: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            text: "inspected on site".to_string(),
            remove: false,
        }];
        let saved = service.create(&db, &form, None).await.unwrap();
        assert_eq!(saved.notes.len(), 1);
        let note_id = saved.notes[0].id;

        let mut form = base_form("loose hinge");
        form.notes = vec![NoteInput {
            id: Some(note_id),
            when: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            text: String::new(),
            remove: true,
        }];
        let updated = service.update(&db, saved.ticket.id, &form, None).await.unwrap();
        assert!(updated.notes.is_empty());
    }

    #[tokio::test]
    async fn notification_notes_are_chronological_with_author() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let user = seed_user(&db, "sam", "sam@example.edu").await;

        let mut form = base_form("speaker crackle");
        form.notes = vec![
            NoteInput {
                id: None,
                when: NaiveDate::from_ymd_opt(2026, 5, 3).unwrap(),
                text: "second visit".to_string(),
                remove: false,
            },
            NoteInput {
                id: None,
                when: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                text: "first visit".to_string(),
                remove: false,
            },
        ];
        let saved = service.create(&db, &form, Some(&user)).await.unwrap();
        assert_eq!(
            saved.notification.notes,
            [
                "2026-05-01 (sam): first visit",
                "2026-05-03 (sam): second visit",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_item_reference_is_a_field_error() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let mut form = base_form("monitor flicker");
        form.item_id = Some(Uuid::new_v4());

        let err = service.create(&db, &form, None).await.unwrap_err();
        match err {
            TicketServiceError::Validation(errors) => {
                assert_eq!(errors.messages("item_id"), ["Unknown item"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        let listed = service
            .list(&db, &TicketListShape::default(), 1)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn add_note_appends_and_audits() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let saved = service
            .create(&db, &base_form("door badge reader"), None)
            .await
            .unwrap();

        let err = service
            .add_note(
                &db,
                saved.ticket.id,
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                "   ",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TicketServiceError::Validation(_)));

        let note = service
            .add_note(
                &db,
                saved.ticket.id,
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                "reseated the wiring",
                None,
            )
            .await
            .unwrap();
        assert_eq!(note.text, "reseated the wiring");

        let detail = service.get(&db, saved.ticket.id).await.unwrap();
        assert_eq!(detail.notes.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_ticket_is_not_found() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = TicketService::new();
        let err = service
            .update(&db, Uuid::new_v4(), &base_form("ghost"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TicketServiceError::NotFound));
    }
}

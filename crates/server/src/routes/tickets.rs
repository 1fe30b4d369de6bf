use axum::{
    extract::{Extension, Path, Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
    Json, Router,
};
use db::{
    models::{
        history::History,
        ticket::Ticket,
        ticket_note::TicketNote,
        user::User,
    },
    types::TicketListShape,
};
use serde::{Deserialize, Serialize};
use services::services::{
    forms::TicketForm,
    notify::{notify_ticket_saved, NotifyOutcome},
    tickets::TicketSaved,
    views::ShapeSource,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    error::ApiError,
    http::auth::require_permission,
    middleware::load_ticket_middleware,
    AppState,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let ticket_scoped = Router::new()
        .route(
            "/tickets/{id}",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route(
            "/tickets/{id}/notes",
            get(get_ticket_notes).post(add_ticket_note),
        )
        .route("/tickets/{id}/history", get(get_ticket_history))
        .layer(from_fn_with_state(state.clone(), load_ticket_middleware));

    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/queries/stash", post(stash_query))
        .merge(ticket_scoped)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub view: Option<String>,
    /// URL-encoded JSON list shape, applied for this request only.
    pub shape: Option<String>,
    #[serde(default = "first_page")]
    pub page: u64,
}

fn first_page() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub when: chrono::NaiveDate,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<Ticket>,
    pub source: ShapeSource,
    pub page: u64,
}

#[derive(Debug, Serialize)]
pub struct TicketSavedResponse {
    pub ticket: Ticket,
    pub notes: Vec<TicketNote>,
}

fn notify_message(outcome: &NotifyOutcome) -> String {
    match outcome {
        NotifyOutcome::Sent { recipients } => {
            format!("Notification sent to {recipients} recipient(s)")
        }
        NotifyOutcome::Skipped { reason } => format!("Notification skipped: {reason}"),
        NotifyOutcome::Failed { error } => {
            format!("Ticket saved, but the notification failed: {error}")
        }
    }
}

async fn dispatch_notification(state: &AppState, saved: &TicketSaved, suppress: bool) -> String {
    if suppress {
        return "Notification suppressed".to_string();
    }
    let config = state.config().read().await.clone();
    let outcome = notify_ticket_saved(state.mailer(), &config, &saved.notification).await;
    notify_message(&outcome)
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListQuery>,
) -> Result<ResponseJson<ApiResponse<TicketListResponse>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let submitted = match query.shape.as_deref() {
        Some(raw) => Some(serde_json::from_str::<TicketListShape>(raw).map_err(|err| {
            ApiError::BadRequest(format!("Invalid shape parameter: {err}"))
        })?),
        None => None,
    };
    let resolved = state
        .views()
        .resolve_shape(
            state.db(),
            state.stash(),
            user.id,
            submitted,
            query.view.as_deref(),
        )
        .await?;
    let tickets = state
        .tickets()
        .list(state.db(), &resolved.shape, query.page)
        .await?;
    Ok(ResponseJson(ApiResponse::success(TicketListResponse {
        tickets,
        source: resolved.source,
        page: query.page,
    })))
}

/// Parks a submitted query shape for the caller's next list fetch.
pub async fn stash_query(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(shape): Json<TicketListShape>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    state.stash().put(user.id, shape.clamped());
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(form): Json<TicketForm>,
) -> Result<ResponseJson<ApiResponse<TicketSavedResponse>>, ApiError> {
    require_permission(&user, "ticket.add")?;
    let saved = state.tickets().create(state.db(), &form, Some(&user)).await?;
    let message = dispatch_notification(&state, &saved, form.suppress_notification).await;
    Ok(ResponseJson(ApiResponse::success_with_message(
        TicketSavedResponse {
            ticket: saved.ticket,
            notes: saved.notes,
        },
        message,
    )))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(ticket): Extension<Ticket>,
) -> Result<ResponseJson<ApiResponse<TicketSavedResponse>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let notes = TicketNote::find_for_ticket(&state.db().pool, ticket.id).await?;
    Ok(ResponseJson(ApiResponse::success(TicketSavedResponse {
        ticket,
        notes,
    })))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(ticket): Extension<Ticket>,
    Json(form): Json<TicketForm>,
) -> Result<ResponseJson<ApiResponse<TicketSavedResponse>>, ApiError> {
    require_permission(&user, "ticket.change")?;
    let saved = state
        .tickets()
        .update(state.db(), ticket.id, &form, Some(&user))
        .await?;
    let message = dispatch_notification(&state, &saved, form.suppress_notification).await;
    Ok(ResponseJson(ApiResponse::success_with_message(
        TicketSavedResponse {
            ticket: saved.ticket,
            notes: saved.notes,
        },
        message,
    )))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(ticket): Extension<Ticket>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    require_permission(&user, "ticket.delete")?;
    state
        .tickets()
        .delete(state.db(), ticket.id, Some(&user))
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_ticket_notes(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(ticket): Extension<Ticket>,
) -> Result<ResponseJson<ApiResponse<Vec<TicketNote>>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let notes = TicketNote::find_for_ticket(&state.db().pool, ticket.id).await?;
    Ok(ResponseJson(ApiResponse::success(notes)))
}

/// Appends one note without resubmitting the whole ticket form. Open to
/// the ticket's submitter as well as anyone who can change tickets.
pub async fn add_ticket_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(ticket): Extension<Ticket>,
    Json(request): Json<AddNoteRequest>,
) -> Result<ResponseJson<ApiResponse<TicketNote>>, ApiError> {
    let is_submitter = ticket.submitted_by == Some(user.id);
    if !is_submitter {
        require_permission(&user, "ticket.change")?;
    }
    let note = state
        .tickets()
        .add_note(
            state.db(),
            ticket.id,
            request.when,
            &request.text,
            Some(&user),
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(note)))
}

pub async fn get_ticket_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(ticket_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<History>>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let trail = state.tickets().history(state.db(), ticket_id).await?;
    Ok(ResponseJson(ApiResponse::success(trail)))
}

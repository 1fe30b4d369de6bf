use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::models::ticket::Ticket;
use uuid::Uuid;

use crate::AppState;

/// Loads the ticket named in the path and attaches it as an extension, so
/// handlers under `/tickets/{id}` never repeat the lookup.
pub async fn load_ticket_middleware(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match Ticket::find_by_id(&state.db().pool, ticket_id).await {
        Ok(Some(ticket)) => {
            request.extensions_mut().insert(ticket);
            Ok(next.run(request).await)
        }
        Ok(None) => {
            tracing::warn!("Ticket {ticket_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch Ticket {ticket_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

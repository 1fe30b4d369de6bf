use axum::{
    extract::{Extension, State},
    response::Json as ResponseJson,
    routing::get,
    Router,
};
use db::models::{
    item::{Item, ItemOption},
    location::Location,
    technician::Technician,
    user::User,
};
use utils::response::ApiResponse;

use crate::{error::ApiError, http::auth::require_permission, AppState};

/// Read-only dropdown sources for the ticket form.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/catalog/items", get(get_items))
        .route("/catalog/locations", get(get_locations))
        .route("/catalog/technicians", get(get_technicians))
}

pub async fn get_items(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<ItemOption>>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let options = Item::find_options(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(options)))
}

pub async fn get_locations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<Location>>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let locations = Location::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(locations)))
}

pub async fn get_technicians(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<Technician>>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let technicians = Technician::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(technicians)))
}

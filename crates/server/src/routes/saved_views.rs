use axum::{
    extract::{Extension, Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
    Json, Router,
};
use db::{models::user::User, types::TicketListShape};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use crate::{error::ApiError, http::auth::require_permission, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/views", get(list_views))
        .route(
            "/views/{name}",
            get(get_view).put(save_view).delete(delete_view),
        )
        .route("/views/{name}/default", post(set_default_view))
}

#[derive(Debug, Serialize)]
pub struct ViewSummary {
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
pub struct ViewDetail {
    pub name: String,
    pub is_default: bool,
    pub shape: TicketListShape,
}

#[derive(Debug, Deserialize)]
pub struct SaveViewRequest {
    pub shape: TicketListShape,
}

pub async fn list_views(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<ViewSummary>>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let views = state
        .views()
        .list(state.db(), user.id)
        .await?
        .into_iter()
        .map(|(name, is_default)| ViewSummary { name, is_default })
        .collect();
    Ok(ResponseJson(ApiResponse::success(views)))
}

pub async fn get_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(name): Path<String>,
) -> Result<ResponseJson<ApiResponse<ViewDetail>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let view = state.views().get(state.db(), user.id, &name).await?;
    Ok(ResponseJson(ApiResponse::success(ViewDetail {
        name: view.name,
        is_default: view.is_default,
        shape: view.shape,
    })))
}

/// Upsert keyed by name; saving over an existing view replaces its shape.
pub async fn save_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(name): Path<String>,
    Json(payload): Json<SaveViewRequest>,
) -> Result<ResponseJson<ApiResponse<ViewSummary>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("View name must not be blank".to_string()));
    }
    let view = state
        .views()
        .save(state.db(), user.id, name, &payload.shape.clamped())
        .await?;
    Ok(ResponseJson(ApiResponse::success(ViewSummary {
        name: view.name,
        is_default: view.is_default,
    })))
}

pub async fn set_default_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(name): Path<String>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    state.views().set_default(state.db(), user.id, &name).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn delete_view(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(name): Path<String>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    state.views().delete(state.db(), user.id, &name).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

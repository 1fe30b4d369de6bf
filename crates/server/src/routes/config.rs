use axum::{
    extract::{Extension, State},
    response::Json as ResponseJson,
    routing::get,
    Json, Router,
};
use db::models::user::User;
use services::services::config::{save_config_to_file, Config};
use utils::response::ApiResponse;

use crate::{error::ApiError, http::auth::require_permission, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/config", get(get_config).put(update_config))
}

pub async fn get_config(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Config>>, ApiError> {
    require_permission(&user, "ticket.view")?;
    let config = state.config().read().await.clone();
    Ok(ResponseJson(ApiResponse::success(config)))
}

/// Persists the new config and swaps it into the running state. A changed
/// mail transport takes effect on the next restart.
pub async fn update_config(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(new_config): Json<Config>,
) -> Result<ResponseJson<ApiResponse<Config>>, ApiError> {
    require_permission(&user, "ticket.change")?;
    save_config_to_file(&new_config, state.config_path()).await?;
    let mut config = state.config().write().await;
    *config = new_config.clone();
    Ok(ResponseJson(ApiResponse::success(new_config)))
}

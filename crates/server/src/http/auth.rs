use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::user::User;
use uuid::Uuid;

use crate::{error::ApiError, AppState};

const USER_ID_HEADER: &str = "x-user-id";

/// Resolves the calling user from the `X-User-Id` header set by the campus
/// SSO proxy and stores it as a request extension. Unknown or inactive
/// accounts are rejected before any handler runs.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(user_id) = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<Uuid>().ok())
    else {
        return ApiError::Unauthorized.into_response();
    };

    let user = match User::find_by_id(&state.db().pool, user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => return ApiError::Unauthorized.into_response(),
        Err(err) => {
            tracing::error!("Failed to resolve user {user_id}: {err}");
            return ApiError::Database(err).into_response();
        }
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

pub fn require_permission(user: &User, permission: &str) -> Result<(), ApiError> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Missing permission '{permission}'"
        )))
    }
}

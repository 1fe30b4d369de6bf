use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::{routes, AppState};

pub mod auth;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::tickets::router(&state))
        .merge(routes::saved_views::router())
        .merge(routes::catalog::router())
        .merge(routes::config::router())
        .layer(from_fn_with_state(state.clone(), auth::require_user));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
}

use db::{
    models::user::{CreateUser, User},
    DBService,
};
use services::services::config::Config;
use uuid::Uuid;

use crate::AppState;

pub async fn spawn_state() -> AppState {
    let db = DBService::new_in_memory().await.unwrap();
    let config_path = std::env::temp_dir().join(format!("tekdesk-test-{}.json", Uuid::new_v4()));
    AppState::with_parts(db, Config::default(), config_path).unwrap()
}

pub async fn seed_user_with_permissions(
    state: &AppState,
    username: &str,
    permissions: &[&str],
) -> User {
    User::create(
        &state.db().pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.edu"),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        },
        Uuid::new_v4(),
    )
    .await
    .unwrap()
}

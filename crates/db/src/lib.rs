use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use utils::assets::asset_dir;

pub mod entities;
pub mod models;
pub mod types;

pub use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};

#[derive(Clone)]
pub struct DBService {
    pub pool: DatabaseConnection,
}

fn default_database_url() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let url = url.trim();
        if !url.is_empty() {
            return url.to_string();
        }
    }
    format!(
        "sqlite://{}?mode=rwc",
        asset_dir().join("db.sqlite").to_string_lossy()
    )
}

impl DBService {
    pub async fn new() -> Result<DBService, DbErr> {
        Self::from_url(&default_database_url()).await
    }

    pub async fn from_url(url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(url);
        options.sqlx_logging(false);
        if url.contains(":memory:") {
            // A pooled in-memory sqlite would hand each connection its own
            // empty database.
            options.max_connections(1);
        }
        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        Ok(DBService { pool })
    }

    pub async fn new_in_memory() -> Result<DBService, DbErr> {
        Self::from_url("sqlite::memory:").await
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use db::DBService;
use services::services::{
    config::{load_config_from_file, Config},
    notify::{Mailer, SmtpMailer},
    tickets::TicketService,
    views::{QueryStash, ViewService},
};
use tokio::sync::RwLock;
use utils::assets::config_path;

struct Inner {
    db: DBService,
    config: RwLock<Config>,
    config_path: PathBuf,
    tickets: TicketService,
    views: ViewService,
    stash: QueryStash,
    mailer: Option<Arc<dyn Mailer>>,
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config_path = config_path();
        let config = load_config_from_file(&config_path).await;
        let db = DBService::new().await?;
        Self::with_parts(db, config, config_path)
    }

    pub fn with_parts(
        db: DBService,
        config: Config,
        config_path: PathBuf,
    ) -> anyhow::Result<Self> {
        let mailer: Option<Arc<dyn Mailer>> = if config.mail.enabled {
            match SmtpMailer::from_config(&config.mail) {
                Ok(mailer) => Some(Arc::new(mailer)),
                Err(err) => {
                    tracing::warn!("Mail transport unavailable, notifications disabled: {}", err);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self(Arc::new(Inner {
            db,
            config: RwLock::new(config),
            config_path,
            tickets: TicketService::new(),
            views: ViewService::new(),
            stash: QueryStash::new(),
            mailer,
        })))
    }

    pub fn db(&self) -> &DBService {
        &self.0.db
    }

    pub fn config(&self) -> &RwLock<Config> {
        &self.0.config
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.0.config_path
    }

    pub fn tickets(&self) -> &TicketService {
        &self.0.tickets
    }

    pub fn views(&self) -> &ViewService {
        &self.0.views
    }

    pub fn stash(&self) -> &QueryStash {
        &self.0.stash
    }

    pub fn mailer(&self) -> Option<&dyn Mailer> {
        self.0.mailer.as_deref()
    }
}

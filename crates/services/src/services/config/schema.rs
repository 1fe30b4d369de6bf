use serde::{Deserialize, Serialize};

pub const CURRENT_CONFIG_VERSION: &str = "v1";

fn default_version() -> String {
    CURRENT_CONFIG_VERSION.to_string()
}

fn default_from_address() -> String {
    "helpdesk@localhost".to_string()
}

fn default_subject_prefix() -> String {
    "[helpdesk]".to_string()
}

/// Outbound mail settings. Disabled by default so a fresh install never
/// tries to reach an SMTP host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub smtp_url: Option<String>,
    pub from_address: String,
    pub subject_prefix: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_url: None,
            from_address: default_from_address(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// External base URL used to build ticket permalinks in notifications,
    /// e.g. `https://helpdesk.example.edu`. No permalink when unset.
    pub public_base_url: Option<String>,
    pub mail: MailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            public_base_url: None,
            mail: MailConfig::default(),
        }
    }
}

impl Config {
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Invalid config file, using defaults: {}", err);
                Config::default()
            }
        }
    }
}

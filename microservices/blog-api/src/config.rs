//! Configuration for the Blog API service

use std::path::PathBuf;

use sentinela_core::{env_or, env_parse, ServiceConfig};
use sentinela_firestore_sdk::{FirestoreConfig, DEFAULT_ENDPOINT};

/// Blog API configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub firestore: FirestoreConfig,
    pub mail: MailConfig,
    /// Directory holding the flat-file record store
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> sentinela_core::Result<Self> {
        Ok(Self {
            service: ServiceConfig::from_env("blog-api", 5001)?,
            firestore: FirestoreConfig {
                api_key: env_or("FIREBASE_API_KEY", ""),
                project_id: env_or("FIREBASE_PROJECT_ID", ""),
                endpoint: env_or("FIRESTORE_ENDPOINT", DEFAULT_ENDPOINT),
                request_timeout_secs: env_parse("FIRESTORE_TIMEOUT_SECS", 10)?,
            },
            mail: MailConfig::from_env()?,
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
        })
    }
}

/// Outbound SMTP settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Recipient of contact notifications
    pub admin_email: String,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            admin_email: "admin@sentineladedados.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl MailConfig {
    pub fn from_env() -> sentinela_core::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            server: env_or("SMTP_SERVER", &defaults.server),
            port: env_parse("SMTP_PORT", defaults.port)?,
            username: env_or("SMTP_USERNAME", ""),
            password: env_or("SMTP_PASSWORD", ""),
            admin_email: env_or("ADMIN_EMAIL", &defaults.admin_email),
            timeout_secs: env_parse("SMTP_TIMEOUT_SECS", defaults.timeout_secs)?,
        })
    }

    /// Mail is only sent when both credentials are present
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

//! Blog API Microservice
//!
//! Backend for the Sentinela de Dados blog:
//! - Firestore REST proxy with typed-value translation
//! - Contact form with administrator notification
//! - Newsletter subscriptions with welcome email

mod config;
mod contact;
mod error;
mod handlers;
mod mail;
mod model;
mod newsletter;
mod routes;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

use sentinela_core::shutdown_signal;
use sentinela_firestore_sdk::FirestoreClient;

pub use config::Config;
pub use error::{Error, Result};

use contact::ContactService;
use mail::{Mailer, SmtpMailer};
use newsletter::NewsletterService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub firestore: Arc<FirestoreClient>,
    pub contacts: Arc<ContactService>,
    pub newsletter: Arc<NewsletterService>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, firestore: FirestoreClient, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            firestore: Arc::new(firestore),
            contacts: Arc::new(ContactService::new(&config.data_dir, mailer.clone())),
            newsletter: Arc::new(NewsletterService::new(&config.data_dir, mailer)),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sentinela_telemetry::init("blog-api")?;

    info!("Starting Blog API microservice");

    // Load configuration
    let config = Config::from_env()?;
    let bind_addr = config.service.bind_address()?;

    let firestore = FirestoreClient::new(&config.firestore)?;
    if !firestore.is_configured() {
        warn!("FIREBASE_API_KEY or FIREBASE_PROJECT_ID not set, Firestore calls will fail upstream");
    }

    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(config.mail.clone())?);

    info!(data_dir = %config.data_dir.display(), "Using flat-file record store");
    let state = AppState::new(config, firestore, mailer);

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Blog API listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Blog API stopped");
    Ok(())
}

//! Router configuration for the Blog API

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::AppState;

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Service
        .route("/health", get(handlers::health))
        .route("/api", get(handlers::api_info))
        // Firestore proxy
        .route("/api/firebase/health", get(handlers::firebase_health))
        .route(
            "/api/firebase/firestore/{collection}",
            get(handlers::list_documents).post(handlers::create_document),
        )
        .route(
            "/api/firebase/firestore/{collection}/{id}",
            get(handlers::get_document)
                .put(handlers::replace_document)
                .patch(handlers::update_document),
        )
        // Contact
        .route("/api/contact", post(handlers::submit_contact))
        .route("/api/contacts", get(handlers::list_contacts))
        // Newsletter
        .route("/api/newsletter/subscribe", post(handlers::subscribe))
        .route("/api/newsletter/unsubscribe", post(handlers::unsubscribe))
        .route("/api/newsletter/subscribers", get(handlers::list_subscribers))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

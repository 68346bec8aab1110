//! HTTP handlers for the Blog API

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sentinela_core::HealthStatus;
use sentinela_firestore_sdk::{CollectionQuery, Direction, Document, Fields, QueryFilter, Value};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::net::SocketAddr;

use crate::contact::ContactForm;
use crate::model::RequestMeta;
use crate::newsletter::EmailForm;
use crate::{AppState, Error, Result};

type JsonBody = std::result::Result<Json<serde_json::Value>, JsonRejection>;

fn json_body(payload: JsonBody) -> Result<serde_json::Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| Error::validation(format!("Invalid JSON body: {}", e.body_text())))
}

/// Write payloads must be JSON objects
fn object_fields(payload: JsonBody) -> Result<Fields> {
    match Value::from(json_body(payload)?) {
        Value::Map(fields) => Ok(fields),
        other => Err(Error::validation(format!(
            "Request body must be a JSON object, got {}",
            other.kind()
        ))),
    }
}

fn parse_form<T: DeserializeOwned>(payload: JsonBody) -> Result<T> {
    serde_json::from_value(json_body(payload)?)
        .map_err(|_| Error::validation("Request body must be a JSON object"))
}

fn request_meta(peer: SocketAddr, headers: &HeaderMap) -> RequestMeta {
    RequestMeta {
        ip: Some(peer.ip().to_string()),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    }
}

// ============================================
// Service Handlers
// ============================================

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(
        &state.config.service.service_name,
        env!("CARGO_PKG_VERSION"),
        state.started_at,
    ))
}

pub async fn api_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Sentinela de Dados API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "firebase": "/api/firebase/*",
            "contact": "/api/contact",
            "newsletter": "/api/newsletter/*"
        }
    }))
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "error": "Endpoint not found"})),
    )
}

// ============================================
// Firestore Proxy Handlers
// ============================================

pub async fn firebase_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "Firebase Proxy",
        "firebase_configured": state.firestore.is_configured()
    }))
}

/// Query string of a collection listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionParams {
    pub order_by: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<String>,
    /// JSON `{field, operator, value}`
    #[serde(rename = "where")]
    pub filter: Option<String>,
}

impl CollectionParams {
    pub fn into_query(self) -> CollectionQuery {
        let mut query = CollectionQuery::new();

        if let Some(field) = self.order_by.filter(|f| !f.is_empty()) {
            let direction = Direction::parse(self.direction.as_deref().unwrap_or("asc"));
            query = query.order_by(field, direction);
        }
        if let Some(limit) = self.limit {
            query = query.page_size(limit);
        }
        if let Some(filter) = self.filter.as_deref().and_then(QueryFilter::parse) {
            query = query.filter(filter);
        }

        query
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<CollectionParams>,
) -> Result<Json<Vec<Document>>> {
    let documents = state
        .firestore
        .get_collection(&collection, &params.into_query())
        .await
        .map_err(Error::firestore("Error fetching documents"))?;

    Ok(Json(documents))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>> {
    let document = state
        .firestore
        .get_document(&collection, &id)
        .await
        .map_err(Error::firestore("Error fetching document"))?;

    Ok(Json(document))
}

pub async fn create_document(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    payload: JsonBody,
) -> Result<Json<serde_json::Value>> {
    let fields = object_fields(payload)?;
    let id = state
        .firestore
        .create_document(&collection, fields)
        .await
        .map_err(Error::firestore("Error adding document"))?;

    Ok(Json(json!({"id": id, "success": true})))
}

pub async fn replace_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    payload: JsonBody,
) -> Result<Json<serde_json::Value>> {
    let fields = object_fields(payload)?;
    state
        .firestore
        .replace_document(&collection, &id, fields)
        .await
        .map_err(Error::firestore("Error setting document"))?;

    Ok(Json(json!({"id": id, "success": true})))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    payload: JsonBody,
) -> Result<Json<serde_json::Value>> {
    let fields = object_fields(payload)?;
    state
        .firestore
        .update_document(&collection, &id, fields)
        .await
        .map_err(Error::firestore("Error updating document"))?;

    Ok(Json(json!({"id": id, "success": true})))
}

// ============================================
// Contact Handlers
// ============================================

pub async fn submit_contact(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: JsonBody,
) -> Result<Json<serde_json::Value>> {
    let form: ContactForm = parse_form(payload)?;
    state
        .contacts
        .submit(form, request_meta(peer, &headers))
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully! We will get back to you soon."
    })))
}

pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let contacts = state.contacts.list().await?;
    Ok(Json(json!({"success": true, "contacts": contacts})))
}

// ============================================
// Newsletter Handlers
// ============================================

pub async fn subscribe(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: JsonBody,
) -> Result<Json<serde_json::Value>> {
    let form: EmailForm = parse_form(payload)?;
    state
        .newsletter
        .subscribe(form, request_meta(peer, &headers))
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Subscription successful! Check your email to confirm."
    })))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    payload: JsonBody,
) -> Result<Json<serde_json::Value>> {
    let form: EmailForm = parse_form(payload)?;
    state.newsletter.unsubscribe(form).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Subscription cancelled successfully."
    })))
}

pub async fn list_subscribers(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let listing = state.newsletter.list().await?;
    Ok(Json(json!({
        "success": true,
        "subscribers": listing.subscribers,
        "total": listing.total,
        "active": listing.active
    })))
}

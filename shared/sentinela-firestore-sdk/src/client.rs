//! Firestore REST client
//!
//! Every operation is a single outbound call against
//! `{documents}/{collection}[/{id}]?key=...`; no state is kept between calls.

use chrono::Utc;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::codec::{self, WireFields, WireValue};
use crate::config::FirestoreConfig;
use crate::query::CollectionQuery;
use crate::types::{Document, ListDocumentsResponse, RemoteDocument, WriteRequest};
use crate::value::Fields;
use crate::{FirestoreError, Result};

/// Field injected on create when the caller did not provide one
pub const CREATED_FIELD: &str = "timestamp";
/// Field always written by a partial update
pub const UPDATED_FIELD: &str = "updatedAt";

/// Firestore REST client
pub struct FirestoreClient {
    http: Client,
    documents_url: Url,
    api_key: String,
    configured: bool,
}

impl FirestoreClient {
    pub fn new(config: &FirestoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FirestoreError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let documents_url = Url::parse(&config.documents_url())
            .map_err(|e| FirestoreError::Config(format!("Invalid Firestore endpoint: {}", e)))?;
        if documents_url.cannot_be_a_base() {
            return Err(FirestoreError::Config(format!(
                "Invalid Firestore endpoint: {}",
                config.endpoint
            )));
        }

        Ok(Self {
            http,
            documents_url,
            api_key: config.api_key.clone(),
            configured: config.is_configured(),
        })
    }

    /// Whether both the API key and the project id were provided
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.documents_url.clone();
        // Checked in `new`: the documents URL can be a base
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn key(&self) -> [(&'static str, &str); 1] {
        [("key", self.api_key.as_str())]
    }

    /// List a collection, decoding every document and applying the
    /// client-side filter of `query`.
    pub async fn get_collection(
        &self,
        collection: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>> {
        let params = query.remote_params();
        debug!(collection = %collection, params = ?params, "Listing Firestore documents");

        let response = self
            .http
            .get(self.url(&[collection]))
            .query(&self.key())
            .query(&params)
            .send()
            .await?;
        let response = check_status(response).await?;

        let listing: ListDocumentsResponse = read_json(response).await?;
        if listing.next_page_token.is_some() {
            debug!(collection = %collection, "Listing truncated at one page");
        }
        let documents = listing
            .documents
            .into_iter()
            .map(RemoteDocument::into_document)
            .collect();

        Ok(query.apply(documents))
    }

    /// Fetch one document. A 404 is not an error: it yields
    /// [`Document::missing`].
    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Document> {
        debug!(collection = %collection, id = %id, "Fetching Firestore document");

        let response = self
            .http
            .get(self.url(&[collection, id]))
            .query(&self.key())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(collection = %collection, id = %id, "Firestore document not found");
            return Ok(Document::missing(id));
        }
        let response = check_status(response).await?;

        let remote: RemoteDocument = read_json(response).await?;
        Ok(Document::new(id, codec::decode_fields(remote.fields)))
    }

    /// Create a document with a server-assigned id and return that id.
    ///
    /// A `timestamp` field holding the creation time is added unless the
    /// caller supplied one.
    pub async fn create_document(&self, collection: &str, data: Fields) -> Result<String> {
        let mut fields = codec::encode_fields(data);
        fields
            .entry(CREATED_FIELD.to_string())
            .or_insert_with(|| WireValue::Timestamp(server_timestamp()));

        let response = self
            .http
            .post(self.url(&[collection]))
            .query(&self.key())
            .json(&WriteRequest { fields })
            .send()
            .await?;
        let response = check_status(response).await?;

        let created: RemoteDocument = read_json(response).await?;
        let id = created.id().to_string();

        info!(collection = %collection, id = %id, "Created Firestore document");
        Ok(id)
    }

    /// Write `data` to a document without a field mask.
    ///
    /// The REST API treats this as a merge of the given fields: fields absent
    /// from `data` are left as they are.
    pub async fn replace_document(&self, collection: &str, id: &str, data: Fields) -> Result<()> {
        let fields = codec::encode_fields(data);

        let response = self
            .http
            .patch(self.url(&[collection, id]))
            .query(&self.key())
            .json(&WriteRequest { fields })
            .send()
            .await?;
        check_status(response).await?;

        info!(collection = %collection, id = %id, "Replaced Firestore document");
        Ok(())
    }

    /// Partially update a document, touching only the given fields plus
    /// `updatedAt`.
    pub async fn update_document(&self, collection: &str, id: &str, data: Fields) -> Result<()> {
        let mut fields = codec::encode_fields(data);
        fields.insert(
            UPDATED_FIELD.to_string(),
            WireValue::Timestamp(server_timestamp()),
        );
        let mask = update_mask(&fields);

        let response = self
            .http
            .patch(self.url(&[collection, id]))
            .query(&self.key())
            .query(&mask)
            .json(&WriteRequest { fields })
            .send()
            .await?;
        check_status(response).await?;

        info!(
            collection = %collection,
            id = %id,
            fields = mask.len(),
            "Updated Firestore document"
        );
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "Firestore request failed");
    Err(FirestoreError::Upstream {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await?;
    codec::from_slice(&body).map_err(|e| FirestoreError::Decode(e.to_string()))
}

/// Current UTC time as ISO-8601 with a literal `Z`
pub fn server_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// `updateMask.fieldPaths` parameters covering exactly the given fields
pub fn update_mask(fields: &WireFields) -> Vec<(&'static str, String)> {
    fields
        .keys()
        .map(|name| ("updateMask.fieldPaths", field_path(name)))
        .collect()
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be backquoted in a
/// field path.
fn field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, QueryFilter};
    use crate::Value;
    use axum::{
        body::Bytes,
        extract::State,
        http::{Method, StatusCode as HttpStatus, Uri},
        response::IntoResponse,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        path: String,
        query: Vec<(String, String)>,
        body: Option<serde_json::Value>,
    }

    impl Recorded {
        fn params(&self, key: &str) -> Vec<&str> {
            self.query
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect()
        }
    }

    /// In-process stand-in for the REST API: records every request and
    /// answers with queued replies.
    #[derive(Clone, Default)]
    struct FakeFirestore {
        requests: Arc<Mutex<Vec<Recorded>>>,
        replies: Arc<Mutex<VecDeque<(u16, serde_json::Value)>>>,
    }

    impl FakeFirestore {
        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn handle(
        State(fake): State<FakeFirestore>,
        method: Method,
        uri: Uri,
        body: Bytes,
    ) -> impl IntoResponse {
        let url = Url::parse(&format!("http://fake{}", uri)).unwrap();
        fake.requests.lock().unwrap().push(Recorded {
            method: method.to_string(),
            path: url.path().to_string(),
            query: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            body: serde_json::from_slice(&body).ok(),
        });

        let (status, reply) = fake
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((200, json!({})));
        (HttpStatus::from_u16(status).unwrap(), Json(reply))
    }

    async fn start(replies: Vec<(u16, serde_json::Value)>) -> (FirestoreClient, FakeFirestore) {
        let fake = FakeFirestore::default();
        fake.replies.lock().unwrap().extend(replies);

        let app = Router::new().fallback(handle).with_state(fake.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = FirestoreClient::new(&FirestoreConfig {
            api_key: "test-key".to_string(),
            project_id: "demo".to_string(),
            endpoint: format!("http://{}", addr),
            request_timeout_secs: 5,
        })
        .unwrap();
        (client, fake)
    }

    fn fields(json: serde_json::Value) -> Fields {
        match Value::from(json) {
            Value::Map(fields) => fields,
            other => panic!("expected object, got {}", other.kind()),
        }
    }

    const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";

    #[tokio::test]
    async fn test_get_collection_decodes_and_filters() {
        let listing = json!({"documents": [
            {"name": "projects/demo/databases/(default)/documents/users/u1",
             "fields": {"age": {"integerValue": "30"}, "name": {"stringValue": "Ana"}}},
            {"name": "projects/demo/databases/(default)/documents/users/u2",
             "fields": {"age": {"integerValue": "17"}}},
            {"name": "projects/demo/databases/(default)/documents/users/u3",
             "fields": {"age": {"doubleValue": 45.0}}}
        ]});
        let (client, fake) = start(vec![(200, listing)]).await;

        let query = CollectionQuery::new()
            .order_by("age", Direction::Desc)
            .page_size("25")
            .filter(QueryFilter::parse(r#"{"field":"age","operator":">=","value":30}"#).unwrap());
        let docs = client.get_collection("users", &query).await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u3"]);
        assert_eq!(docs[0].get("name"), Some(&Value::from("Ana")));

        let request = &fake.requests()[0];
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, format!("{}/users", DOCS));
        assert_eq!(request.params("key"), vec!["test-key"]);
        assert_eq!(request.params("orderBy"), vec!["age desc"]);
        assert_eq!(request.params("pageSize"), vec!["25"]);
    }

    #[tokio::test]
    async fn test_get_collection_upstream_error() {
        let (client, _fake) = start(vec![(403, json!({"error": {"message": "denied"}}))]).await;

        let err = client
            .get_collection("users", &CollectionQuery::new())
            .await
            .unwrap_err();
        match err {
            FirestoreError::Upstream { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("denied"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_document_not_found_is_sentinel() {
        let (client, fake) = start(vec![(404, json!({"error": {"code": 404}}))]).await;

        let doc = client.get_document("posts", "missing-id").await.unwrap();
        assert_eq!(doc, Document::missing("missing-id"));
        assert_eq!(fake.requests()[0].path, format!("{}/posts/missing-id", DOCS));
    }

    #[tokio::test]
    async fn test_get_document_other_errors_propagate() {
        let (client, _fake) = start(vec![(500, json!({"error": "boom"}))]).await;

        let err = client.get_document("posts", "p1").await.unwrap_err();
        assert!(matches!(err, FirestoreError::Upstream { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_get_document_decodes() {
        let reply = json!({
            "name": "projects/demo/databases/(default)/documents/posts/p1",
            "fields": {"meta": {"mapValue": {"fields": {"likes": {"integerValue": "7"}}}}}
        });
        let (client, _fake) = start(vec![(200, reply)]).await;

        let doc = client.get_document("posts", "p1").await.unwrap();
        assert_eq!(doc.id, "p1");
        assert_eq!(doc.get("meta"), Some(&Value::from(json!({"likes": 7}))));
    }

    #[tokio::test]
    async fn test_get_document_deeply_nested() {
        let mut value = Value::from("leaf");
        for _ in 0..100 {
            value = Value::Map(Fields::from([("child".to_string(), value)]));
        }
        let reply = json!({
            "name": "projects/demo/databases/(default)/documents/trees/t1",
            "fields": {"root": codec::encode(value.clone()).to_json()}
        });
        let (client, _fake) = start(vec![(200, reply)]).await;

        let doc = client.get_document("trees", "t1").await.unwrap();
        assert_eq!(doc.get("root"), Some(&value));
    }

    #[tokio::test]
    async fn test_create_injects_timestamp() {
        let reply = json!({"name": "projects/demo/databases/(default)/documents/comments/new1"});
        let (client, fake) = start(vec![(200, reply)]).await;

        let id = client
            .create_document("comments", fields(json!({"text": "hi", "likes": 3})))
            .await
            .unwrap();
        assert_eq!(id, "new1");

        let request = &fake.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, format!("{}/comments", DOCS));

        let body = request.body.as_ref().unwrap();
        assert_eq!(body["fields"]["likes"], json!({"integerValue": "3"}));
        assert_eq!(body["fields"]["text"], json!({"stringValue": "hi"}));
        let ts = body["fields"]["timestamp"]["timestampValue"].as_str().unwrap();
        assert!(ts.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_create_keeps_caller_timestamp() {
        let reply = json!({"name": "projects/demo/databases/(default)/documents/comments/new2"});
        let (client, fake) = start(vec![(200, reply)]).await;

        client
            .create_document("comments", fields(json!({"timestamp": "yesterday"})))
            .await
            .unwrap();

        let body = fake.requests()[0].body.clone().unwrap();
        assert_eq!(body["fields"]["timestamp"], json!({"stringValue": "yesterday"}));
    }

    #[tokio::test]
    async fn test_replace_sends_no_mask() {
        let (client, fake) = start(vec![(200, json!({}))]).await;

        client
            .replace_document("posts", "p1", fields(json!({"title": "New"})))
            .await
            .unwrap();

        let request = &fake.requests()[0];
        assert_eq!(request.method, "PATCH");
        assert!(request.params("updateMask.fieldPaths").is_empty());
        let body = request.body.as_ref().unwrap();
        assert_eq!(body, &json!({"fields": {"title": {"stringValue": "New"}}}));
    }

    #[tokio::test]
    async fn test_update_with_no_fields_still_writes_updated_at() {
        let (client, fake) = start(vec![(200, json!({}))]).await;

        client
            .update_document("posts", "p1", Fields::new())
            .await
            .unwrap();

        let request = &fake.requests()[0];
        assert_eq!(request.method, "PATCH");
        assert_eq!(request.params("updateMask.fieldPaths"), vec!["updatedAt"]);

        let body = request.body.as_ref().unwrap();
        let fields = body["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields["updatedAt"]["timestampValue"].is_string());
    }

    #[tokio::test]
    async fn test_update_mask_covers_exactly_the_payload() {
        let (client, fake) = start(vec![(200, json!({}))]).await;

        client
            .update_document("posts", "p1", fields(json!({"likes": 4, "my-field": true})))
            .await
            .unwrap();

        let request = &fake.requests()[0];
        let mut mask = request.params("updateMask.fieldPaths");
        mask.sort();
        assert_eq!(mask, vec!["`my-field`", "likes", "updatedAt"]);

        let body = request.body.as_ref().unwrap();
        assert_eq!(body["fields"]["likes"], json!({"integerValue": "4"}));
        assert_eq!(body["fields"].as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_write_upstream_error() {
        let (client, _fake) = start(vec![(400, json!({"error": "bad field"}))]).await;

        let err = client
            .update_document("posts", "p1", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FirestoreError::Upstream { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FirestoreClient::new(&FirestoreConfig {
            api_key: "k".to_string(),
            project_id: "demo".to_string(),
            endpoint: format!("http://{}", addr),
            request_timeout_secs: 5,
        })
        .unwrap();

        let err = client.get_document("posts", "p1").await.unwrap_err();
        assert!(matches!(err, FirestoreError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_slow_endpoint_is_timeout() {
        let app = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "late"
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = FirestoreClient::new(&FirestoreConfig {
            api_key: "k".to_string(),
            project_id: "demo".to_string(),
            endpoint: format!("http://{}", addr),
            request_timeout_secs: 1,
        })
        .unwrap();

        let err = client.get_document("posts", "p1").await.unwrap_err();
        assert!(matches!(err, FirestoreError::Timeout(_)), "got {:?}", err);
    }

    #[test]
    fn test_field_path_quoting() {
        assert_eq!(field_path("updatedAt"), "updatedAt");
        assert_eq!(field_path("_private1"), "_private1");
        assert_eq!(field_path("1st"), "`1st`");
        assert_eq!(field_path("a.b"), "`a.b`");
        assert_eq!(field_path("back`tick"), "`back\\`tick`");
    }

    #[test]
    fn test_segments_are_escaped() {
        let client = FirestoreClient::new(&FirestoreConfig {
            project_id: "demo".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = client.url(&["posts", "a b/c"]);
        assert!(url.as_str().ends_with("/documents/posts/a%20b%2Fc"));
    }

    #[test]
    fn test_server_timestamp_shape() {
        let ts = server_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}

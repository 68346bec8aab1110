//! Firestore connection settings

/// Public REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Web API key sent as the `key` query parameter
    pub api_key: String,
    pub project_id: String,
    /// Scheme and host of the REST API, overridable for emulators
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl FirestoreConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.project_id.is_empty()
    }

    /// Root of the documents tree of the default database
    pub fn documents_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.endpoint.trim_end_matches('/'),
            self.project_id
        )
    }
}

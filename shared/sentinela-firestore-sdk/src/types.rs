//! Document types exchanged with callers and with the REST API

use serde::{Deserialize, Serialize};

use crate::codec::{self, WireFields};
use crate::value::Fields;

/// A decoded document.
///
/// `data` is `None` only for the not-found result of a single-document get.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Option<Fields>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data: Some(data),
        }
    }

    /// The "no such document" sentinel
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&crate::Value> {
        self.data.as_ref().and_then(|data| data.get(field))
    }
}

/// Document resource as returned by the REST API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub name: String,
    #[serde(default)]
    pub fields: WireFields,
}

impl RemoteDocument {
    pub fn id(&self) -> &str {
        document_id(&self.name)
    }

    pub fn into_document(self) -> Document {
        let id = self.id().to_string();
        Document::new(id, codec::decode_fields(self.fields))
    }
}

/// Body of a collection listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<RemoteDocument>,
    pub next_page_token: Option<String>,
}

/// Body of create and patch calls
#[derive(Debug, Clone, Serialize)]
pub struct WriteRequest {
    pub fields: WireFields,
}

/// Final `/`-delimited segment of a resource name
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

//! Firestore REST SDK for Sentinela
//!
//! Translates between plain JSON-like values and the Firestore typed-value
//! wire format, and proxies document reads and writes to the REST API.

pub mod codec;
mod client;
mod config;
mod error;
mod query;
mod types;
mod value;

pub use client::{server_timestamp, update_mask, FirestoreClient, CREATED_FIELD, UPDATED_FIELD};
pub use codec::{decode, decode_fields, encode, encode_fields, WireFields, WireValue};
pub use config::{FirestoreConfig, DEFAULT_ENDPOINT};
pub use error::{FirestoreError, Result};
pub use query::{CollectionQuery, Direction, Operator, QueryFilter};
pub use types::*;
pub use value::{Fields, Value};

/// Re-export for convenience
pub mod prelude {
    pub use super::{
        CollectionQuery, Direction, Document, Fields, FirestoreClient, FirestoreConfig,
        FirestoreError, QueryFilter, Result, Value,
    };
}
